use planner_core::graph::algorithms;
use planner_core::{AdjacencyList, Cancellation};
use proptest::prelude::*;
use uuid::Uuid;

/// A DAG over `n` nodes: edges only run forward in a shuffled node order
#[derive(Debug, Clone)]
struct Dag {
    n: usize,
    edges: Vec<(usize, usize)>,
}

fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Dag> {
    (2..=max_nodes).prop_flat_map(|n| {
        let order = Just((0..n).collect::<Vec<usize>>()).prop_shuffle();
        let mask = prop::collection::vec(prop::bool::weighted(0.3), n * (n - 1) / 2);
        (order, mask).prop_map(move |(order, mask)| {
            let pairs = (0..n).flat_map(|i| ((i + 1)..n).map(move |j| (i, j)));
            let edges = pairs
                .zip(mask)
                .filter(|(_, keep)| *keep)
                .map(|((i, j), _)| (order[i], order[j]))
                .collect();
            Dag { n, edges }
        })
    })
}

/// Cycle check by transitive closure
fn has_cycle_brute_force(n: usize, edges: &[(usize, usize)]) -> bool {
    let mut reach = vec![vec![false; n]; n];
    for &(a, b) in edges {
        reach[a][b] = true;
    }
    for k in 0..n {
        for i in 0..n {
            for j in 0..n {
                if reach[i][k] && reach[k][j] {
                    reach[i][j] = true;
                }
            }
        }
    }
    (0..n).any(|i| reach[i][i])
}

fn node_ids(n: usize) -> Vec<Uuid> {
    (0..n as u128).map(|i| Uuid::from_u128(i + 1)).collect()
}

fn adjacency(ids: &[Uuid], edges: &[(usize, usize)]) -> AdjacencyList {
    let mut adj = AdjacencyList::new();
    for &(a, b) in edges {
        adj.entry(ids[a]).or_default().push(ids[b]);
    }
    adj
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn would_create_cycle_matches_brute_force(dag in dag_strategy(7)) {
        let ids = node_ids(dag.n);
        let adj = adjacency(&ids, &dag.edges);
        let cancel = Cancellation::new();
        prop_assert!(!algorithms::has_cycle(&adj));

        for p in 0..dag.n {
            for s in 0..dag.n {
                let mut candidate = dag.edges.clone();
                candidate.push((p, s));

                let expected = has_cycle_brute_force(dag.n, &candidate);
                let actual = algorithms::would_create_cycle(&adj, ids[p], ids[s], &cancel).unwrap();
                prop_assert_eq!(actual, expected, "edge {}->{} over {:?}", p, s, dag.edges);

                let path = algorithms::cycle_path(&adj, ids[p], ids[s], &cancel).unwrap();
                prop_assert_eq!(path.is_some(), expected);
            }
        }
    }

    #[test]
    fn topological_sort_respects_every_edge(dag in dag_strategy(10)) {
        let ids = node_ids(dag.n);
        let adj = adjacency(&ids, &dag.edges);

        let order = algorithms::topological_sort(&ids, &adj, &Cancellation::new()).unwrap();
        prop_assert_eq!(order.len(), dag.n);
        let position = |id: Uuid| order.iter().position(|x| *x == id);
        for &(a, b) in &dag.edges {
            prop_assert!(position(ids[a]) < position(ids[b]));
        }
    }
}
