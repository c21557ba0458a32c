use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use uuid::Uuid;

use crate::{Cancellation, PlannerError, PlannerResult};

/// Active adjacency view: node -> direct successors
pub type AdjacencyList = HashMap<Uuid, Vec<Uuid>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Check if adding an edge would create a cycle in a directed graph
///
/// Adding `source -> target` closes a cycle iff `source` is already
/// reachable from `target`.
pub fn would_create_cycle(
    adj_list: &AdjacencyList,
    source: Uuid,
    target: Uuid,
    cancel: &Cancellation,
) -> PlannerResult<bool> {
    Ok(find_path(adj_list, target, source, cancel)?.is_some())
}

/// The cycle that adding `source -> target` would close, as
/// `[source, target, .., source]`, or `None` if the edge is safe
pub fn cycle_path(
    adj_list: &AdjacencyList,
    source: Uuid,
    target: Uuid,
    cancel: &Cancellation,
) -> PlannerResult<Option<Vec<Uuid>>> {
    let Some(back) = find_path(adj_list, target, source, cancel)? else {
        return Ok(None);
    };
    let mut cycle = Vec::with_capacity(back.len() + 1);
    cycle.push(source);
    cycle.extend(back);
    Ok(Some(cycle))
}

/// Find any path from `start` to `end` using iterative DFS
///
/// Stops as soon as `end` is reached. The returned path includes both ends.
pub fn find_path(
    adj_list: &AdjacencyList,
    start: Uuid,
    end: Uuid,
    cancel: &Cancellation,
) -> PlannerResult<Option<Vec<Uuid>>> {
    if start == end {
        return Ok(Some(vec![start]));
    }

    let mut parent: HashMap<Uuid, Uuid> = HashMap::new();
    let mut visited = HashSet::new();
    let mut stack = vec![start];
    visited.insert(start);

    while let Some(node) = stack.pop() {
        cancel.check()?;
        if node == end {
            return Ok(Some(rebuild_path(&parent, start, end)));
        }

        if let Some(neighbors) = adj_list.get(&node) {
            for &neighbor in neighbors {
                if visited.insert(neighbor) {
                    parent.insert(neighbor, node);
                    stack.push(neighbor);
                }
            }
        }
    }

    Ok(None)
}

fn rebuild_path(parent: &HashMap<Uuid, Uuid>, start: Uuid, end: Uuid) -> Vec<Uuid> {
    let mut path = vec![end];
    let mut current = end;
    while current != start {
        match parent.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Enumerate cycles with a three-colour DFS
///
/// Every edge into an in-progress node yields one cycle, reconstructed from
/// the DFS stack and listed without repeating its first node. Roots and
/// neighbors are visited in ascending id order so results are reproducible.
pub fn find_cycles(
    adj_list: &AdjacencyList,
    cancel: &Cancellation,
) -> PlannerResult<Vec<Vec<Uuid>>> {
    let sorted = sorted_adjacency(adj_list);
    let mut roots: Vec<Uuid> = sorted.keys().copied().collect();
    roots.sort();

    let mut marks: HashMap<Uuid, Mark> = HashMap::new();
    let mut cycles = Vec::new();

    for root in roots {
        if marks.contains_key(&root) {
            continue;
        }

        marks.insert(root, Mark::InProgress);
        let mut frames: Vec<(Uuid, usize)> = vec![(root, 0)];

        while let Some(&(node, index)) = frames.last() {
            cancel.check()?;
            let next = sorted.get(&node).and_then(|n| n.get(index)).copied();

            match next {
                Some(neighbor) => {
                    if let Some(top) = frames.last_mut() {
                        top.1 += 1;
                    }
                    match marks.get(&neighbor) {
                        None => {
                            marks.insert(neighbor, Mark::InProgress);
                            frames.push((neighbor, 0));
                        }
                        Some(Mark::InProgress) => {
                            if let Some(start) = frames.iter().position(|(n, _)| *n == neighbor)
                            {
                                cycles.push(frames[start..].iter().map(|(n, _)| *n).collect());
                            }
                        }
                        Some(Mark::Done) => {}
                    }
                }
                None => {
                    marks.insert(node, Mark::Done);
                    frames.pop();
                }
            }
        }
    }

    Ok(cycles)
}

/// Detect if the graph contains any cycles
pub fn has_cycle(adj_list: &AdjacencyList) -> bool {
    let nodes: Vec<Uuid> = adj_list.keys().copied().collect();
    topological_sort(&nodes, adj_list, &Cancellation::new()).is_err()
}

/// Order nodes so that every edge points forward (Kahn's algorithm)
///
/// `nodes` lists nodes that must appear even without edges; endpoints found
/// only in `adj_list` are included as well. Among simultaneously ready nodes
/// the smallest id goes first. Nodes left with a non-zero in-degree mean the
/// graph is cyclic and produce `GraphInconsistent`.
pub fn topological_sort(
    nodes: &[Uuid],
    adj_list: &AdjacencyList,
    cancel: &Cancellation,
) -> PlannerResult<Vec<Uuid>> {
    let mut in_degree: HashMap<Uuid, usize> = nodes.iter().map(|&n| (n, 0)).collect();
    for (&source, targets) in adj_list {
        in_degree.entry(source).or_insert(0);
        for &target in targets {
            *in_degree.entry(target).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<Uuid> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&node, _)| node)
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(node) = ready.pop_first() {
        cancel.check()?;
        order.push(node);

        if let Some(targets) = adj_list.get(&node) {
            for target in targets {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*target);
                    }
                }
            }
        }
    }

    if order.len() < in_degree.len() {
        let mut remaining: Vec<Uuid> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(node, _)| node)
            .collect();
        remaining.sort();
        return Err(PlannerError::GraphInconsistent { remaining });
    }

    Ok(order)
}

/// Get all nodes reachable from a given node (transitive closure) using BFS
pub fn reachable_from(adj_list: &AdjacencyList, start: Uuid) -> HashSet<Uuid> {
    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();

    queue.push_back(start);
    reachable.insert(start);

    while let Some(node) = queue.pop_front() {
        if let Some(neighbors) = adj_list.get(&node) {
            for &neighbor in neighbors {
                if reachable.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
    }

    reachable
}

/// Shortest path by edge count from `start` to `end` (BFS)
///
/// Returns an empty vector when `end` is unreachable.
pub fn shortest_path(adj_list: &AdjacencyList, start: Uuid, end: Uuid) -> Vec<Uuid> {
    if start == end {
        return vec![start];
    }

    let sorted = sorted_adjacency(adj_list);
    let mut parent: HashMap<Uuid, Uuid> = HashMap::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        let Some(neighbors) = sorted.get(&node) else {
            continue;
        };
        for &neighbor in neighbors {
            if visited.insert(neighbor) {
                parent.insert(neighbor, node);
                if neighbor == end {
                    return rebuild_path(&parent, start, end);
                }
                queue.push_back(neighbor);
            }
        }
    }

    Vec::new()
}

/// Reverse every edge of an adjacency list
pub fn reversed(adj_list: &AdjacencyList) -> AdjacencyList {
    let mut reversed: AdjacencyList = HashMap::new();
    for (&source, targets) in adj_list {
        for &target in targets {
            reversed.entry(target).or_default().push(source);
        }
    }
    reversed
}

fn sorted_adjacency(adj_list: &AdjacencyList) -> AdjacencyList {
    adj_list
        .iter()
        .map(|(&node, targets)| {
            let mut targets = targets.clone();
            targets.sort();
            targets.dedup();
            (node, targets)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn adj(edges: &[(u128, u128)]) -> AdjacencyList {
        let mut adj_list: AdjacencyList = HashMap::new();
        for &(s, t) in edges {
            adj_list.entry(id(s)).or_default().push(id(t));
        }
        adj_list
    }

    #[test]
    fn test_would_create_cycle_simple() {
        let adj_list = adj(&[(1, 2), (2, 3)]);
        let cancel = Cancellation::new();

        // 3 -> 1 would create cycle: 1 -> 2 -> 3 -> 1
        assert!(would_create_cycle(&adj_list, id(3), id(1), &cancel).unwrap());

        // 3 -> 2 would also create cycle: 2 -> 3 -> 2
        assert!(would_create_cycle(&adj_list, id(3), id(2), &cancel).unwrap());

        assert!(!would_create_cycle(&adj_list, id(1), id(3), &cancel).unwrap());
    }

    #[test]
    fn test_would_create_cycle_no_path() {
        let adj_list = adj(&[(1, 2), (3, 4)]);
        assert!(!would_create_cycle(&adj_list, id(4), id(1), &Cancellation::new()).unwrap());
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let adj_list = AdjacencyList::new();
        let cancel = Cancellation::new();
        assert!(would_create_cycle(&adj_list, id(1), id(1), &cancel).unwrap());
        assert_eq!(
            cycle_path(&adj_list, id(1), id(1), &cancel).unwrap(),
            Some(vec![id(1), id(1)])
        );
    }

    #[test]
    fn test_cycle_path_reports_would_be_cycle() {
        let adj_list = adj(&[(1, 2), (2, 3)]);
        let path = cycle_path(&adj_list, id(3), id(1), &Cancellation::new())
            .unwrap()
            .unwrap();
        assert_eq!(path, vec![id(3), id(1), id(2), id(3)]);
    }

    #[test]
    fn test_find_cycles_two_node() {
        let adj_list = adj(&[(1, 2), (2, 1)]);
        let cycles = find_cycles(&adj_list, &Cancellation::new()).unwrap();
        assert_eq!(cycles, vec![vec![id(1), id(2)]]);
    }

    #[test]
    fn test_find_cycles_reports_disjoint_cycles() {
        let adj_list = adj(&[(1, 2), (2, 3), (3, 1), (10, 11), (11, 10), (20, 21)]);
        let cycles = find_cycles(&adj_list, &Cancellation::new()).unwrap();

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], vec![id(1), id(2), id(3)]);
        assert_eq!(cycles[1], vec![id(10), id(11)]);
    }

    #[test]
    fn test_find_cycles_acyclic() {
        let adj_list = adj(&[(1, 2), (1, 3), (2, 4), (3, 4)]);
        assert!(find_cycles(&adj_list, &Cancellation::new())
            .unwrap()
            .is_empty());
        assert!(!has_cycle(&adj_list));
    }

    #[test]
    fn test_has_cycle_simple() {
        assert!(has_cycle(&adj(&[(1, 2), (2, 3), (3, 1)])));
        assert!(!has_cycle(&adj(&[(1, 2), (2, 3)])));
    }

    #[test]
    fn test_topological_sort_breaks_ties_by_id() {
        let adj_list = adj(&[(5, 2), (1, 2), (2, 3)]);
        let order =
            topological_sort(&[id(4), id(3)], &adj_list, &Cancellation::new()).unwrap();
        assert_eq!(order, vec![id(1), id(4), id(5), id(2), id(3)]);
    }

    #[test]
    fn test_topological_sort_rejects_cycles() {
        let adj_list = adj(&[(1, 2), (2, 3), (3, 2), (4, 1)]);
        let err = topological_sort(&[], &adj_list, &Cancellation::new()).unwrap_err();
        match err {
            PlannerError::GraphInconsistent { remaining } => {
                assert_eq!(remaining, vec![id(2), id(3)]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_traversal_stops() {
        let adj_list = adj(&[(1, 2), (2, 3)]);
        let cancel = Cancellation::new();
        cancel.cancel();

        assert!(matches!(
            topological_sort(&[], &adj_list, &cancel),
            Err(PlannerError::Cancelled)
        ));
        assert!(matches!(
            would_create_cycle(&adj_list, id(3), id(1), &cancel),
            Err(PlannerError::Cancelled)
        ));
    }

    #[test]
    fn test_reachable_from() {
        let adj_list = adj(&[(1, 2), (1, 3), (2, 4)]);
        let reachable = reachable_from(&adj_list, id(1));
        assert_eq!(reachable.len(), 4);
        assert!(reachable.contains(&id(4)));

        let isolated = reachable_from(&AdjacencyList::new(), id(9));
        assert_eq!(isolated.len(), 1);
    }

    #[test]
    fn test_shortest_path_prefers_fewest_edges() {
        let adj_list = adj(&[(1, 2), (2, 3), (3, 4), (1, 4)]);
        assert_eq!(shortest_path(&adj_list, id(1), id(4)), vec![id(1), id(4)]);
        assert_eq!(
            shortest_path(&adj_list, id(2), id(4)),
            vec![id(2), id(3), id(4)]
        );
        assert!(shortest_path(&adj_list, id(4), id(1)).is_empty());
    }

    #[test]
    fn test_reversed() {
        let reversed = reversed(&adj(&[(1, 2), (3, 2)]));
        let mut sources = reversed.get(&id(2)).cloned().unwrap();
        sources.sort();
        assert_eq!(sources, vec![id(1), id(3)]);
    }
}
