use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::algorithms::{self, AdjacencyList};
use super::edge::{Edge, EdgeId};
use crate::{Cancellation, PlannerError, PlannerResult};

/// Generic directed graph that can hold any edge payload E
///
/// Edges are owned in a map keyed by edge id; per-node index lists give
/// O(1) access to outgoing and incoming edges. Archived edges stay in the
/// graph but are skipped by every `*_active` query and by the algorithms.
#[derive(Debug, Clone)]
pub struct Graph<E> {
    edges: HashMap<EdgeId, Edge<E>>,
    outgoing: HashMap<Uuid, Vec<EdgeId>>,
    incoming: HashMap<Uuid, Vec<EdgeId>>,
}

impl<E> Default for Graph<E> {
    fn default() -> Self {
        Self {
            edges: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }
}

impl<E> Graph<E> {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from previously stored edges
    pub fn from_edges(edges: impl IntoIterator<Item = Edge<E>>) -> PlannerResult<Self> {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    /// Add an edge to the graph
    ///
    /// Note: Cycle checking must be done by caller if needed
    /// (see `would_create_cycle` method)
    pub fn add_edge(&mut self, edge: Edge<E>) -> PlannerResult<()> {
        if self.edges.contains_key(&edge.id) {
            return Err(PlannerError::Internal(format!(
                "edge {} is already present",
                edge.id
            )));
        }
        self.outgoing.entry(edge.source).or_default().push(edge.id);
        self.incoming.entry(edge.target).or_default().push(edge.id);
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    /// Remove an edge by id, returning it
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> PlannerResult<Edge<E>> {
        let edge = self
            .edges
            .remove(&edge_id)
            .ok_or_else(|| PlannerError::not_found("edge", edge_id))?;
        detach(&mut self.outgoing, edge.source, edge_id);
        detach(&mut self.incoming, edge.target, edge_id);
        Ok(edge)
    }

    pub fn get(&self, edge_id: EdgeId) -> Option<&Edge<E>> {
        self.edges.get(&edge_id)
    }

    pub fn contains(&self, edge_id: EdgeId) -> bool {
        self.edges.contains_key(&edge_id)
    }

    /// Change an edge's payload in place; endpoints cannot be modified
    pub fn modify<F>(&mut self, edge_id: EdgeId, change: F) -> PlannerResult<&Edge<E>>
    where
        F: FnOnce(&mut E),
    {
        let edge = self
            .edges
            .get_mut(&edge_id)
            .ok_or_else(|| PlannerError::not_found("edge", edge_id))?;
        change(&mut edge.attrs);
        edge.touch();
        Ok(edge)
    }

    /// Archive an edge; returns false if it was already archived
    pub fn archive_edge(&mut self, edge_id: EdgeId) -> PlannerResult<bool> {
        let edge = self
            .edges
            .get_mut(&edge_id)
            .ok_or_else(|| PlannerError::not_found("edge", edge_id))?;
        let was_active = edge.is_active();
        edge.archive();
        Ok(was_active)
    }

    /// Unarchive an edge; returns false if it was already active
    ///
    /// Note: the caller must re-check for cycles first
    pub fn unarchive_edge(&mut self, edge_id: EdgeId) -> PlannerResult<bool> {
        let edge = self
            .edges
            .get_mut(&edge_id)
            .ok_or_else(|| PlannerError::not_found("edge", edge_id))?;
        let was_archived = edge.is_archived();
        edge.unarchive();
        Ok(was_archived)
    }

    /// Get all outgoing edges from a node (where node is source)
    pub fn outgoing(&self, node_id: Uuid) -> Vec<&Edge<E>> {
        self.indexed(&self.outgoing, node_id)
    }

    /// Get all incoming edges to a node (where node is target)
    pub fn incoming(&self, node_id: Uuid) -> Vec<&Edge<E>> {
        self.indexed(&self.incoming, node_id)
    }

    /// Get all active outgoing edges from a node
    pub fn outgoing_active(&self, node_id: Uuid) -> Vec<&Edge<E>> {
        self.outgoing(node_id)
            .into_iter()
            .filter(|e| e.is_active())
            .collect()
    }

    /// Get all active incoming edges to a node
    pub fn incoming_active(&self, node_id: Uuid) -> Vec<&Edge<E>> {
        self.incoming(node_id)
            .into_iter()
            .filter(|e| e.is_active())
            .collect()
    }

    /// All edges touching a node, archived ones included
    pub fn edges_involving(&self, node_id: Uuid) -> Vec<&Edge<E>> {
        let mut edges = self.outgoing(node_id);
        edges.extend(
            self.incoming(node_id)
                .into_iter()
                .filter(|e| e.source != node_id),
        );
        edges
    }

    /// The active edge running from `source` to `target`, if any
    pub fn find_active(&self, source: Uuid, target: Uuid) -> Option<&Edge<E>> {
        self.outgoing_active(source)
            .into_iter()
            .find(|e| e.target == target)
    }

    fn indexed(&self, index: &HashMap<Uuid, Vec<EdgeId>>, node_id: Uuid) -> Vec<&Edge<E>> {
        index
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all edges ordered by creation time
    pub fn edges(&self) -> Vec<&Edge<E>> {
        let mut edges: Vec<&Edge<E>> = self.edges.values().collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        edges
    }

    /// Get all active edges ordered by creation time
    pub fn active_edges(&self) -> Vec<&Edge<E>> {
        self.edges().into_iter().filter(|e| e.is_active()).collect()
    }

    /// Build an adjacency list view of the graph (for algorithms)
    /// Only includes active edges
    pub fn adjacency_list(&self) -> AdjacencyList {
        let mut adj_list: AdjacencyList = HashMap::new();
        for edge in self.edges.values().filter(|e| e.is_active()) {
            adj_list.entry(edge.source).or_default().push(edge.target);
        }
        adj_list
    }

    /// Check if adding an edge would create a cycle
    /// Only checks active edges
    pub fn would_create_cycle(
        &self,
        source: Uuid,
        target: Uuid,
        cancel: &Cancellation,
    ) -> PlannerResult<bool> {
        algorithms::would_create_cycle(&self.adjacency_list(), source, target, cancel)
    }

    /// The cycle that adding `source -> target` would close, if any
    pub fn cycle_path(
        &self,
        source: Uuid,
        target: Uuid,
        cancel: &Cancellation,
    ) -> PlannerResult<Option<Vec<Uuid>>> {
        algorithms::cycle_path(&self.adjacency_list(), source, target, cancel)
    }

    /// Check if the graph contains any cycles
    /// Only checks active edges
    pub fn has_cycle(&self) -> bool {
        algorithms::has_cycle(&self.adjacency_list())
    }

    /// Get all nodes reachable from a given node
    /// Only considers active edges
    pub fn reachable_from(&self, start: Uuid) -> HashSet<Uuid> {
        algorithms::reachable_from(&self.adjacency_list(), start)
    }

    /// Get all nodes that can reach a given node
    /// Only considers active edges
    pub fn reaching(&self, end: Uuid) -> HashSet<Uuid> {
        algorithms::reachable_from(&algorithms::reversed(&self.adjacency_list()), end)
    }

    /// Get the count of edges (total, including archived)
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get the count of active edges
    pub fn active_edge_count(&self) -> usize {
        self.edges.values().filter(|e| e.is_active()).count()
    }
}

fn detach(index: &mut HashMap<Uuid, Vec<EdgeId>>, node_id: Uuid, edge_id: EdgeId) {
    if let Some(ids) = index.get_mut(&node_id) {
        ids.retain(|id| *id != edge_id);
        if ids.is_empty() {
            index.remove(&node_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestAttrs {
        TypeA,
        TypeB,
    }

    fn link(graph: &mut Graph<TestAttrs>, source: Uuid, target: Uuid) -> EdgeId {
        let edge = Edge::new(source, target, TestAttrs::TypeA);
        let id = edge.id;
        graph.add_edge(edge).unwrap();
        id
    }

    #[test]
    fn test_graph_creation() {
        let graph: Graph<TestAttrs> = Graph::new();
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.adjacency_list().is_empty());
    }

    #[test]
    fn test_add_and_remove_edge() {
        let mut graph = Graph::new();
        let source = Uuid::new_v4();
        let target = Uuid::new_v4();
        let id = link(&mut graph, source, target);

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.find_active(source, target).is_some());

        let removed = graph.remove_edge(id).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.outgoing(source).is_empty());
        assert!(graph.incoming(target).is_empty());
    }

    #[test]
    fn test_remove_missing_edge_is_not_found() {
        let mut graph: Graph<TestAttrs> = Graph::new();
        assert!(matches!(
            graph.remove_edge(Uuid::new_v4()),
            Err(PlannerError::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_edge_id_rejected() {
        let mut graph = Graph::new();
        let edge = Edge::new(Uuid::new_v4(), Uuid::new_v4(), TestAttrs::TypeA);
        graph.add_edge(edge.clone()).unwrap();
        assert!(graph.add_edge(edge).is_err());
    }

    #[test]
    fn test_outgoing_incoming() {
        let mut graph = Graph::new();
        let node_a = Uuid::new_v4();
        let node_b = Uuid::new_v4();
        let node_c = Uuid::new_v4();

        link(&mut graph, node_a, node_b);
        link(&mut graph, node_a, node_c);
        link(&mut graph, node_c, node_a);

        assert_eq!(graph.outgoing(node_a).len(), 2);
        assert_eq!(graph.incoming(node_a).len(), 1);
        assert_eq!(graph.outgoing(node_b).len(), 0);
        assert_eq!(graph.incoming(node_b).len(), 1);
        assert_eq!(graph.edges_involving(node_a).len(), 3);
    }

    #[test]
    fn test_archived_edges_are_skipped() {
        let mut graph = Graph::new();
        let node_a = Uuid::new_v4();
        let node_b = Uuid::new_v4();
        let id = link(&mut graph, node_a, node_b);

        assert!(graph.archive_edge(id).unwrap());
        assert!(!graph.archive_edge(id).unwrap());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.active_edge_count(), 0);
        assert!(graph.outgoing_active(node_a).is_empty());
        assert!(graph.adjacency_list().is_empty());

        assert!(graph.unarchive_edge(id).unwrap());
        assert_eq!(graph.incoming_active(node_b).len(), 1);
    }

    #[test]
    fn test_modify_keeps_endpoints() {
        let mut graph = Graph::new();
        let node_a = Uuid::new_v4();
        let node_b = Uuid::new_v4();
        let id = link(&mut graph, node_a, node_b);

        let edge = graph.modify(id, |attrs| *attrs = TestAttrs::TypeB).unwrap();
        assert_eq!(edge.attrs, TestAttrs::TypeB);
        assert_eq!(edge.source, node_a);
        assert!(edge.updated_at >= edge.created_at);
    }

    #[test]
    fn test_would_create_cycle() {
        let mut graph = Graph::new();
        let node_a = Uuid::new_v4();
        let node_b = Uuid::new_v4();
        let node_c = Uuid::new_v4();
        let cancel = Cancellation::new();

        link(&mut graph, node_a, node_b);
        link(&mut graph, node_b, node_c);

        // c -> a would create cycle: a -> b -> c -> a
        assert!(graph.would_create_cycle(node_c, node_a, &cancel).unwrap());

        // c -> b would also create cycle: b -> c -> b
        assert!(graph.would_create_cycle(node_c, node_b, &cancel).unwrap());
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_reaching_and_reachable() {
        let mut graph = Graph::new();
        let node_a = Uuid::new_v4();
        let node_b = Uuid::new_v4();
        let node_c = Uuid::new_v4();

        link(&mut graph, node_a, node_b);
        link(&mut graph, node_b, node_c);

        assert_eq!(graph.reachable_from(node_a).len(), 3);
        let reaching = graph.reaching(node_c);
        assert!(reaching.contains(&node_a));
        assert!(reaching.contains(&node_b));
    }
}
