pub mod algorithms;
pub mod digraph;
pub mod edge;

pub use algorithms::AdjacencyList;
pub use digraph::Graph;
pub use edge::{Edge, EdgeId};
