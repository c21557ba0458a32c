pub mod dependency_edge;
pub mod dependency_graph_ext;
pub mod dependency_kind;

pub use dependency_edge::{DependencyEdge, DependencyLink, DependencySpec, DependencyUpdate};
pub use dependency_graph_ext::{DependencyGraph, DependencyGraphExt};
pub use dependency_kind::{DependencyKind, TimeWindow};
