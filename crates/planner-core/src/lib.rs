pub mod cancel;
pub mod config;
pub mod error;
pub mod graph;
pub mod result;

pub use cancel::Cancellation;
pub use config::EngineConfig;
pub use error::{BatchFailure, PlannerError};
pub use graph::{AdjacencyList, Edge, EdgeId, Graph};
pub use result::PlannerResult;
