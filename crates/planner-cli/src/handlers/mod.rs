pub mod dependency;
pub mod schedule;
pub mod task;
