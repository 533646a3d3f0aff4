pub mod model;
pub mod workflow;
