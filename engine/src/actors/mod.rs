pub mod workflow;

pub use workflow::{WorkflowRegistry, WorkflowRegistryActor, WorkflowRegistryArguments};
