pub mod config;
pub mod error;
pub mod janitor;
pub mod job;
pub mod output_resolver;
pub mod tool_executor;
pub mod types;
pub mod workspace;

pub use config::{ConfigLoader, ServiceConfig};
pub use error::AppError;
pub use janitor::{Janitor, JanitorHandle, SweepReport};
pub use job::{JobOutcome, JobRunner, ObfuscateRequest, ValidatedJob};
pub use output_resolver::OutputResolver;
pub use tool_executor::{InvocationResult, ToolRunner, TransformationInvoker};
pub use types::*;
pub use workspace::{JobId, JobPaths, WorkspaceManager};
