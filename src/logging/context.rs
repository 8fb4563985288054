use crate::cli::Command;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Long-running HTTP service.
    Server,
    /// One-shot commands driven from a terminal.
    LocalDev,
}

/// Derive the active execution context from a parsed CLI command.
pub fn detect_context(command: &Command) -> ExecutionContext {
    match command {
        Command::Serve(_) => ExecutionContext::Server,
        Command::Run(_) | Command::Sweep(_) => ExecutionContext::LocalDev,
    }
}
