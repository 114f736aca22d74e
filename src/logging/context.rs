use std::env;

/// Execution contexts that influence how logging and failure reporting are routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// CI action host (`GITHUB_ACTIONS=true`); logs go to stdout and failures become
    /// workflow commands.
    ActionHost,
    /// Local development invocation from a terminal.
    LocalDev,
}

impl ExecutionContext {
    pub fn is_action_host(self) -> bool {
        self == ExecutionContext::ActionHost
    }
}

/// Derive the active execution context from the environment.
pub fn detect_context() -> ExecutionContext {
    context_from(env::var("GITHUB_ACTIONS").ok().as_deref())
}

/// Context for a given `GITHUB_ACTIONS` value.
pub fn context_from(github_actions: Option<&str>) -> ExecutionContext {
    match github_actions.map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case("true") => ExecutionContext::ActionHost,
        _ => ExecutionContext::LocalDev,
    }
}
