//! External tool plumbing: process execution, the templating tool and PATH checks.

pub mod binaries;
pub mod execution;
pub mod render;

pub use binaries::{ensure_required_binaries, find_in_path};
pub use execution::{
    CommandExecutionOutput, CommandExecutionRequest, CommandRunner, TokioCommandRunner,
};
pub use render::{KustomizeRenderer, RenderRequest, Renderer};
