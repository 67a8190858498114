//! Fatal compilation errors.
//!
//! Data-quality problems are reported through [`grid_core::Diagnostics`];
//! only references the compiler cannot resolve abort a compile.

use grid_core::GridError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{device} '{name}' references bus {bus} which is not in the bus index map")]
    MissingBus {
        device: &'static str,
        name: String,
        bus: usize,
    },

    #[error("{device} '{name}' references fluid node {node} which does not exist")]
    MissingFluidNode {
        device: &'static str,
        name: String,
        node: usize,
    },

    #[error("{device} '{name}' references branch {branch} which does not exist")]
    MissingBranch {
        device: &'static str,
        name: String,
        branch: usize,
    },

    #[error("fluid injection '{name}' references generator {generator} which does not exist")]
    MissingGenerator { name: String, generator: usize },

    #[error("time index {t_idx} out of range (network has {time_steps} steps)")]
    TimeIndexOutOfRange { t_idx: usize, time_steps: usize },

    #[error("unknown idtag '{0}'")]
    UnknownIdTag(String),

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type CompileResult<T> = Result<T, CompileError>;

impl From<CompileError> for GridError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::MissingBus { .. }
            | CompileError::MissingBranch { .. }
            | CompileError::MissingFluidNode { .. }
            | CompileError::MissingGenerator { .. }
            | CompileError::UnknownIdTag(_) => GridError::Reference(err.to_string()),
            CompileError::Config(_) => GridError::Config(err.to_string()),
            CompileError::TimeIndexOutOfRange { .. } | CompileError::InvalidEvent(_) => {
                GridError::Compile(err.to_string())
            }
        }
    }
}
