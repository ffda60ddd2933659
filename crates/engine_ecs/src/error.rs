//! World error types.

use crate::system::SystemId;

/// Errors returned by world operations that address a specific system.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The ID does not name a system currently admitted to the world.
    #[error("{0} is not resident in the world")]
    UnknownSystem(SystemId),

    /// A target execution index past the end of the system list.
    #[error("system index {index} out of range for {len} systems")]
    IndexOutOfRange { index: usize, len: usize },
}
