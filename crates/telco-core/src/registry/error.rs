use super::ProcessId;

/// Registry mutation errors.
///
/// Both variants are recoverable: bus events may arrive duplicated or out of
/// order, so callers decide whether to ignore, retry differently, or surface
/// the conflict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A process with this id is already tracked
    #[error("process {id} is already tracked")]
    DuplicateProcess { id: ProcessId },

    /// No process with this id is tracked
    #[error("process {id} not found")]
    ProcessNotFound { id: ProcessId },
}
