use prism_common::ComponentKind;

/// Errors from registry operations.
///
/// A lookup miss is not an error: `get` returns `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} registry used before initialize_factory")]
    NotInitialized { kind: ComponentKind },
    #[error("a {kind} named \"{name}\" already exists")]
    DuplicateName { kind: ComponentKind, name: String },
    #[error("{kind} registry is full ({capacity} slots)")]
    CapacityExceeded { kind: ComponentKind, capacity: u32 },
    #[error("invalid {kind} registry state: {reason}")]
    InvalidState { kind: ComponentKind, reason: String },
}

impl RegistryError {
    pub(crate) fn invalid(kind: ComponentKind, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            kind,
            reason: reason.into(),
        }
    }
}
