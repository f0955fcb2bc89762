//! Public types for the tier-store coordinator.

/// Coordinator lifecycle state.
///
/// Use [`super::TierStore::state()`] to check the current state or
/// [`super::TierStore::state_receiver()`] to watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Just created, not yet opened
    Created,
    /// Connecting the storage collaborators
    Connecting,
    /// Open and serving requests
    Ready,
    /// Maintenance loop running
    Running,
    /// Graceful shutdown in progress
    ShuttingDown,
}

impl std::fmt::Display for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Ready => write!(f, "Ready"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}

/// Where a key currently lives across the tiers.
///
/// Used by [`super::TierStore::status()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    /// Buffered for the next remote flush
    Pending,
    /// Present in at least one tier
    Stored {
        in_memory: bool,
        in_local: bool,
        in_remote: bool,
    },
    /// Not found anywhere
    Missing,
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Stored {
                in_memory,
                in_local,
                in_remote,
            } => write!(
                f,
                "Stored(memory={}, local={}, remote={})",
                in_memory, in_local, in_remote
            ),
            Self::Missing => write!(f, "Missing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_state_display() {
        assert_eq!(format!("{}", StoreState::Created), "Created");
        assert_eq!(format!("{}", StoreState::Running), "Running");
        assert_eq!(format!("{}", StoreState::ShuttingDown), "ShuttingDown");
    }

    #[test]
    fn test_key_status_display() {
        let stored = KeyStatus::Stored {
            in_memory: true,
            in_local: false,
            in_remote: true,
        };
        assert_eq!(
            format!("{}", stored),
            "Stored(memory=true, local=false, remote=true)"
        );

        assert_eq!(format!("{}", KeyStatus::Pending), "Pending");
        assert_eq!(format!("{}", KeyStatus::Missing), "Missing");
    }
}
