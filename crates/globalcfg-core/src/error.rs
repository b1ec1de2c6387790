//! Error types for global configuration reconciliation.
//!
//! Escalation to a full recompute is not an error: handlers report it through
//! [`ChangeOutcome::Escalate`](crate::node::ChangeOutcome::Escalate). The
//! errors here are conditions the outer transaction layer must deal with,
//! typically by aborting the pass and retrying it on the next engine tick.

use std::fmt;

use thiserror::Error;

/// Identifies one of the two stores the node writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Operator-authored desired state.
    Intent,
    /// Control-plane published state consumed by worker nodes.
    State,
}

impl StoreKind {
    /// Returns the store name as used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::State => "state",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by a reconciliation pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GlobalConfigError {
    /// A verify-then-set write found the record changed since it was read.
    #[error("{store} record was modified concurrently")]
    Conflict {
        /// The store holding the conflicting record.
        store: StoreKind,
    },

    /// A write targeted a record that does not exist.
    #[error("{store} record does not exist")]
    MissingRecord {
        /// The store that is missing its record.
        store: StoreKind,
    },

    /// The store transaction could not accept the write.
    #[error("{store} store unavailable: {reason}")]
    Unavailable {
        /// The unavailable store.
        store: StoreKind,
        /// Why the store rejected the operation.
        reason: String,
    },
}

impl GlobalConfigError {
    /// Creates a new conflict error.
    #[must_use]
    pub const fn conflict(store: StoreKind) -> Self {
        Self::Conflict { store }
    }

    /// Creates a new missing record error.
    #[must_use]
    pub const fn missing_record(store: StoreKind) -> Self {
        Self::MissingRecord { store }
    }

    /// Creates a new unavailable store error.
    #[must_use]
    pub fn unavailable(store: StoreKind, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            store,
            reason: reason.into(),
        }
    }

    /// Returns the store this error originated from.
    #[must_use]
    pub const fn store(&self) -> StoreKind {
        match self {
            Self::Conflict { store }
            | Self::MissingRecord { store }
            | Self::Unavailable { store, .. } => *store,
        }
    }

    /// Returns `true` if the engine should abort and retry the whole pass.
    ///
    /// A missing record at write time means the pass read inconsistent input,
    /// which retrying cannot fix without a full recompute.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } | Self::Unavailable { .. } => true,
            Self::MissingRecord { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retryable() {
        let err = GlobalConfigError::conflict(StoreKind::Intent);
        assert!(err.is_retryable());
        assert_eq!(err.store(), StoreKind::Intent);
        assert_eq!(err.to_string(), "intent record was modified concurrently");
    }

    #[test]
    fn missing_record_is_not_retryable() {
        let err = GlobalConfigError::missing_record(StoreKind::State);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "state record does not exist");
    }

    #[test]
    fn unavailable_carries_reason() {
        let err = GlobalConfigError::unavailable(StoreKind::State, "transaction closed");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "state store unavailable: transaction closed");
    }
}
