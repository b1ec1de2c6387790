//! Transactional access to the intent and state stores.
//!
//! The engine opens one transaction per store for every pass and hands the
//! node a single [`GlobalStores`] covering both. Reads observe the
//! transaction's own writes. Commit and abort belong to the engine: if any
//! write fails, the engine aborts the pass and retries it on the next tick, so
//! the node never retries on its own.

use serde::{Deserialize, Serialize};

use crate::bag::ConfigBag;
use crate::error::{GlobalConfigError, StoreKind};
use crate::records::{IntentRecord, StateRecord};

/// Read/write access to the singleton records of both stores.
pub trait GlobalStores {
    /// Returns the intent record, if one exists.
    fn intent(&self) -> Option<&IntentRecord>;

    /// Returns the state record, if one exists.
    fn state(&self) -> Option<&StateRecord>;

    /// Creates an empty intent record.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction rejects the insert.
    fn insert_intent(&mut self) -> Result<(), GlobalConfigError>;

    /// Creates an empty state record.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction rejects the insert.
    fn insert_state(&mut self) -> Result<(), GlobalConfigError>;

    /// Replaces the intent options, provided they still equal `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`GlobalConfigError::Conflict`] if the stored options no longer
    /// match `expected`, or [`GlobalConfigError::MissingRecord`] if there is no
    /// intent record.
    fn set_intent_options(
        &mut self,
        expected: &ConfigBag,
        options: ConfigBag,
    ) -> Result<(), GlobalConfigError>;

    /// Replaces the state options.
    ///
    /// # Errors
    ///
    /// Returns [`GlobalConfigError::MissingRecord`] if there is no state
    /// record.
    fn set_state_options(&mut self, options: ConfigBag) -> Result<(), GlobalConfigError>;

    /// Sets the state record's IPsec toggle.
    ///
    /// # Errors
    ///
    /// Returns [`GlobalConfigError::MissingRecord`] if there is no state
    /// record.
    fn set_state_ipsec(&mut self, ipsec: bool) -> Result<(), GlobalConfigError>;
}

/// Number of writes issued against each store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCounts {
    /// Inserts and option writes on the intent record.
    pub intent: u64,
    /// Inserts, option and IPsec writes on the state record.
    pub state: u64,
}

impl WriteCounts {
    /// Total writes across both stores.
    #[must_use]
    pub const fn total(self) -> u64 {
        self.intent + self.state
    }
}

/// In-memory stores that apply writes immediately.
///
/// Used by tests and by the command-line driver, which loads both records
/// from a snapshot file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStores {
    /// The intent record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentRecord>,

    /// The state record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateRecord>,

    #[serde(skip)]
    writes: WriteCounts,
}

impl MemoryStores {
    /// Creates stores with no records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates stores holding the given records.
    #[must_use]
    pub fn with_records(intent: Option<IntentRecord>, state: Option<StateRecord>) -> Self {
        Self {
            intent,
            state,
            writes: WriteCounts::default(),
        }
    }

    /// Writes issued since creation or the last [`reset_writes`](Self::reset_writes).
    #[must_use]
    pub const fn writes(&self) -> WriteCounts {
        self.writes
    }

    /// Resets the write counters.
    pub fn reset_writes(&mut self) {
        self.writes = WriteCounts::default();
    }

    /// Mutable access to the intent record, bypassing write accounting.
    ///
    /// Models an external writer such as an operator editing the record.
    pub fn intent_mut(&mut self) -> Option<&mut IntentRecord> {
        self.intent.as_mut()
    }

    /// Mutable access to the state record, bypassing write accounting.
    pub fn state_mut(&mut self) -> Option<&mut StateRecord> {
        self.state.as_mut()
    }
}

impl GlobalStores for MemoryStores {
    fn intent(&self) -> Option<&IntentRecord> {
        self.intent.as_ref()
    }

    fn state(&self) -> Option<&StateRecord> {
        self.state.as_ref()
    }

    fn insert_intent(&mut self) -> Result<(), GlobalConfigError> {
        self.intent = Some(IntentRecord::default());
        self.writes.intent += 1;
        Ok(())
    }

    fn insert_state(&mut self) -> Result<(), GlobalConfigError> {
        self.state = Some(StateRecord::default());
        self.writes.state += 1;
        Ok(())
    }

    fn set_intent_options(
        &mut self,
        expected: &ConfigBag,
        options: ConfigBag,
    ) -> Result<(), GlobalConfigError> {
        let record = self
            .intent
            .as_mut()
            .ok_or(GlobalConfigError::missing_record(StoreKind::Intent))?;
        if record.options != *expected {
            return Err(GlobalConfigError::conflict(StoreKind::Intent));
        }
        record.options = options;
        self.writes.intent += 1;
        Ok(())
    }

    fn set_state_options(&mut self, options: ConfigBag) -> Result<(), GlobalConfigError> {
        let record = self
            .state
            .as_mut()
            .ok_or(GlobalConfigError::missing_record(StoreKind::State))?;
        record.options = options;
        self.writes.state += 1;
        Ok(())
    }

    fn set_state_ipsec(&mut self, ipsec: bool) -> Result<(), GlobalConfigError> {
        let record = self
            .state
            .as_mut()
            .ok_or(GlobalConfigError::missing_record(StoreKind::State))?;
        record.ipsec = ipsec;
        self.writes.state += 1;
        Ok(())
    }
}
