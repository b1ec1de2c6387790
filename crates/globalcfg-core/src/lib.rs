//! # globalcfg-core
//!
//! Incremental reconciliation of the cluster-wide configuration record.
//!
//! A control plane keeps one global configuration record in two places: the
//! **intent store**, where operators write desired state, and the **state
//! store**, which worker nodes consume. This crate provides the engine node
//! that keeps the two consistent and converges the capability advertisements
//! of the worker fleet into one [`FeatureSet`].
//!
//! On every engine pass the node either:
//!
//! - recomputes everything with [`GlobalConfigNode::run`], or
//! - absorbs a single input change through one of the incremental handlers,
//!   escalating to `run` when the change cannot be patched in.
//!
//! Either way, no write is issued unless a stored value actually differs.
//!
//! ## Example
//!
//! ```rust
//! use globalcfg_core::prelude::*;
//!
//! let mut node = GlobalConfigNode::from_config(&NodeConfig::default());
//! let mut stores = MemoryStores::new();
//! let workers = WorkerTable::from_nodes([WorkerNode::new("hv1")]);
//!
//! node.run(&mut PassContext::new(&mut stores, Some(&workers)))?;
//! assert!(stores.intent.is_some() && stores.state.is_some());
//!
//! // A worker without advertisements disables every capability.
//! assert!(!node.state().features().is_enabled(Feature::CtLbRelated));
//!
//! // Nothing changed, so a second pass writes nothing.
//! stores.reset_writes();
//! node.begin_pass();
//! node.run(&mut PassContext::new(&mut stores, Some(&workers)))?;
//! assert_eq!(stores.writes().total(), 0);
//! # Ok::<(), GlobalConfigError>(())
//! ```
//!
//! ## Collaborators
//!
//! The node talks to everything outside its own state through traits:
//!
//! - [`GlobalStores`]: transactional access to both records
//! - [`Derivations`]: MAC prefix, tunnel key ceiling, version signature
//! - [`DebugConfig`]: drop-sampling settings derived from the intent options
//!
//! [`MemoryStores`], [`StandardDerivations`] and [`DropSampling`] are the
//! shipped implementations.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bag;
pub mod config;
pub mod debug;
pub mod derivation;
pub mod error;
pub mod features;
pub mod mac;
pub mod node;
pub mod records;
pub mod store;

// Re-export main types at crate root for convenience
pub use bag::ConfigBag;
pub use config::{ConfigError, NodeConfig, VersionConfig};
pub use debug::{DebugConfig, DropSampling};
pub use derivation::{Derivations, StandardDerivations};
pub use error::{GlobalConfigError, StoreKind};
pub use features::{Feature, FeatureSet};
pub use mac::{MacAddr, MacParseError};
pub use node::{
    ChangeOutcome, GlobalConfigNode, GlobalConfigState, NodeState, PassContext, TrackedData,
};
pub use records::{
    Encap, IntentColumns, IntentRecord, RowChange, StateRecord, WorkerNode, WorkerTable,
};
pub use store::{GlobalStores, MemoryStores, WriteCounts};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bag::ConfigBag;
    pub use crate::config::NodeConfig;
    pub use crate::error::GlobalConfigError;
    pub use crate::features::{Feature, FeatureSet};
    pub use crate::node::{ChangeOutcome, GlobalConfigNode, NodeState, PassContext};
    pub use crate::records::{
        Encap, IntentColumns, IntentRecord, RowChange, StateRecord, WorkerNode, WorkerTable,
    };
    pub use crate::store::{GlobalStores, MemoryStores};
}
