//! The global configuration engine node.
//!
//! The node keeps one derived configuration record consistent between the
//! intent store and the state store, and converges worker capability
//! advertisements into a [`FeatureSet`].
//!
//! # Architecture
//!
//! ```text
//!  intent record ──┐                         ┌──> intent options (verify+set)
//!  state record  ──┼──> GlobalConfigNode ────┼──> state options, ipsec
//!  worker table  ──┘          │              └──> NodeState / TrackedData
//!                             │
//!                     GlobalConfigState (cached)
//! ```
//!
//! # Full and incremental passes
//!
//! On every engine pass exactly one of these entry points runs per input
//! change:
//!
//! - [`GlobalConfigNode::run`] recomputes everything from the stores.
//! - [`GlobalConfigNode::handle_intent_change`],
//!   [`GlobalConfigNode::handle_state_change`] and
//!   [`GlobalConfigNode::handle_worker_change`] try to absorb a change to one
//!   input. They return [`ChangeOutcome::Escalate`] when only a full pass can
//!   reproduce the result, and the engine then calls `run` instead.
//!
//! A handler must never absorb a change the full pass would have reflected
//! differently. Anything that feeds generation logic with side effects (the
//! random monitor MAC, the tunnel key ceiling, the version signature) stays
//! inside `run`.
//!
//! # Change tracking
//!
//! Handlers that absorb a change with downstream effect record it in
//! [`TrackedData`]. Consumers ask [`GlobalConfigNode::downstream_can_skip`]
//! whether they can skip their own recompute. The engine clears the flags at
//! the start of every pass through [`GlobalConfigNode::begin_pass`], and `run`
//! clears them again so an escalated pass always reads as untracked.

mod gate;
mod handlers;
mod reconcile;
mod state_options;


use serde::Serialize;

pub use gate::downstream_can_skip;
pub use handlers::{
    PASSTHROUGH_KEYS, STRUCTURAL_KEYS, TrackedKey, passthrough_drift, structural_drift,
};
pub use state_options::derive_state_options;

use crate::bag::ConfigBag;
use crate::config::NodeConfig;
use crate::debug::{DebugConfig, DropSampling};
use crate::derivation::{Derivations, StandardDerivations};
use crate::features::FeatureSet;
use crate::mac::MacAddr;
use crate::records::WorkerTable;
use crate::store::GlobalStores;

/// Intent option seeding the MAC prefix derivation.
pub const MAC_PREFIX: &str = "mac_prefix";
/// Intent option holding the service monitor source address.
pub const SVC_MONITOR_MAC: &str = "svc_monitor_mac";
/// Intent option holding the tunnel key ceiling.
pub const MAX_TUNID: &str = "max_tunid";
/// Intent option freezing every capability flag to enabled.
pub const IGNORE_CHASSIS_FEATURES: &str = "ignore_chassis_features";
/// Intent option recording the last control-plane version signature.
pub const NORTHD_INTERNAL_VERSION: &str = "northd_internal_version";

/// Result of an incremental handler.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The change is reflected in the cached state.
    Absorbed,
    /// The change requires a full recompute.
    Escalate,
}

impl ChangeOutcome {
    /// Returns `true` if the handler absorbed the change.
    #[must_use]
    pub const fn is_absorbed(self) -> bool {
        matches!(self, Self::Absorbed)
    }
}

/// Engine-visible state of the node for the current pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Nothing observable changed.
    #[default]
    Unchanged,
    /// Output changed; dependents must be notified.
    Updated,
}

/// Fine-grained change flags consumed by dependents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackedData {
    /// A passthrough intent option changed.
    pub options_changed: bool,
    /// A converged capability flag changed.
    pub features_changed: bool,
}

/// State owned by the node for its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GlobalConfigState {
    intent_options: ConfigBag,
    state_options: ConfigBag,
    features: FeatureSet,
    svc_monitor_mac: Option<MacAddr>,
    svc_monitor_mac_raw: String,
    internal_version_changed: bool,
    tracked: bool,
    tracked_data: TrackedData,
}

impl GlobalConfigState {
    /// Last synchronized copy of the intent options.
    #[must_use]
    pub const fn intent_options(&self) -> &ConfigBag {
        &self.intent_options
    }

    /// Last derived state options.
    #[must_use]
    pub const fn state_options(&self) -> &ConfigBag {
        &self.state_options
    }

    /// Converged capability flags.
    #[must_use]
    pub const fn features(&self) -> FeatureSet {
        self.features
    }

    /// The service monitor address, once resolved by a full pass.
    #[must_use]
    pub const fn svc_monitor_mac(&self) -> Option<MacAddr> {
        self.svc_monitor_mac
    }

    /// Canonical text of the service monitor address, empty until resolved.
    #[must_use]
    pub fn svc_monitor_mac_raw(&self) -> &str {
        &self.svc_monitor_mac_raw
    }

    /// Whether the last full pass found a new version signature.
    #[must_use]
    pub const fn internal_version_changed(&self) -> bool {
        self.internal_version_changed
    }

    /// Whether a handler absorbed a change during this pass.
    #[must_use]
    pub const fn tracked(&self) -> bool {
        self.tracked
    }

    /// Fine-grained change flags.
    #[must_use]
    pub const fn tracked_data(&self) -> TrackedData {
        self.tracked_data
    }

    fn set_svc_monitor_mac(&mut self, mac: MacAddr) {
        self.svc_monitor_mac = Some(mac);
        self.svc_monitor_mac_raw = mac.to_string();
    }
}

/// Inputs and transaction access for one call into the node.
pub struct PassContext<'a> {
    /// Both stores, inside the engine's transaction for this pass.
    pub stores: &'a mut dyn GlobalStores,
    /// The worker table, if the engine has one.
    pub workers: Option<&'a WorkerTable>,
}

impl<'a> PassContext<'a> {
    /// Creates a context over `stores` and `workers`.
    #[must_use]
    pub fn new(stores: &'a mut dyn GlobalStores, workers: Option<&'a WorkerTable>) -> Self {
        Self { stores, workers }
    }
}

/// The global configuration engine node.
#[derive(Debug)]
pub struct GlobalConfigNode<D = StandardDerivations, G = DropSampling> {
    state: GlobalConfigState,
    node_state: NodeState,
    derivations: D,
    debug: G,
}

impl GlobalConfigNode {
    /// Creates a node using the standard derivations for `config`.
    #[must_use]
    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            StandardDerivations::new(config.version.clone()),
            DropSampling::new(),
        )
    }
}

impl<D: Derivations, G: DebugConfig> GlobalConfigNode<D, G> {
    /// Creates a node with empty bags and every capability enabled.
    #[must_use]
    pub fn new(derivations: D, debug: G) -> Self {
        Self {
            state: GlobalConfigState::default(),
            node_state: NodeState::Unchanged,
            derivations,
            debug,
        }
    }

    /// The cached state.
    #[must_use]
    pub const fn state(&self) -> &GlobalConfigState {
        &self.state
    }

    /// Engine-visible state for the current pass.
    #[must_use]
    pub const fn node_state(&self) -> NodeState {
        self.node_state
    }

    /// The debug collaborator.
    #[must_use]
    pub const fn debug(&self) -> &G {
        &self.debug
    }

    /// The derivation collaborator.
    #[must_use]
    pub const fn derivations(&self) -> &D {
        &self.derivations
    }

    /// Clears the tracked-change flags.
    pub fn clear_tracked_data(&mut self) {
        self.state.tracked = false;
        self.state.tracked_data = TrackedData::default();
    }

    /// Prepares the node for a new engine pass.
    pub fn begin_pass(&mut self) {
        self.clear_tracked_data();
        self.node_state = NodeState::Unchanged;
    }

    /// Returns `true` if dependents can skip recomputing for this pass.
    #[must_use]
    pub fn downstream_can_skip(&self) -> bool {
        downstream_can_skip(&self.state)
    }

    /// Releases everything the node derived, including debug settings.
    pub fn cleanup(&mut self) {
        self.debug.teardown();
        self.state = GlobalConfigState::default();
        self.node_state = NodeState::Unchanged;
    }

    fn mark_updated(&mut self) {
        self.node_state = NodeState::Updated;
    }
}
