//! `globalcfg reconcile`: one full pass over a snapshot.
//!
//! The pass runs against in-memory stores loaded from the snapshot. The
//! report lists the resulting records, the node's derived state, and how many
//! writes each store received. A report with zero writes means the snapshot
//! was already consistent.

use std::path::Path;

use anyhow::{Context, Result};
use globalcfg_core::{
    FeatureSet, GlobalConfigNode, IntentRecord, NodeConfig, NodeState, PassContext, StateRecord,
    WriteCounts,
};
use serde::Serialize;

use super::print_json;
use crate::snapshot::Snapshot;

/// Result of a reconcile pass.
#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    /// Engine-visible state after the pass.
    pub node_state: NodeState,
    /// Writes issued per store.
    pub writes: WriteCounts,
    /// The control-plane version signature changed.
    pub internal_version_changed: bool,
    /// Converged capability flags.
    pub features: FeatureSet,
    /// The resolved service monitor address.
    pub svc_monitor_mac: String,
    /// The intent record after the pass.
    pub intent: Option<IntentRecord>,
    /// The state record after the pass.
    pub state: Option<StateRecord>,
}

/// Runs a full pass over `snapshot` and returns the report alongside the
/// updated snapshot.
pub fn reconcile(config: &NodeConfig, snapshot: Snapshot) -> Result<(ReconcileReport, Snapshot)> {
    let (mut stores, workers) = snapshot.into_parts();
    let mut node = GlobalConfigNode::from_config(config);

    node.begin_pass();
    node.run(&mut PassContext::new(&mut stores, Some(&workers)))
        .context("reconciliation pass failed")?;
    tracing::info!(writes = stores.writes().total(), "reconciliation pass complete");

    let report = ReconcileReport {
        node_state: node.node_state(),
        writes: stores.writes(),
        internal_version_changed: node.state().internal_version_changed(),
        features: node.state().features(),
        svc_monitor_mac: node.state().svc_monitor_mac_raw().to_string(),
        intent: stores.intent.clone(),
        state: stores.state.clone(),
    };
    Ok((report, Snapshot::from_parts(stores, workers)))
}

/// Entry point for the subcommand.
pub fn run(config: &NodeConfig, path: &Path, write: bool) -> Result<()> {
    let snapshot = Snapshot::load(path)?;
    let (report, updated) = reconcile(config, snapshot)?;

    if write && report.writes.total() > 0 {
        updated.save(path)?;
        tracing::info!(path = %path.display(), "snapshot updated");
    }
    print_json(&report)
}
