//! `globalcfg features`: converged capability flags for a snapshot.

use std::path::Path;

use anyhow::Result;
use globalcfg_core::FeatureSet;
use globalcfg_core::node::IGNORE_CHASSIS_FEATURES;
use serde::Serialize;

use super::print_json;
use crate::snapshot::Snapshot;

/// Converged flags and what they were computed from.
#[derive(Debug, Serialize)]
pub struct FeaturesReport {
    /// The intent record freezes every flag to enabled.
    pub ignore_chassis_features: bool,
    /// Live workers, remote ones included.
    pub workers: usize,
    /// Live workers that count towards convergence.
    pub local_workers: usize,
    /// The converged flags.
    pub features: FeatureSet,
}

/// Computes the flags a full pass would converge to for `snapshot`.
#[must_use]
pub fn converge(snapshot: &Snapshot) -> FeaturesReport {
    let ignore = snapshot
        .intent
        .as_ref()
        .is_some_and(|intent| intent.options.get_bool(IGNORE_CHASSIS_FEATURES, false));

    let features = if ignore {
        FeatureSet::all_enabled()
    } else {
        FeatureSet::from_workers(&snapshot.workers)
    };

    FeaturesReport {
        ignore_chassis_features: ignore,
        workers: snapshot.workers.len(),
        local_workers: snapshot.workers.live().filter(|w| !w.is_remote()).count(),
        features,
    }
}

/// Entry point for the subcommand.
pub fn run(path: &Path) -> Result<()> {
    let snapshot = Snapshot::load(path)?;
    print_json(&converge(&snapshot))
}
