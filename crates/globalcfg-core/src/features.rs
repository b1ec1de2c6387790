//! Fleet-wide capability convergence.
//!
//! Every local worker advertises the datapath capabilities it supports in its
//! capability bag. A capability may only be used by derived flows when *all*
//! local workers support it, so the converged flag is the logical AND of the
//! advertisements, seeded with `true`.
//!
//! # Monotonicity
//!
//! [`converge`] only ever clears flags. Reaching an authoritative result
//! therefore requires starting from [`FeatureSet::all_enabled`], which is what
//! [`FeatureSet::from_workers`] does. A partial scan over a flag set that was
//! not reset can only add evidence against a capability, never remove it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::WorkerTable;

/// A datapath capability workers can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Conntrack matches without masked labels.
    CtNoMaskedLabel,
    /// Timestamps on learned MAC bindings.
    MacBindingTimestamp,
    /// Conntrack tracking of load balancer related traffic.
    CtLbRelated,
    /// Timestamps on learned forwarding database entries.
    FdbTimestamp,
    /// Datapath group column on logical switch flows.
    LsDpgColumn,
    /// Second revision of the NAT conntrack commit action.
    CtCommitNatV2,
    /// Conntrack commit into an explicit zone.
    CtCommitToZone,
}

impl Feature {
    /// Every capability, in the order they are evaluated.
    pub const ALL: [Self; 7] = [
        Self::CtNoMaskedLabel,
        Self::MacBindingTimestamp,
        Self::CtLbRelated,
        Self::FdbTimestamp,
        Self::LsDpgColumn,
        Self::CtCommitNatV2,
        Self::CtCommitToZone,
    ];

    /// The capability bag key a worker uses to advertise this feature.
    #[must_use]
    pub const fn advertisement_key(self) -> &'static str {
        match self {
            Self::CtNoMaskedLabel => "ct-no-masked-label",
            Self::MacBindingTimestamp => "mac-binding-timestamp",
            Self::CtLbRelated => "ovn-ct-lb-related",
            Self::FdbTimestamp => "fdb-timestamp",
            Self::LsDpgColumn => "ls-dpg-column",
            Self::CtCommitNatV2 => "ct-commit-nat-v2",
            Self::CtCommitToZone => "ct-commit-to-zone",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.advertisement_key())
    }
}

/// Converged capability flags.
///
/// Equality covers every flag, so detecting a change after a rescan is a
/// plain `!=`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureSet {
    disabled: u8,
}

impl FeatureSet {
    /// A set with every capability enabled.
    #[must_use]
    pub const fn all_enabled() -> Self {
        Self { disabled: 0 }
    }

    /// Recomputes the set from scratch over `workers`.
    #[must_use]
    pub fn from_workers(workers: &WorkerTable) -> Self {
        let mut features = Self::all_enabled();
        converge(&mut features, workers);
        features
    }

    /// Re-enables every capability.
    pub fn enable_all(&mut self) {
        *self = Self::all_enabled();
    }

    /// Returns `true` if `feature` is usable fleet-wide.
    #[must_use]
    pub const fn is_enabled(self, feature: Feature) -> bool {
        self.disabled & feature.bit() == 0
    }

    /// Marks `feature` as unsupported by at least one worker.
    pub fn disable(&mut self, feature: Feature) {
        self.disabled |= feature.bit();
    }

    /// Returns `true` if every capability is enabled.
    #[must_use]
    pub const fn all(self) -> bool {
        self.disabled == 0
    }

    /// Iterates each capability with its flag.
    pub fn iter(self) -> impl Iterator<Item = (Feature, bool)> {
        Feature::ALL.into_iter().map(move |f| (f, self.is_enabled(f)))
    }

    /// Capabilities whose flag differs between `self` and `other`.
    #[must_use]
    pub fn changed_features(self, other: Self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.is_enabled(*f) != other.is_enabled(*f))
            .collect()
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Serialize for FeatureSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Clears every flag that some local worker in `workers` does not advertise.
///
/// Missing advertisements count as unsupported. Remote workers are skipped
/// because they never install flows derived by this control plane. Flags are
/// never set here; callers wanting an authoritative result must reset first.
pub fn converge(features: &mut FeatureSet, workers: &WorkerTable) {
    for worker in workers.live() {
        if worker.is_remote() {
            continue;
        }

        for feature in Feature::ALL {
            if !worker
                .other_config
                .get_bool(feature.advertisement_key(), false)
            {
                features.disable(feature);
            }
        }
    }
}
