//! Derivation of the state store's option bag.

use super::GlobalConfigNode;
use crate::bag::ConfigBag;
use crate::debug::DebugConfig;
use crate::derivation::Derivations;
use crate::error::GlobalConfigError;
use crate::features::{Feature, FeatureSet};
use crate::store::GlobalStores;

/// Tells workers whether load balancer hairpin flows may use `ct_mark`.
/// Absent means `true`.
pub const LB_HAIRPIN_USE_CT_MARK: &str = "lb_hairpin_use_ct_mark";

/// Probe interval owned by the state store's own clients.
pub const SBCTL_PROBE_INTERVAL: &str = "sbctl_probe_interval";

/// Marks that generated flows output explicitly after ARP/ND actions.
pub const ARP_NS_EXPLICIT_OUTPUT: &str = "arp_ns_explicit_output";

/// Derives the state options from the intent snapshot and features.
///
/// `stored` is the state record's current bag; only its
/// `sbctl_probe_interval` is carried over, since that key is written by
/// state store clients and must survive the intent-derived overwrite.
#[must_use]
pub fn derive_state_options(
    intent_options: &ConfigBag,
    features: FeatureSet,
    stored: &ConfigBag,
) -> ConfigBag {
    let mut options = intent_options.clone();

    if features.is_enabled(Feature::CtNoMaskedLabel) {
        options.remove(LB_HAIRPIN_USE_CT_MARK);
    } else {
        options.replace(LB_HAIRPIN_USE_CT_MARK, "false");
    }

    if let Some(interval) = stored.get(SBCTL_PROBE_INTERVAL) {
        options.replace(SBCTL_PROBE_INTERVAL, interval);
    }

    options.replace(ARP_NS_EXPLICIT_OUTPUT, "true");
    options
}

impl<D: Derivations, G: DebugConfig> GlobalConfigNode<D, G> {
    /// Rederives the state options and writes them if `stored` differs.
    ///
    /// Returns `true` if a write was issued.
    pub(super) fn sync_state_options(
        &mut self,
        stores: &mut dyn GlobalStores,
        stored: &ConfigBag,
    ) -> Result<bool, GlobalConfigError> {
        let options =
            derive_state_options(&self.state.intent_options, self.state.features, stored);
        let changed = options != *stored;
        if changed {
            tracing::debug!(keys = options.len(), "writing state options");
            stores.set_state_options(options.clone())?;
        }
        self.state.state_options = options;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> ConfigBag {
        pairs.iter().copied().collect()
    }

    #[test]
    fn hairpin_option_follows_masked_label_support() {
        let intent = bag(&[(LB_HAIRPIN_USE_CT_MARK, "true")]);

        let all = derive_state_options(&intent, FeatureSet::all_enabled(), &ConfigBag::new());
        assert_eq!(all.get(LB_HAIRPIN_USE_CT_MARK), None);

        let mut partial = FeatureSet::all_enabled();
        partial.disable(Feature::CtNoMaskedLabel);
        let derived = derive_state_options(&intent, partial, &ConfigBag::new());
        assert_eq!(derived.get(LB_HAIRPIN_USE_CT_MARK), Some("false"));
    }

    #[test]
    fn other_features_do_not_touch_hairpin_option() {
        let mut features = FeatureSet::all_enabled();
        features.disable(Feature::CtLbRelated);
        let derived = derive_state_options(&ConfigBag::new(), features, &ConfigBag::new());
        assert!(!derived.contains(LB_HAIRPIN_USE_CT_MARK));
    }

    #[test]
    fn probe_interval_is_owned_by_state_store() {
        let intent = bag(&[(SBCTL_PROBE_INTERVAL, "1000"), ("use_common_zone", "true")]);
        let stored = bag(&[(SBCTL_PROBE_INTERVAL, "30000"), ("stale", "x")]);
        let derived = derive_state_options(&intent, FeatureSet::all_enabled(), &stored);

        assert_eq!(derived.get(SBCTL_PROBE_INTERVAL), Some("30000"));
        assert_eq!(derived.get("use_common_zone"), Some("true"));
        assert!(!derived.contains("stale"));
    }

    #[test]
    fn explicit_output_marker_always_set() {
        let intent = bag(&[(ARP_NS_EXPLICIT_OUTPUT, "false")]);
        let derived = derive_state_options(&intent, FeatureSet::all_enabled(), &ConfigBag::new());
        assert_eq!(derived.get(ARP_NS_EXPLICIT_OUTPUT), Some("true"));
    }
}
