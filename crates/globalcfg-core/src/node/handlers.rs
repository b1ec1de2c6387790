//! Incremental handlers, one per upstream input.
//!
//! Each handler decides whether a change to its input can be reflected in the
//! cached state without a full recompute. Intent options fall into two tiers:
//!
//! - [`STRUCTURAL_KEYS`] feed derivations with side effects that only
//!   [`GlobalConfigNode::run`] performs. Any drift escalates.
//! - [`PASSTHROUGH_KEYS`] are forwarded uninterpreted. Drift is absorbed and
//!   flagged for dependents through `options_changed`.
//!
//! Keys in neither list are forwarded to the state store without raising any
//! flag.

use tracing::debug;

use super::{
    ChangeOutcome, GlobalConfigNode, IGNORE_CHASSIS_FEATURES, MAC_PREFIX, MAX_TUNID,
    NORTHD_INTERNAL_VERSION, PassContext, SVC_MONITOR_MAC,
};
use crate::bag::ConfigBag;
use crate::debug::{DROP_COLLECTOR_SET_KEY, DROP_DOMAIN_ID_KEY, DebugConfig};
use crate::derivation::Derivations;
use crate::error::GlobalConfigError;
use crate::features::FeatureSet;
use crate::records::IntentColumns;

/// An intent option watched for drift against the cached snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedKey {
    /// Option name.
    pub key: &'static str,
    /// Whether absence on either side counts as drift.
    pub must_be_present: bool,
}

impl TrackedKey {
    const fn required(key: &'static str) -> Self {
        Self {
            key,
            must_be_present: true,
        }
    }

    const fn optional(key: &'static str) -> Self {
        Self {
            key,
            must_be_present: false,
        }
    }

    /// Returns `true` if the option differs between `current` and `saved`.
    #[must_use]
    pub fn drifted(&self, current: &ConfigBag, saved: &ConfigBag) -> bool {
        match (current.get(self.key), saved.get(self.key)) {
            (Some(a), Some(b)) => a != b,
            (None, None) => self.must_be_present,
            _ => true,
        }
    }
}

/// Options only the full recompute may reconcile, in evaluation order.
pub const STRUCTURAL_KEYS: [TrackedKey; 5] = [
    TrackedKey::required(SVC_MONITOR_MAC),
    TrackedKey::required(MAX_TUNID),
    TrackedKey::required(MAC_PREFIX),
    TrackedKey::optional(IGNORE_CHASSIS_FEATURES),
    TrackedKey::optional(NORTHD_INTERNAL_VERSION),
];

/// Options forwarded as-is whose drift matters to dependents.
pub const PASSTHROUGH_KEYS: [TrackedKey; 11] = [
    TrackedKey::optional("mac_binding_removal_limit"),
    TrackedKey::optional("fdb_removal_limit"),
    TrackedKey::optional("controller_event"),
    TrackedKey::optional("ignore_lsp_down"),
    TrackedKey::optional("use_ct_inv_match"),
    TrackedKey::optional("default_acl_drop"),
    TrackedKey::optional(DROP_DOMAIN_ID_KEY),
    TrackedKey::optional(DROP_COLLECTOR_SET_KEY),
    TrackedKey::optional("use_common_zone"),
    TrackedKey::optional("install_ls_lb_from_router"),
    TrackedKey::optional("bcast_arp_req_flood"),
];

/// Returns the first structural option that drifted, if any.
#[must_use]
pub fn structural_drift(current: &ConfigBag, saved: &ConfigBag) -> Option<&'static str> {
    STRUCTURAL_KEYS
        .iter()
        .find(|k| k.drifted(current, saved))
        .map(|k| k.key)
}

/// Returns every passthrough option that drifted.
#[must_use]
pub fn passthrough_drift(current: &ConfigBag, saved: &ConfigBag) -> Vec<&'static str> {
    PASSTHROUGH_KEYS
        .iter()
        .filter(|k| k.drifted(current, saved))
        .map(|k| k.key)
        .collect()
}

impl<D: Derivations, G: DebugConfig> GlobalConfigNode<D, G> {
    /// Absorbs a change to the intent record.
    ///
    /// `updated` lists the intent columns that changed this pass.
    ///
    /// # Errors
    ///
    /// Returns an error if mirroring IPsec or writing the state options fails.
    pub fn handle_intent_change(
        &mut self,
        ctx: &mut PassContext<'_>,
        updated: IntentColumns,
    ) -> Result<ChangeOutcome, GlobalConfigError> {
        let Some(intent) = ctx.stores.intent().cloned() else {
            debug!("no intent record, escalating");
            return Ok(ChangeOutcome::Escalate);
        };
        let Some(state) = ctx.stores.state().cloned() else {
            debug!("no state record, escalating");
            return Ok(ChangeOutcome::Escalate);
        };

        if !updated.any() {
            return Ok(ChangeOutcome::Absorbed);
        }

        if intent.ipsec != state.ipsec {
            ctx.stores.set_state_ipsec(intent.ipsec)?;
        }

        self.state.tracked = true;

        if intent.options == self.state.intent_options {
            return Ok(ChangeOutcome::Absorbed);
        }

        if let Some(key) = structural_drift(&intent.options, &self.state.intent_options) {
            debug!(key, "structural intent option drifted, escalating");
            return Ok(ChangeOutcome::Escalate);
        }

        let drifted = passthrough_drift(&intent.options, &self.state.intent_options);
        if !drifted.is_empty() {
            debug!(?drifted, "passthrough intent options changed");
            self.state.tracked_data.options_changed = true;
            if drifted
                .iter()
                .any(|k| *k == DROP_DOMAIN_ID_KEY || *k == DROP_COLLECTOR_SET_KEY)
            {
                self.debug.reload(&intent.options);
            }
        }

        self.state.intent_options = intent.options;
        self.sync_state_options(ctx.stores, &state.options)?;
        self.mark_updated();
        Ok(ChangeOutcome::Absorbed)
    }

    /// Absorbs a change to the state record.
    ///
    /// Only the node's own writes are absorbed. Anything else was written by
    /// an external party and needs the full recompute to reconcile.
    pub fn handle_state_change(&self, ctx: &PassContext<'_>) -> ChangeOutcome {
        let Some(state) = ctx.stores.state() else {
            debug!("no state record, escalating");
            return ChangeOutcome::Escalate;
        };

        if state.options == self.state.state_options {
            ChangeOutcome::Absorbed
        } else {
            debug!("state options changed externally, escalating");
            ChangeOutcome::Escalate
        }
    }

    /// Absorbs a change to the worker table.
    ///
    /// # Errors
    ///
    /// Returns an error if rewriting the state options after a capability
    /// change fails.
    pub fn handle_worker_change(
        &mut self,
        ctx: &mut PassContext<'_>,
    ) -> Result<ChangeOutcome, GlobalConfigError> {
        let Some(workers) = ctx.workers else {
            return Ok(ChangeOutcome::Absorbed);
        };

        for (worker, change) in workers.tracked() {
            if change.alters_topology() || worker.encaps.iter().any(|e| e.modified) {
                debug!(worker = %worker.name, ?change, "worker topology changed, escalating");
                return Ok(ChangeOutcome::Escalate);
            }
        }

        if self
            .state
            .intent_options
            .get_bool(IGNORE_CHASSIS_FEATURES, false)
        {
            return Ok(ChangeOutcome::Absorbed);
        }

        if !workers
            .tracked()
            .any(|(_, change)| change.updates_other_config())
        {
            return Ok(ChangeOutcome::Absorbed);
        }

        let previous = self.state.features;
        let features = FeatureSet::from_workers(workers);
        if features == previous {
            return Ok(ChangeOutcome::Absorbed);
        }

        let Some(stored) = ctx.stores.state().map(|s| s.options.clone()) else {
            debug!("no state record, escalating");
            return Ok(ChangeOutcome::Escalate);
        };

        debug!(changed = ?previous.changed_features(features), "capability flags changed");
        self.state.features = features;
        self.state.tracked_data.features_changed = true;
        self.state.tracked = true;
        self.sync_state_options(ctx.stores, &stored)?;
        self.mark_updated();
        Ok(ChangeOutcome::Absorbed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> ConfigBag {
        pairs.iter().copied().collect()
    }

    #[test]
    fn required_key_absent_on_both_sides_drifts() {
        let key = TrackedKey::required(MAC_PREFIX);
        assert!(key.drifted(&ConfigBag::new(), &ConfigBag::new()));
    }

    #[test]
    fn optional_key_absent_on_both_sides_is_stable() {
        let key = TrackedKey::optional(IGNORE_CHASSIS_FEATURES);
        assert!(!key.drifted(&ConfigBag::new(), &ConfigBag::new()));
        assert!(key.drifted(&bag(&[(IGNORE_CHASSIS_FEATURES, "true")]), &ConfigBag::new()));
        assert!(key.drifted(&ConfigBag::new(), &bag(&[(IGNORE_CHASSIS_FEATURES, "true")])));
    }

    #[test]
    fn value_change_drifts() {
        let key = TrackedKey::optional("ignore_lsp_down");
        assert!(key.drifted(
            &bag(&[("ignore_lsp_down", "false")]),
            &bag(&[("ignore_lsp_down", "true")])
        ));
        assert!(!key.drifted(
            &bag(&[("ignore_lsp_down", "true")]),
            &bag(&[("ignore_lsp_down", "true")])
        ));
    }

    #[test]
    fn key_tiers_are_disjoint() {
        for s in &STRUCTURAL_KEYS {
            assert!(
                !PASSTHROUGH_KEYS.iter().any(|p| p.key == s.key),
                "{} is in both tiers",
                s.key
            );
        }
    }

    #[test]
    fn structural_drift_reports_first_key_in_order() {
        let saved = bag(&[
            (SVC_MONITOR_MAC, "0a:00:00:00:00:01"),
            (MAX_TUNID, "4095"),
            (MAC_PREFIX, "0a:00:00"),
        ]);
        let mut current = saved.clone();
        current.replace(MAC_PREFIX, "0b:00:00");
        current.replace(MAX_TUNID, "16711679");
        assert_eq!(structural_drift(&current, &saved), Some(MAX_TUNID));
        assert_eq!(structural_drift(&saved, &saved), None);
    }

    #[test]
    fn passthrough_drift_reports_every_key() {
        let saved = bag(&[("controller_event", "true")]);
        let current = bag(&[("use_common_zone", "true"), (DROP_DOMAIN_ID_KEY, "3")]);
        assert_eq!(
            passthrough_drift(&current, &saved),
            vec!["controller_event", DROP_DOMAIN_ID_KEY, "use_common_zone"]
        );
    }
}
