//! Drop-sampling debug configuration.
//!
//! Operators can ask the control plane to sample dropped packets into an
//! IPFIX collector by setting `debug_drop_collector_set` and
//! `debug_drop_domain_id` on the intent record. Flow generation reads the
//! resulting action prefix; the global configuration node is responsible for
//! keeping it in step with the intent options.

use crate::bag::ConfigBag;

/// Intent option selecting the collector set for drop samples.
pub const DROP_COLLECTOR_SET_KEY: &str = "debug_drop_collector_set";

/// Intent option selecting the observation domain for drop samples.
pub const DROP_DOMAIN_ID_KEY: &str = "debug_drop_domain_id";

/// Observation domain ids must fit in 8 bits, and the all-ones value is
/// reserved.
const MAX_DOMAIN_ID: u32 = u8::MAX as u32;

/// A collaborator that derives debug settings from the intent options.
pub trait DebugConfig {
    /// Re-reads the debug settings from `options`.
    fn reload(&mut self, options: &ConfigBag);

    /// Releases everything derived so far.
    fn teardown(&mut self);
}

/// Drop sampling derived from the intent options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropSampling {
    collector_set_id: u32,
    observation_domain_id: u32,
    drop_action: Option<String>,
}

impl DropSampling {
    /// Creates an unconfigured instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if dropped packets are sampled.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.collector_set_id != 0
    }

    /// The active collector set id.
    #[must_use]
    pub const fn collector_set_id(&self) -> u32 {
        self.collector_set_id
    }

    /// The active observation domain id.
    #[must_use]
    pub const fn observation_domain_id(&self) -> u32 {
        self.observation_domain_id
    }

    /// Action text prepended to generated drop flows. Empty when disabled or
    /// not yet configured.
    #[must_use]
    pub fn drop_action(&self) -> &str {
        self.drop_action.as_deref().unwrap_or_default()
    }
}

impl DebugConfig for DropSampling {
    fn reload(&mut self, options: &ConfigBag) {
        let collector_set_id = options.get_u32(DROP_COLLECTOR_SET_KEY, 0);
        let observation_domain_id = options.get_u32(DROP_DOMAIN_ID_KEY, 0);

        if self.drop_action.is_some()
            && collector_set_id == self.collector_set_id
            && observation_domain_id == self.observation_domain_id
        {
            return;
        }

        if observation_domain_id >= MAX_DOMAIN_ID {
            tracing::error!(
                observation_domain_id,
                "observation domain id must be an 8-bit number, keeping previous drop sampling"
            );
            return;
        }

        self.collector_set_id = collector_set_id;
        self.observation_domain_id = observation_domain_id;
        self.drop_action = Some(if self.enabled() {
            format!(
                "sample(probability=65535,collector_set={collector_set_id},\
                 obs_domain={observation_domain_id},obs_point=$cookie); "
            )
        } else {
            String::new()
        });
        tracing::debug!(
            collector_set_id,
            observation_domain_id,
            enabled = self.enabled(),
            "drop sampling reconfigured"
        );
    }

    fn teardown(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(collector: &str, domain: &str) -> ConfigBag {
        [(DROP_COLLECTOR_SET_KEY, collector), (DROP_DOMAIN_ID_KEY, domain)]
            .into_iter()
            .collect()
    }

    #[test]
    fn disabled_by_default() {
        let mut sampling = DropSampling::new();
        sampling.reload(&ConfigBag::new());
        assert!(!sampling.enabled());
        assert_eq!(sampling.drop_action(), "");
    }

    #[test]
    fn enabled_with_collector_set() {
        let mut sampling = DropSampling::new();
        sampling.reload(&options("3", "7"));
        assert!(sampling.enabled());
        assert_eq!(
            sampling.drop_action(),
            "sample(probability=65535,collector_set=3,obs_domain=7,obs_point=$cookie); "
        );
    }

    #[test]
    fn oversized_domain_keeps_previous_settings() {
        let mut sampling = DropSampling::new();
        sampling.reload(&options("3", "7"));
        sampling.reload(&options("4", "255"));
        assert_eq!(sampling.collector_set_id(), 3);
        assert_eq!(sampling.observation_domain_id(), 7);
    }

    #[test]
    fn teardown_resets() {
        let mut sampling = DropSampling::new();
        sampling.reload(&options("3", "7"));
        sampling.teardown();
        assert_eq!(sampling, DropSampling::new());
    }
}
