//! Pure derivations the full recompute delegates to.
//!
//! The node treats these as black boxes behind [`Derivations`], so an engine
//! embedding it can substitute its own rules (and tests can pin values).
//! [`StandardDerivations`] provides the rules the control plane ships with.

use crate::config::VersionConfig;
use crate::mac::{MacAddr, parse_octets};
use crate::records::WorkerTable;

/// Largest datapath tunnel key.
pub const MAX_DP_KEY: u32 = (1 << 24) - 1;

/// Keys reserved for globally allocated datapaths.
pub const MAX_DP_GLOBAL_NUM: u32 = 1 << 16;

/// Largest tunnel key when any endpoint uses VXLAN, which carries only 12 bits
/// of datapath key.
pub const MAX_DP_VXLAN_KEY: u32 = (1 << 12) - 1;

/// Derivations consumed by the full recompute.
pub trait Derivations {
    /// Resolves the MAC prefix from the configured `mac_prefix` option.
    ///
    /// Returns the `xx:xx:xx` text to store back into the intent options.
    fn mac_prefix(&mut self, configured: Option<&str>) -> String;

    /// Largest tunnel key locally allocated datapaths may use.
    ///
    /// `None` means the worker table is not available, which counts as an
    /// empty fleet.
    fn max_tunnel_key(&self, workers: Option<&WorkerTable>) -> u32;

    /// Signature of the running control-plane build.
    fn internal_version(&self) -> String;
}

/// The derivation rules shipped with the control plane.
#[derive(Debug, Clone, Default)]
pub struct StandardDerivations {
    version: VersionConfig,
    generated_prefix: Option<[u8; 3]>,
}

impl StandardDerivations {
    /// Creates derivations for the given build identity.
    #[must_use]
    pub const fn new(version: VersionConfig) -> Self {
        Self {
            version,
            generated_prefix: None,
        }
    }

    fn random_prefix(&mut self) -> [u8; 3] {
        *self.generated_prefix.get_or_insert_with(|| {
            let [a, b, c, ..] = MacAddr::random_local().octets();
            [a, b, c]
        })
    }
}

impl Derivations for StandardDerivations {
    /// An absent, unparsable, or all-zero prefix is replaced by a random
    /// locally administered one, generated once per node lifetime.
    fn mac_prefix(&mut self, configured: Option<&str>) -> String {
        let prefix = configured
            .and_then(|text| parse_octets::<3>(text).ok())
            .filter(|octets| octets.iter().any(|b| *b != 0));
        let [a, b, c] = match prefix {
            Some(octets) => octets,
            None => {
                tracing::debug!(configured, "generating random mac prefix");
                self.random_prefix()
            },
        };
        format!("{a:02x}:{b:02x}:{c:02x}")
    }

    fn max_tunnel_key(&self, workers: Option<&WorkerTable>) -> u32 {
        if workers.is_some_and(WorkerTable::has_vxlan) {
            MAX_DP_VXLAN_KEY
        } else {
            MAX_DP_KEY - MAX_DP_GLOBAL_NUM
        }
    }

    fn internal_version(&self) -> String {
        self.version.signature()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Encap, VXLAN_ENCAP, WorkerNode};

    #[test]
    fn configured_prefix_is_normalized() {
        let mut d = StandardDerivations::default();
        assert_eq!(d.mac_prefix(Some("A:b:0C")), "0a:0b:0c");
    }

    #[test]
    fn missing_or_zero_prefix_is_generated_once() {
        let mut d = StandardDerivations::default();
        let first = d.mac_prefix(None);
        assert_eq!(first.len(), 8);
        assert_eq!(d.mac_prefix(Some("00:00:00")), first);
        assert_eq!(d.mac_prefix(Some("garbage")), first);

        let octet = u8::from_str_radix(&first[..2], 16).unwrap();
        assert_eq!(octet & 0x03, 0x02, "prefix must be local unicast");
    }

    #[test]
    fn tunnel_key_depends_on_vxlan() {
        let d = StandardDerivations::default();
        assert_eq!(d.max_tunnel_key(None), 16_711_679);

        let geneve = WorkerTable::from_nodes([
            WorkerNode::new("hv1").with_encap(Encap::new("geneve", "10.0.0.1"))
        ]);
        assert_eq!(d.max_tunnel_key(Some(&geneve)), 16_711_679);

        let vxlan = WorkerTable::from_nodes([
            WorkerNode::new("hv2").with_encap(Encap::new(VXLAN_ENCAP, "10.0.0.2"))
        ]);
        assert_eq!(d.max_tunnel_key(Some(&vxlan)), 4095);
    }

    #[test]
    fn version_comes_from_config() {
        let d = StandardDerivations::new(VersionConfig {
            package: "24.09.0".to_string(),
            schema: "20.37.0".to_string(),
            actions: 98,
            minor: 5,
        });
        assert_eq!(d.internal_version(), "24.09.0-20.37.0-98.5");
    }
}
