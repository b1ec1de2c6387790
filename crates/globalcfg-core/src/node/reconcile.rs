//! Full recomputation of the global configuration.

use tracing::{debug, info};

use super::{
    GlobalConfigNode, IGNORE_CHASSIS_FEATURES, MAC_PREFIX, MAX_TUNID, NORTHD_INTERNAL_VERSION,
    PassContext, SVC_MONITOR_MAC,
};
use crate::debug::DebugConfig;
use crate::derivation::Derivations;
use crate::error::{GlobalConfigError, StoreKind};
use crate::features::FeatureSet;
use crate::mac::MacAddr;
use crate::records::WorkerTable;

impl<D: Derivations, G: DebugConfig> GlobalConfigNode<D, G> {
    /// Recomputes the node's state from the stores and writes back deltas.
    ///
    /// This:
    /// 1. Clears the tracked-change flags
    /// 2. Creates the intent record if the store has none
    /// 3. Resolves the MAC prefix, service monitor MAC, tunnel key ceiling and
    ///    version signature into a working copy of the intent options
    /// 4. Writes the working copy back (verify-then-set) if it differs
    /// 5. Converges capability flags, unless `ignore_chassis_features` is set
    /// 6. Creates the state record if needed, mirrors IPsec, and writes the
    ///    derived state options if they differ
    ///
    /// A store without any write-worthy difference sees no writes, so calling
    /// this twice in a row is idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails. In particular a concurrent
    /// change to the intent options surfaces as
    /// [`GlobalConfigError::Conflict`]; the engine aborts and retries the pass.
    pub fn run(&mut self, ctx: &mut PassContext<'_>) -> Result<(), GlobalConfigError> {
        self.clear_tracked_data();

        if ctx.stores.intent().is_none() {
            info!("intent store has no global record, creating one");
            ctx.stores.insert_intent()?;
        }
        let intent = ctx
            .stores
            .intent()
            .cloned()
            .ok_or(GlobalConfigError::missing_record(StoreKind::Intent))?;

        let mac_prefix = self.derivations.mac_prefix(intent.options.get(MAC_PREFIX));

        let adopted_mac = intent.options.get(SVC_MONITOR_MAC).and_then(|text| {
            text.parse::<MacAddr>()
                .inspect_err(|error| debug!(text, %error, "ignoring unparsable monitor mac"))
                .ok()
        });

        let mut options = intent.options.clone();
        options.replace(MAC_PREFIX, mac_prefix);

        let monitor_mac = if let Some(mac) = adopted_mac {
            mac
        } else {
            let mac = MacAddr::random_local();
            info!(%mac, "generated service monitor mac");
            options.replace(SVC_MONITOR_MAC, mac.to_string());
            mac
        };
        self.state.set_svc_monitor_mac(monitor_mac);

        let max_tunid = self.derivations.max_tunnel_key(ctx.workers);
        options.replace(MAX_TUNID, max_tunid.to_string());

        let version = self.derivations.internal_version();
        self.state.internal_version_changed =
            options.get_or(NORTHD_INTERNAL_VERSION, "") != version;
        if self.state.internal_version_changed {
            info!(%version, "control plane version changed");
            options.replace(NORTHD_INTERNAL_VERSION, version);
        }

        if options != intent.options {
            debug!("writing intent options");
            ctx.stores
                .set_intent_options(&intent.options, options.clone())?;
        }
        self.state.intent_options = options;

        if intent.options.get_bool(IGNORE_CHASSIS_FEATURES, false) {
            self.state.features.enable_all();
        } else {
            let empty = WorkerTable::new();
            self.state.features = FeatureSet::from_workers(ctx.workers.unwrap_or(&empty));
        }
        debug!(features = ?self.state.features, "capability flags converged");

        self.debug.reload(&intent.options);

        if ctx.stores.state().is_none() {
            info!("state store has no global record, creating one");
            ctx.stores.insert_state()?;
        }
        let state = ctx
            .stores
            .state()
            .cloned()
            .ok_or(GlobalConfigError::missing_record(StoreKind::State))?;

        if intent.ipsec != state.ipsec {
            ctx.stores.set_state_ipsec(intent.ipsec)?;
        }

        self.sync_state_options(ctx.stores, &state.options)?;

        self.mark_updated();
        Ok(())
    }
}
