//! Records read from the intent store, the state store, and the worker fleet.
//!
//! Only the fields the global configuration node touches are modelled. The
//! engine hands these to the node as read-only views for the duration of a
//! pass; writes go through [`GlobalStores`](crate::store::GlobalStores).

use serde::{Deserialize, Serialize};

use crate::bag::ConfigBag;

/// Capability bag key marking a worker as belonging to a remote zone.
pub const IS_REMOTE_KEY: &str = "is-remote";

/// Encapsulation type that limits the datapath tunnel key space.
pub const VXLAN_ENCAP: &str = "vxlan";

/// The singleton record in the intent store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    /// Operator-authored options.
    #[serde(default)]
    pub options: ConfigBag,

    /// Whether IPsec tunnel encryption is requested.
    #[serde(default)]
    pub ipsec: bool,
}

/// The singleton record in the state store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Options published to worker nodes.
    #[serde(default)]
    pub options: ConfigBag,

    /// IPsec toggle mirrored from the intent record.
    #[serde(default)]
    pub ipsec: bool,
}

/// Intent record columns that changed since the previous pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentColumns {
    /// The option bag changed.
    #[serde(default)]
    pub options: bool,

    /// The IPsec toggle changed.
    #[serde(default)]
    pub ipsec: bool,
}

impl IntentColumns {
    /// Both columns marked as changed.
    pub const ALL: Self = Self {
        options: true,
        ipsec: true,
    };

    /// Returns `true` if any column the node depends on changed.
    #[must_use]
    pub const fn any(self) -> bool {
        self.options || self.ipsec
    }
}

/// A tunnel encapsulation endpoint hosted by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encap {
    /// Encapsulation type, e.g. `geneve` or `vxlan`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Tunnel endpoint address.
    pub ip: String,

    /// The endpoint row itself was modified during this pass.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub modified: bool,
}

impl Encap {
    /// Creates an unmodified endpoint.
    #[must_use]
    pub fn new(kind: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ip: ip.into(),
            modified: false,
        }
    }
}

/// A worker node advertising capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerNode {
    /// Worker identity.
    pub name: String,

    /// Capability advertisements.
    #[serde(default)]
    pub other_config: ConfigBag,

    /// Hosted tunnel endpoints.
    #[serde(default)]
    pub encaps: Vec<Encap>,
}

impl WorkerNode {
    /// Creates a worker with no advertisements and no endpoints.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a capability advertisement.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.other_config.replace(key, value);
        self
    }

    /// Adds a tunnel endpoint.
    #[must_use]
    pub fn with_encap(mut self, encap: Encap) -> Self {
        self.encaps.push(encap);
        self
    }

    /// Remote workers do not run flows derived by this control plane.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.other_config.get_bool(IS_REMOTE_KEY, false)
    }
}

/// How a worker row changed since the previous pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowChange {
    /// The row was created.
    Inserted,
    /// The row was removed.
    Deleted,
    /// One or more columns changed.
    Updated {
        /// The capability bag changed.
        #[serde(default)]
        other_config: bool,
        /// The endpoint reference list changed.
        #[serde(default)]
        encaps: bool,
    },
}

impl RowChange {
    /// A change touching only the capability bag.
    pub const OTHER_CONFIG: Self = Self::Updated {
        other_config: true,
        encaps: false,
    };

    /// A change touching only the endpoint list.
    pub const ENCAPS: Self = Self::Updated {
        other_config: false,
        encaps: true,
    };

    /// Returns `true` for inserts, deletes, and endpoint list updates.
    #[must_use]
    pub const fn alters_topology(self) -> bool {
        match self {
            Self::Inserted | Self::Deleted => true,
            Self::Updated { encaps, .. } => encaps,
        }
    }

    /// Returns `true` if the capability bag was updated in place.
    #[must_use]
    pub const fn updates_other_config(self) -> bool {
        matches!(
            self,
            Self::Updated {
                other_config: true,
                ..
            }
        )
    }
}

/// A worker row together with its change tag for this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRow {
    /// Row contents. For deleted rows, the last known contents.
    #[serde(flatten)]
    pub node: WorkerNode,

    /// Change tag, or `None` if the row is untouched this pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<RowChange>,
}

/// The worker table view supplied to the node for one pass.
///
/// Deleted rows are only visible through [`WorkerTable::tracked`], matching
/// how a change-tracking replica exposes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerTable {
    rows: Vec<WorkerRow>,
}

impl WorkerTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Builds a table of untouched rows.
    #[must_use]
    pub fn from_nodes(nodes: impl IntoIterator<Item = WorkerNode>) -> Self {
        Self {
            rows: nodes
                .into_iter()
                .map(|node| WorkerRow { node, change: None })
                .collect(),
        }
    }

    /// Adds an untouched row.
    pub fn push(&mut self, node: WorkerNode) {
        self.rows.push(WorkerRow { node, change: None });
    }

    /// Adds a row carrying a change tag.
    pub fn push_tracked(&mut self, node: WorkerNode, change: RowChange) {
        self.rows.push(WorkerRow {
            node,
            change: Some(change),
        });
    }

    /// Iterates rows that currently exist.
    pub fn live(&self) -> impl Iterator<Item = &WorkerNode> {
        self.rows
            .iter()
            .filter(|row| row.change != Some(RowChange::Deleted))
            .map(|row| &row.node)
    }

    /// Iterates rows that changed this pass, including deleted ones.
    pub fn tracked(&self) -> impl Iterator<Item = (&WorkerNode, RowChange)> {
        self.rows
            .iter()
            .filter_map(|row| row.change.map(|change| (&row.node, change)))
    }

    /// Drops all change tags and deleted rows, as after the engine commits.
    pub fn clear_tracked(&mut self) {
        self.rows.retain(|row| row.change != Some(RowChange::Deleted));
        for row in &mut self.rows {
            row.change = None;
            for encap in &mut row.node.encaps {
                encap.modified = false;
            }
        }
    }

    /// Returns the number of live rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live().count()
    }

    /// Returns `true` if no live rows exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live().next().is_none()
    }

    /// Returns `true` if any live worker hosts a VXLAN endpoint.
    #[must_use]
    pub fn has_vxlan(&self) -> bool {
        self.live()
            .flat_map(|node| node.encaps.iter())
            .any(|encap| encap.kind == VXLAN_ENCAP)
    }
}
