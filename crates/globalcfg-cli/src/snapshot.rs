//! Snapshot files: both global records plus the worker table, in TOML.
//!
//! ```toml
//! [intent]
//! ipsec = false
//!
//! [intent.options]
//! mac_prefix = "0a:00:00"
//!
//! [[workers]]
//! name = "hv1"
//! other_config = { "ct-no-masked-label" = "true" }
//! encaps = [{ type = "geneve", ip = "10.0.0.1" }]
//! ```
//!
//! Missing records are created by a reconcile pass, exactly as the node does
//! against live stores.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use globalcfg_core::{IntentRecord, MemoryStores, StateRecord, WorkerTable};
use serde::{Deserialize, Serialize};

/// Upper bound on snapshot size, to keep a stray path from being slurped.
const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

/// The records and worker fleet the node reconciles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The intent store's global record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentRecord>,

    /// The state store's global record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateRecord>,

    /// Worker nodes, optionally tagged with this pass's changes.
    #[serde(default)]
    pub workers: WorkerTable,
}

impl Snapshot {
    /// Loads a snapshot from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_bounded(path, MAX_SNAPSHOT_BYTES)?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse snapshot {}", path.display()))
    }

    /// Writes the snapshot to `path`, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize snapshot")?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        temp.write_all(content.as_bytes())
            .context("failed to write temp file")?;
        temp.as_file()
            .sync_all()
            .context("failed to sync temp file")?;
        temp.persist(path)
            .with_context(|| format!("failed to persist {}", path.display()))?;
        Ok(())
    }

    /// Splits the snapshot into in-memory stores and the worker table.
    pub fn into_parts(self) -> (MemoryStores, WorkerTable) {
        (
            MemoryStores::with_records(self.intent, self.state),
            self.workers,
        )
    }

    /// Rebuilds a snapshot from the stores after a pass.
    ///
    /// Change tags are dropped, as they would be once the engine commits.
    pub fn from_parts(stores: MemoryStores, mut workers: WorkerTable) -> Self {
        workers.clear_tracked();
        Self {
            intent: stores.intent,
            state: stores.state,
            workers,
        }
    }
}

/// Reads at most `limit` bytes of `path`, failing if there is more.
fn read_bounded(path: &Path, limit: u64) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open snapshot {}", path.display()))?;

    let mut content = String::new();
    file.take(limit + 1)
        .read_to_string(&mut content)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;

    anyhow::ensure!(
        content.len() as u64 <= limit,
        "snapshot {} exceeds maximum size of {limit} bytes",
        path.display()
    );
    Ok(content)
}

#[cfg(test)]
mod tests {
    use globalcfg_core::{RowChange, WorkerNode};

    use super::*;

    const SAMPLE: &str = r#"
        [intent]
        ipsec = true

        [intent.options]
        mac_prefix = "0a:00:00"
        use_common_zone = "true"

        [[workers]]
        name = "hv1"
        other_config = { "ct-no-masked-label" = "true" }
        encaps = [{ type = "vxlan", ip = "10.0.0.1" }]

        [[workers]]
        name = "hv2"
        change = "inserted"
    "#;

    #[test]
    fn parses_records_and_workers() {
        let snapshot: Snapshot = toml::from_str(SAMPLE).unwrap();

        let intent = snapshot.intent.as_ref().unwrap();
        assert!(intent.ipsec);
        assert_eq!(intent.options.get("use_common_zone"), Some("true"));
        assert!(snapshot.state.is_none());

        assert_eq!(snapshot.workers.len(), 2);
        assert!(snapshot.workers.has_vxlan());
        let tracked: Vec<_> = snapshot
            .workers
            .tracked()
            .map(|(node, change)| (node.name.as_str(), change))
            .collect();
        assert_eq!(tracked, [("hv2", RowChange::Inserted)]);
    }

    #[test]
    fn empty_file_is_an_empty_snapshot() {
        let snapshot: Snapshot = toml::from_str("").unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn save_then_load_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.toml");

        let mut workers = WorkerTable::new();
        workers.push(WorkerNode::new("hv1").with_config("fdb-timestamp", "true"));
        workers.push_tracked(WorkerNode::new("gone"), RowChange::Deleted);
        let snapshot = Snapshot::from_parts(
            MemoryStores::with_records(Some(IntentRecord::default()), None),
            workers,
        );
        snapshot.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.workers.len(), 1);
        assert_eq!(loaded.workers.tracked().count(), 0);
    }

    #[test]
    fn oversized_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.toml");
        std::fs::write(&path, "# padding\n").unwrap();

        assert!(read_bounded(&path, 10).is_ok());
        let err = read_bounded(&path, 9).unwrap_err();
        assert!(format!("{err}").contains("exceeds maximum size"));
    }

    #[cfg(unix)]
    #[test]
    fn unbounded_device_is_cut_off() {
        let err = read_bounded(Path::new("/dev/zero"), 64).unwrap_err();
        assert!(format!("{err}").contains("exceeds maximum size"));
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[intent\n").unwrap();

        let err = Snapshot::load(&path).unwrap_err();
        assert!(format!("{err}").contains("broken.toml"));
    }
}
