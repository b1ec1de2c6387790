//! Subcommand implementations.

pub mod features;
pub mod reconcile;

use anyhow::{Context, Result};
use serde::Serialize;

/// Prints `value` to stdout as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}
