//! Inspect command implementation.

use serde::Serialize;
use std::path::Path;
use versakv_core::persist::{decode_manager, decode_store, ManagerSnapshot, StoreSnapshot};
use versakv_core::TransactionId;
use versakv_storage::{FileBackend, StorageBackend};

/// Snapshot inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data directory path.
    pub path: String,
    /// Data snapshot size in bytes.
    pub data_size: u64,
    /// State snapshot size in bytes.
    pub state_size: u64,
    /// Tid the next transaction would receive.
    pub next_tid: i64,
    /// Transactions active when the state was saved.
    pub active: Vec<i64>,
    /// Number of keys.
    pub key_count: usize,
    /// Number of versions across all keys.
    pub version_count: usize,
    /// Per-key chains.
    pub keys: Vec<KeyReport>,
}

/// One key's version chain.
#[derive(Debug, Serialize)]
pub struct KeyReport {
    /// The key, lossily decoded as UTF-8.
    pub key: String,
    /// Versions, oldest first.
    pub versions: Vec<VersionReport>,
}

/// One version.
#[derive(Debug, Serialize)]
pub struct VersionReport {
    /// Stored value; `None` for a tombstone.
    pub value: Option<i64>,
    /// Creating transaction.
    pub tid_begin: i64,
    /// Superseding transaction; `None` while the version is current.
    pub tid_end: Option<i64>,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Reads both snapshots in `path`.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let data_path = path.join("data.snapshot");
    let state_path = path.join("state.snapshot");

    if !data_path.exists() && !state_path.exists() {
        return Err(format!("No snapshots found at {}", path.display()).into());
    }

    let data_backend = FileBackend::open(&data_path)?;
    let state_backend = FileBackend::open(&state_path)?;

    let data = data_backend.read_all()?;
    let store = if data.is_empty() {
        StoreSnapshot::new()
    } else {
        decode_store(&data)?
    };

    let state = state_backend.read_all()?;
    let manager = if state.is_empty() {
        ManagerSnapshot::default()
    } else {
        decode_manager(&state)?
    };

    let keys: Vec<KeyReport> = store
        .iter()
        .map(|(key, chain)| KeyReport {
            key: key.to_string(),
            versions: chain
                .versions()
                .iter()
                .map(|v| VersionReport {
                    value: v.value,
                    tid_begin: v.tid_begin.as_i64(),
                    tid_end: (!v.is_open()).then(|| v.tid_end.as_i64()),
                })
                .collect(),
        })
        .collect();

    Ok(InspectResult {
        path: path.display().to_string(),
        data_size: data_backend.size()?,
        state_size: state_backend.size()?,
        next_tid: manager.next_tid.as_i64(),
        active: manager.active.iter().map(|t| t.as_i64()).collect(),
        key_count: keys.len(),
        version_count: keys.iter().map(|k| k.versions.len()).sum(),
        keys,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("versakv Snapshot Inspection");
    println!("===========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Storage:");
    println!("  Data snapshot:  {}", format_size(result.data_size));
    println!("  State snapshot: {}", format_size(result.state_size));
    println!();
    println!("Transactions:");
    println!("  Next tid: {}", TransactionId::new(result.next_tid));
    if result.active.is_empty() {
        println!("  Active:   none");
    } else {
        let active: Vec<String> = result
            .active
            .iter()
            .map(|t| TransactionId::new(*t).to_string())
            .collect();
        println!("  Active:   {}", active.join(", "));
    }
    println!();
    println!(
        "Keys: {} ({} versions)",
        result.key_count, result.version_count
    );
    for key in &result.keys {
        println!("  {}", key.key);
        for v in &key.versions {
            let value = v
                .value
                .map_or_else(|| "<deleted>".to_string(), |value| value.to_string());
            let end = v
                .tid_end
                .map_or_else(|| "open".to_string(), |t| TransactionId::new(t).to_string());
            println!(
                "    {:>12}  [{} .. {}]",
                value,
                TransactionId::new(v.tid_begin),
                end
            );
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
