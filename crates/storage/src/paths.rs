//! Object key layout.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Key of a backup object:
/// `{prefix}/{stream}/{YYYY}/{MM}/{DD}/{HH}/{stream}-{epoch:013}-{sequence:020}.json`.
///
/// The time bucket is the batch's open time and `epoch` tells engine runs
/// apart, so the key is a pure function of the batch: a second persist of the
/// same batch lands on the same object, a batch from another run never does.
pub fn format_backup_path(
    prefix: &str,
    stream: &str,
    opened_at: DateTime<Utc>,
    epoch: u64,
    sequence: u64,
) -> String {
    format!(
        "{}{}/{:04}/{:02}/{:02}/{:02}/{}-{:013}-{:020}.json",
        prefix_dir(prefix),
        stream,
        opened_at.year(),
        opened_at.month(),
        opened_at.day(),
        opened_at.hour(),
        stream,
        epoch,
        sequence
    )
}

/// Key prefix under which all backups of `stream` live.
pub fn format_backup_stream_prefix(prefix: &str, stream: &str) -> String {
    format!("{}{}", prefix_dir(prefix), stream)
}

fn prefix_dir(prefix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{}/", prefix)
    }
}
