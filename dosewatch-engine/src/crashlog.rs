//! Best-effort crash diagnostics.
//!
//! The loop must never vanish without a trace: when a cycle aborts, a
//! timestamped plain-text record is written to a per-run file for later
//! inspection.

use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

pub fn write_crash_record(dir: &Path, error: &dyn Display) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let now = Local::now();
    let path = dir.join(format!("crash-{}.log", now.timestamp()));

    let mut file = fs::File::create(&path)?;
    writeln!(file, "Time: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(file)?;
    writeln!(file, "{error}")?;
    writeln!(file)?;
    writeln!(file, "Stopping scheduler.")?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_contains_timestamp_and_error() {
        let dir = std::env::temp_dir().join(format!("dosewatch-crashlog-{}", std::process::id()));
        let path = write_crash_record(&dir, &"storage backend failure: gone").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Time: "));
        assert!(contents.contains("storage backend failure: gone"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
