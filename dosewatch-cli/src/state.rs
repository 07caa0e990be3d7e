use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use dosewatch_core::{Drug, Intake};

pub fn dosewatch_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".dosewatch"))
}

pub fn ensure_home() -> Result<PathBuf> {
    let dir = dosewatch_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn data_path() -> Result<PathBuf> {
    Ok(ensure_home()?.join("drugs.json"))
}

pub fn crash_dir() -> Result<PathBuf> {
    Ok(ensure_home()?.join("crash"))
}

/// Everything the engine reads, as one JSON snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataFile {
    pub drugs: Vec<Drug>,
    pub intakes: Vec<Intake>,
}

pub fn read_data() -> Result<DataFile> {
    let path = data_path()?;
    if !path.exists() {
        return Ok(DataFile::default());
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

pub fn write_data(data: &DataFile) -> Result<()> {
    let path = data_path()?;
    let json = serde_json::to_string_pretty(data)?;
    fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
