use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use dosewatch_core::prefs::{keys, Preferences};

use crate::state::ensure_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefsFile {
    pub times: TimesSection,
    pub supply: SupplySection,
}

/// Dose-time boundaries as "HH:MM" strings; malformed values fall back to
/// engine defaults at load time rather than failing here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimesSection {
    pub morning_begin: String,
    pub morning_end: String,
    pub noon_begin: String,
    pub noon_end: String,
    pub evening_begin: String,
    pub evening_end: String,
    pub night_begin: String,
    pub night_end: String,
    pub snooze: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplySection {
    pub min_days: u32,
}

impl Default for PrefsFile {
    fn default() -> Self {
        Self {
            times: TimesSection {
                morning_begin: "06:00".to_string(),
                morning_end: "11:00".to_string(),
                noon_begin: "11:00".to_string(),
                noon_end: "15:00".to_string(),
                evening_begin: "15:00".to_string(),
                evening_end: "20:00".to_string(),
                night_begin: "20:00".to_string(),
                night_end: "24:00".to_string(),
                snooze: "00:30".to_string(),
            },
            supply: SupplySection { min_days: 7 },
        }
    }
}

impl Preferences for PrefsFile {
    fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            keys::MORNING_BEGIN => &self.times.morning_begin,
            keys::MORNING_END => &self.times.morning_end,
            keys::NOON_BEGIN => &self.times.noon_begin,
            keys::NOON_END => &self.times.noon_end,
            keys::EVENING_BEGIN => &self.times.evening_begin,
            keys::EVENING_END => &self.times.evening_end,
            keys::NIGHT_BEGIN => &self.times.night_begin,
            keys::NIGHT_END => &self.times.night_end,
            keys::SNOOZE => &self.times.snooze,
            keys::MIN_SUPPLY_DAYS => return Some(self.supply.min_days.to_string()),
            _ => return None,
        };
        Some(value.clone())
    }
}

pub fn prefs_path() -> Result<PathBuf> {
    Ok(ensure_home()?.join("prefs.toml"))
}

pub fn load_prefs() -> Result<PrefsFile> {
    let path = prefs_path()?;
    if !path.exists() {
        return Ok(PrefsFile::default());
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&raw).context("parse prefs.toml")
}

pub fn save_prefs(prefs: &PrefsFile) -> Result<()> {
    let path = prefs_path()?;
    let raw = toml::to_string_pretty(prefs).context("serialize prefs")?;
    fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
