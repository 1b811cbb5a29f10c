use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Deserialize;

use crate::names::Corrections;

/// Inline JSON config, for CI runs where a file is awkward to provision.
pub const CONFIG_ENV: &str = "TTMIRROR_CONFIG";
/// Config file picked up from the working directory when present.
pub const CONFIG_FILE: &str = "ttmirror.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    /// The source's area identifier for the day listing.
    pub area: String,
    /// Window size for a plain `sync`: today plus this many days minus one.
    pub days_ahead: u32,
    /// Civil-time offset of the source, used to decide what "today" is.
    pub utc_offset_minutes: i32,
    pub db_path: PathBuf,
    pub http_timeout_secs: u64,
    /// Extra correction-table entries layered over the shipped defaults.
    pub corrections: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://time-table.sicsr.ac.in".to_string(),
            area: "1".to_string(),
            days_ahead: 7,
            // The source publishes in IST.
            utc_offset_minutes: 330,
            db_path: PathBuf::from("timetable.sqlite3"),
            http_timeout_secs: 10,
            corrections: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing config JSON")
    }

    /// Precedence: env var, explicit file, `ttmirror.json` in the working
    /// directory, built-in defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Ok(raw) = std::env::var(CONFIG_ENV) {
            return Self::from_json(&raw).with_context(|| format!("from ${CONFIG_ENV}"));
        }
        if let Some(path) = explicit_path {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            return Self::from_json(&raw).with_context(|| format!("from {}", path.display()));
        }
        if Path::new(CONFIG_FILE).exists() {
            let raw = std::fs::read_to_string(CONFIG_FILE)
                .with_context(|| format!("reading {CONFIG_FILE}"))?;
            return Self::from_json(&raw).with_context(|| format!("from {CONFIG_FILE}"));
        }
        Ok(Self::default())
    }

    /// The shipped correction table with config overrides on top, verified
    /// for idempotence. A bad override is a startup error, not a runtime
    /// surprise.
    pub fn corrections(&self) -> Result<Corrections> {
        let mut table = Corrections::default_table();
        for (raw, canonical) in &self.corrections {
            table.insert(raw.clone(), canonical.clone());
        }
        Corrections::new(table)
    }

    /// Today according to the source's wall clock, not the host's.
    pub fn source_today(&self) -> Result<NaiveDate> {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .context("utc_offset_minutes out of range")?;
        Ok(Utc::now().with_timezone(&offset).date_naive())
    }
}
