//! Consumption log: one JSON line per feeding, aggregated per calendar day.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::feed::FeedingOutcome;
use crate::util::round1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    /// Local time of the feeding, offset included.
    pub timestamp: DateTime<FixedOffset>,
    pub target_g: f64,
    pub fed_g: f64,
    pub success: bool,
}

impl FeedRecord {
    pub fn now(target_g: f64, outcome: &FeedingOutcome) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            target_g,
            fed_g: outcome.fed_g,
            success: outcome.success,
        }
    }

    /// Calendar day in the record's own offset.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_g: f64,
    pub feedings: usize,
    pub avg_g: f64,
    pub min_g: f64,
    pub max_g: f64,
}

/// Per-day totals of successful feedings, oldest first.
pub fn summarize(records: &[FeedRecord]) -> Vec<DailySummary> {
    let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.success) {
        days.entry(r.date()).or_default().push(r.fed_g);
    }
    days.into_iter()
        .map(|(date, amounts)| {
            let total: f64 = amounts.iter().sum();
            let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
            let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            DailySummary {
                date,
                total_g: round1(total),
                feedings: amounts.len(),
                avg_g: round1(total / amounts.len() as f64),
                min_g: round1(min),
                max_g: round1(max),
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ConsumptionLog {
    path: PathBuf,
    retention_days: u32,
}

impl ConsumptionLog {
    pub fn new(path: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            path: path.into(),
            retention_days: retention_days.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, rec: &FeedRecord) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).wrap_err_with(|| format!("create {}", dir.display()))?;
        }
        let mut line = serde_json::to_string(rec).wrap_err("serialize feed record")?;
        line.push('\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .wrap_err_with(|| format!("open {}", self.path.display()))?;
        f.write_all(line.as_bytes())
            .wrap_err_with(|| format!("append to {}", self.path.display()))?;
        tracing::debug!(fed_g = rec.fed_g, success = rec.success, "feeding recorded");
        Ok(())
    }

    pub fn record_outcome(&self, target_g: f64, outcome: &FeedingOutcome) -> Result<()> {
        self.append(&FeedRecord::now(target_g, outcome))
    }

    /// All parseable records; a missing file is an empty log.
    pub fn records(&self) -> Result<Vec<FeedRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("read {}", self.path.display()));
            }
        };
        let mut out = Vec::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FeedRecord>(line) {
                Ok(r) => out.push(r),
                Err(e) => tracing::warn!(line = n + 1, error = %e, "skipping bad history line"),
            }
        }
        Ok(out)
    }

    /// Summaries for the last `days` days with feedings within retention,
    /// newest last.
    pub fn daily(&self, days: usize) -> Result<Vec<DailySummary>> {
        self.daily_as_of(Local::now().date_naive(), days)
    }

    pub fn daily_as_of(&self, today: NaiveDate, days: usize) -> Result<Vec<DailySummary>> {
        let cutoff = self.cutoff(today);
        let records: Vec<FeedRecord> = self
            .records()?
            .into_iter()
            .filter(|r| r.date() >= cutoff)
            .collect();
        let mut summary = summarize(&records);
        let skip = summary.len().saturating_sub(days);
        Ok(summary.split_off(skip))
    }

    fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today - chrono::Days::new(u64::from(self.retention_days))
    }

    /// Rewrite the log without records older than the retention window.
    /// Returns the number of records dropped.
    pub fn compact(&self, today: NaiveDate) -> Result<usize> {
        let records = self.records()?;
        let cutoff = self.cutoff(today);
        let (keep, dropped): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.date() >= cutoff);
        if dropped.is_empty() {
            return Ok(0);
        }
        let mut buf = String::new();
        for r in &keep {
            buf.push_str(&serde_json::to_string(r).wrap_err("serialize feed record")?);
            buf.push('\n');
        }
        feeder_config::write_atomic(&self.path, buf.as_bytes())
            .wrap_err_with(|| format!("rewrite {}", self.path.display()))?;
        tracing::info!(dropped = dropped.len(), kept = keep.len(), "history compacted");
        Ok(dropped.len())
    }
}
