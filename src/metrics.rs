//! KPI and trend aggregation over stored evaluations
//!
//! Computes a summary (totals, averages, success rate) plus a per-day trend
//! series from a tenant's records. The caller pre-filters records to the
//! tenant and lookback window; this module performs no filtering itself.
//! Rounding happens only at the presentation boundary, never on
//! intermediate sums.

use crate::types::EvaluationRecord;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Threshold at or above which a score counts as a success
const SUCCESS_SCORE: f64 = 70.0;

/// Lookback window selector for metrics queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl Period {
    /// Number of days covered by the window
    pub fn days(&self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
        }
    }

    /// Window start relative to now
    pub fn cutoff(&self) -> chrono::DateTime<Utc> {
        Utc::now() - Duration::days(self.days())
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Week
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(Period::Week),
            "30d" => Ok(Period::Month),
            other => Err(format!("unknown period '{}', expected 7d or 30d", other)),
        }
    }
}

/// Aggregated statistics for one calendar day within the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetric {
    /// UTC calendar date (YYYY-MM-DD)
    pub date: NaiveDate,

    /// Number of records created on this day
    pub count: i64,

    /// Mean score, one decimal
    pub avg_score: f64,

    /// Mean latency in milliseconds, rounded to the nearest integer
    pub avg_latency: i64,

    /// Number of records with score >= 70
    pub success_count: i64,
}

/// Summary KPIs plus daily trend for a query window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_evals: i64,
    pub avg_score: f64,
    pub avg_latency_ms: i64,
    pub success_rate_pct: f64,
    pub pii_redactions_total: i64,
    pub trend_daily: Vec<DailyMetric>,
}

impl MetricsSummary {
    /// All-zero summary returned for an empty window
    pub fn empty() -> Self {
        Self {
            total_evals: 0,
            avg_score: 0.0,
            avg_latency_ms: 0,
            success_rate_pct: 0.0,
            pii_redactions_total: 0,
            trend_daily: Vec::new(),
        }
    }
}

/// Running sums for one day bucket, rounded only when the bucket is emitted
#[derive(Debug, Default)]
struct DayAccumulator {
    count: i64,
    score_sum: f64,
    latency_sum: f64,
    success_count: i64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Aggregate pre-filtered records into summary KPIs and a daily trend
///
/// The top-level average score considers only records with a defined score;
/// the per-day average treats a missing score as 0 and divides by the day's
/// full record count, matching the dashboard's historical behavior. Success
/// rate is computed over all records. Day buckets exist only for days with
/// at least one record, so no bucket divides by zero.
pub fn aggregate(records: &[EvaluationRecord]) -> MetricsSummary {
    if records.is_empty() {
        return MetricsSummary::empty();
    }

    let total = records.len() as i64;
    let mut score_sum = 0.0;
    let mut scored = 0i64;
    let mut latency_sum = 0.0;
    let mut success_count = 0i64;
    let mut pii_total = 0i64;

    // BTreeMap keeps the trend ordered ascending by date
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for record in records {
        if let Some(score) = record.score {
            score_sum += score;
            scored += 1;
        }
        latency_sum += record.latency_ms;
        let success = record.score.unwrap_or(0.0) >= SUCCESS_SCORE;
        if success {
            success_count += 1;
        }
        pii_total += record.pii_tokens_redacted;

        let day = days
            .entry(record.created_at.date_naive())
            .or_default();
        day.count += 1;
        day.score_sum += record.score.unwrap_or(0.0);
        day.latency_sum += record.latency_ms;
        if success {
            day.success_count += 1;
        }
    }

    let trend_daily = days
        .into_iter()
        .map(|(date, acc)| DailyMetric {
            date,
            count: acc.count,
            avg_score: round1(acc.score_sum / acc.count as f64),
            avg_latency: (acc.latency_sum / acc.count as f64).round() as i64,
            success_count: acc.success_count,
        })
        .collect();

    let avg_score = if scored > 0 {
        round1(score_sum / scored as f64)
    } else {
        0.0
    };

    MetricsSummary {
        total_evals: total,
        avg_score,
        avg_latency_ms: (latency_sum / total as f64).round() as i64,
        success_rate_pct: round1(success_count as f64 * 100.0 / total as f64),
        pii_redactions_total: pii_total,
        trend_daily,
    }
}
