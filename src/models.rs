use crate::calendar::CalendarDay;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub date: CalendarDay,
    pub value: f64,
}

impl Sample {
    pub fn new(date: CalendarDay, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: i64,
    pub name: String,
    #[serde(rename = "values", default)]
    pub samples: Vec<Sample>,
    pub base_value: f64,
    #[serde(default)]
    pub last_updated: Option<CalendarDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoublingRate {
    pub days_per_doubling: f64,
    pub months_per_doubling: f64,
    pub projected_next_double_date: CalendarDay,
    pub total_growth: f64,
    pub doublings: f64,
    pub elapsed_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Estimate {
    InsufficientData,
    NotYetDoubled,
    Doubling(DoublingRate),
}

impl Estimate {
    pub fn label(&self) -> String {
        match self {
            Self::InsufficientData => "insufficient data".to_string(),
            Self::NotYetDoubled => "not yet doubled".to_string(),
            Self::Doubling(rate) => format!(
                "doubles every {:.1} days ({:.1} months), next ~{}",
                rate.days_per_doubling, rate.months_per_doubling, rate.projected_next_double_date
            ),
        }
    }

    pub fn rate(&self) -> Option<&DoublingRate> {
        match self {
            Self::Doubling(rate) => Some(rate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RateOutcome {
    Estimate(Estimate),
    Error(String),
}

/// One row of the rate board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRateView {
    pub metric_id: i64,
    pub name: String,
    pub last_updated: Option<CalendarDay>,
    pub sample_count: usize,
    #[serde(flatten)]
    pub outcome: RateOutcome,
}

impl MetricRateView {
    pub fn estimate(&self) -> Option<&Estimate> {
        match &self.outcome {
            RateOutcome::Estimate(estimate) => Some(estimate),
            RateOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RateOutcome::Estimate(_) => None,
            RateOutcome::Error(error) => Some(error),
        }
    }

    pub fn label(&self) -> String {
        match &self.outcome {
            RateOutcome::Estimate(estimate) => estimate.label(),
            RateOutcome::Error(error) => error.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    Json,
    Md,
    Txt,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Md => "md",
            Self::Txt => "txt",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetricPayload {
    pub name: String,
    pub base_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendSamplePayload {
    pub metric_id: i64,
    pub value: f64,
    pub date: Option<CalendarDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMetricResponse {
    pub metric_id: i64,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub days_per_month: f64,
    pub seed_default_metrics: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            days_per_month: 30.0,
            seed_default_metrics: true,
        }
    }
}
