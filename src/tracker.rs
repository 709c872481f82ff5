use crate::calendar::CalendarDay;
use crate::errors::{AppError, AppResult};
use crate::estimator::estimate_with;
use crate::models::{
    AppSettings, AppendSamplePayload, CreateMetricPayload, DeleteMetricResponse, ExportFormat, ExportResponse,
    Metric, MetricRateView, RateOutcome,
};
use crate::persistence::{load_metrics, save_metrics, KeyValueStore};
use crate::store::MetricStore;
use serde::Serialize;
use std::path::Path;

/// Owns the metric store and keeps the rate board in step with it.
///
/// Every successful mutation writes the full state to the key/value store and recomputes all
/// estimates from scratch.
pub struct TrackerCore {
    store: MetricStore,
    kv: Box<dyn KeyValueStore>,
    settings: AppSettings,
    rates: Vec<MetricRateView>,
}

impl TrackerCore {
    pub fn load(kv: Box<dyn KeyValueStore>, settings: AppSettings) -> Self {
        let store = MetricStore::from_metrics(load_metrics(kv.as_ref(), settings.seed_default_metrics));
        tracing::info!(metrics = store.len(), "tracker loaded");

        let mut this = Self {
            store,
            kv,
            settings,
            rates: Vec::new(),
        };
        this.refresh_rates();
        this
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn create_metric(&mut self, payload: CreateMetricPayload) -> AppResult<Metric> {
        let metric = self.store.create_metric(&payload.name, payload.base_value)?;
        tracing::info!(metric_id = metric.id, name = %metric.name, "metric created");
        self.after_mutation();
        Ok(metric)
    }

    pub fn delete_metric(&mut self, metric_id: i64) -> DeleteMetricResponse {
        let deleted = self.store.delete_metric(metric_id);
        if deleted {
            tracing::info!(metric_id, "metric deleted");
        } else {
            tracing::debug!(metric_id, "delete ignored for unknown metric");
        }
        self.after_mutation();
        DeleteMetricResponse { metric_id, deleted }
    }

    pub fn append_sample(&mut self, payload: AppendSamplePayload) -> AppResult<Metric> {
        let date = payload.date.unwrap_or_else(CalendarDay::today);
        let metric = self.store.append_sample(payload.metric_id, payload.value, date)?;
        tracing::info!(
            metric_id = metric.id,
            value = payload.value,
            date = %date,
            samples = metric.samples.len(),
            "sample appended"
        );
        self.after_mutation();
        Ok(metric)
    }

    pub fn list_metrics(&self) -> &[Metric] {
        self.store.list_metrics()
    }

    pub fn get_metric(&self, metric_id: i64) -> AppResult<&Metric> {
        self.store
            .get_metric(metric_id)
            .ok_or_else(|| AppError::NotFound(format!("Metric {} not found", metric_id)))
    }

    pub fn rate_board(&self) -> &[MetricRateView] {
        &self.rates
    }

    pub fn rate_for(&self, metric_id: i64) -> AppResult<&MetricRateView> {
        self.rates
            .iter()
            .find(|view| view.metric_id == metric_id)
            .ok_or_else(|| AppError::NotFound(format!("Metric {} not found", metric_id)))
    }

    pub fn refresh_rates(&mut self) {
        let days_per_month = self.settings.days_per_month;
        self.rates = self
            .store
            .list_metrics()
            .iter()
            .map(|metric| rate_view(metric, days_per_month))
            .collect();
    }

    pub fn export(&self, app_data_dir: &Path, format: ExportFormat) -> AppResult<ExportResponse> {
        let export_dir = app_data_dir.join("exports");
        std::fs::create_dir_all(&export_dir).map_err(|error| AppError::Io(error.to_string()))?;
        let output_path = export_dir.join(format!("metrics.{}", format.as_str()));

        let contents = match format {
            ExportFormat::Json => serde_json::to_string_pretty(&ExportDocument {
                metrics: self.list_metrics(),
                rates: self.rate_board(),
            })?,
            ExportFormat::Md => render_markdown_export(self.list_metrics(), self.rate_board()),
            ExportFormat::Txt => render_text_export(self.list_metrics(), self.rate_board()),
        };

        std::fs::write(&output_path, contents).map_err(|error| AppError::Io(error.to_string()))?;
        tracing::info!(path = %output_path.display(), format = format.as_str(), "metrics exported");
        Ok(ExportResponse {
            path: output_path.to_string_lossy().to_string(),
        })
    }

    fn after_mutation(&mut self) {
        save_metrics(self.kv.as_ref(), self.store.list_metrics());
        self.refresh_rates();
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    metrics: &'a [Metric],
    rates: &'a [MetricRateView],
}

fn rate_view(metric: &Metric, days_per_month: f64) -> MetricRateView {
    let outcome = match estimate_with(&metric.samples, days_per_month) {
        Ok(estimate) => RateOutcome::Estimate(estimate),
        Err(error) => {
            tracing::debug!(metric_id = metric.id, error = %error, "doubling rate unavailable");
            RateOutcome::Error(error.to_string())
        }
    };
    MetricRateView {
        metric_id: metric.id,
        name: metric.name.clone(),
        last_updated: metric.last_updated,
        sample_count: metric.samples.len(),
        outcome,
    }
}

fn render_markdown_export(metrics: &[Metric], rates: &[MetricRateView]) -> String {
    let mut out = String::from("# Metrics\n");
    for metric in metrics {
        out.push_str(&format!("\n## {} (#{})\n\n", metric.name, metric.id));
        out.push_str(&format!("- Base value: {}\n", metric.base_value));
        if let Some(last_updated) = metric.last_updated {
            out.push_str(&format!("- Last updated: {}\n", last_updated));
        }
        if let Some(view) = rates.iter().find(|view| view.metric_id == metric.id) {
            out.push_str(&format!("- Doubling rate: {}\n", view.label()));
        }
        if !metric.samples.is_empty() {
            out.push_str("\n| Date | Value |\n| --- | --- |\n");
            for sample in &metric.samples {
                out.push_str(&format!("| {} | {} |\n", sample.date, sample.value));
            }
        }
    }
    out
}

fn render_text_export(metrics: &[Metric], rates: &[MetricRateView]) -> String {
    let mut out = String::new();
    for metric in metrics {
        let label = rates
            .iter()
            .find(|view| view.metric_id == metric.id)
            .map(MetricRateView::label)
            .unwrap_or_default();
        out.push_str(&format!("{}\t{}\t{}\n", metric.id, metric.name, label));
        for sample in &metric.samples {
            out.push_str(&format!("\t{}\t{}\n", sample.date, sample.value));
        }
    }
    out
}
