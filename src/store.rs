use crate::calendar::CalendarDay;
use crate::errors::{AppError, AppResult};
use crate::models::{Metric, Sample};

/// Ordered collection of tracked metrics.
///
/// Invariants held after every operation:
/// - ids are unique and each new id is one past the largest existing id
/// - every sample list is sorted by date, same-day samples in insertion order
/// - `last_updated` is the date of the last appended sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricStore {
    metrics: Vec<Metric>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from persisted records, restoring the sample ordering.
    pub fn from_metrics(mut metrics: Vec<Metric>) -> Self {
        for metric in &mut metrics {
            sort_samples(&mut metric.samples);
        }
        Self { metrics }
    }

    pub fn create_metric(&mut self, name: &str, base_value: f64) -> AppResult<Metric> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Metric name must not be empty".to_string()));
        }
        if !base_value.is_finite() {
            return Err(AppError::InvalidInput(format!(
                "Base value for {} must be a finite number",
                name
            )));
        }

        let metric = Metric {
            id: self.next_id(),
            name: name.to_string(),
            samples: Vec::new(),
            base_value,
            last_updated: None,
        };
        self.metrics.push(metric.clone());
        Ok(metric)
    }

    /// Returns whether a metric was removed. Unknown ids are ignored.
    pub fn delete_metric(&mut self, id: i64) -> bool {
        let before = self.metrics.len();
        self.metrics.retain(|metric| metric.id != id);
        self.metrics.len() != before
    }

    pub fn append_sample(&mut self, metric_id: i64, value: f64, date: CalendarDay) -> AppResult<Metric> {
        if !value.is_finite() {
            return Err(AppError::InvalidInput("Sample value must be a finite number".to_string()));
        }
        let Some(metric) = self.metrics.iter_mut().find(|metric| metric.id == metric_id) else {
            return Err(AppError::NotFound(format!("Metric {} not found", metric_id)));
        };

        metric.samples.push(Sample::new(date, value));
        sort_samples(&mut metric.samples);
        metric.last_updated = Some(date);
        Ok(metric.clone())
    }

    pub fn get_metric(&self, id: i64) -> Option<&Metric> {
        self.metrics.iter().find(|metric| metric.id == id)
    }

    pub fn list_metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    fn next_id(&self) -> i64 {
        self.metrics.iter().map(|metric| metric.id).max().unwrap_or(0) + 1
    }
}

// `sort_by_key` is stable, so same-day samples keep their append order.
fn sort_samples(samples: &mut [Sample]) {
    samples.sort_by_key(|sample| sample.date);
}

/// Starter metrics used when nothing has been persisted yet.
pub fn default_metrics() -> Vec<Metric> {
    [("Revenue", 1_000.0), ("Active users", 100.0), ("Newsletter subscribers", 50.0)]
        .into_iter()
        .zip(1..)
        .map(|((name, base_value), id)| Metric {
            id,
            name: name.to_string(),
            samples: Vec::new(),
            base_value,
            last_updated: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{default_metrics, MetricStore};
    use crate::calendar::CalendarDay;
    use crate::errors::AppError;
    use crate::models::Metric;

    fn day(raw: &str) -> CalendarDay {
        CalendarDay::parse(raw).expect("valid day")
    }

    #[test]
    fn ids_increase_past_the_current_maximum() {
        let mut store = MetricStore::new();
        let first = store.create_metric("Revenue", 10.0).expect("create");
        let second = store.create_metric("Users", 5.0).expect("create");
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        assert!(store.delete_metric(2));
        let third = store.create_metric("Leads", 1.0).expect("create");
        assert_eq!(third.id, 2);

        let mut gapped = MetricStore::from_metrics(default_metrics());
        gapped.delete_metric(1);
        let created = gapped.create_metric("Churn", 3.0).expect("create");
        assert!(gapped.list_metrics().iter().all(|metric| metric.id <= created.id));
        assert_eq!(created.id, 4);
    }

    #[test]
    fn blank_names_are_rejected_without_mutation() {
        let mut store = MetricStore::new();
        for name in ["", "   ", "\t\n"] {
            let error = store.create_metric(name, 1.0).expect_err("blank name");
            assert!(matches!(error, AppError::InvalidInput(_)));
        }
        assert!(store.create_metric("Revenue", f64::INFINITY).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn new_metric_starts_empty_and_trimmed() {
        let mut store = MetricStore::new();
        let metric = store.create_metric("  Revenue  ", 250.0).expect("create");
        assert_eq!(metric.name, "Revenue");
        assert_eq!(metric.base_value, 250.0);
        assert!(metric.samples.is_empty());
        assert!(metric.last_updated.is_none());
    }

    #[test]
    fn samples_stay_sorted_and_last_updated_tracks_appends() {
        let mut store = MetricStore::new();
        let id = store.create_metric("Revenue", 100.0).expect("create").id;

        let appends = [
            ("2024-03-01", 300.0, vec!["2024-03-01"]),
            ("2024-01-01", 100.0, vec!["2024-01-01", "2024-03-01"]),
            ("2024-02-01", 200.0, vec!["2024-01-01", "2024-02-01", "2024-03-01"]),
            ("2024-04-01", 400.0, vec!["2024-01-01", "2024-02-01", "2024-03-01", "2024-04-01"]),
            ("2023-12-31", 50.0, vec!["2023-12-31", "2024-01-01", "2024-02-01", "2024-03-01", "2024-04-01"]),
        ];
        for (date, value, expected) in appends {
            let metric = store.append_sample(id, value, day(date)).expect("append");
            let dates: Vec<String> = metric.samples.iter().map(|sample| sample.date.to_string()).collect();
            assert_eq!(dates, expected, "after appending {date}");
            // Backfilled samples still move lastUpdated to the appended date.
            assert_eq!(metric.last_updated, Some(day(date)), "after appending {date}");
            assert_eq!(store.get_metric(id), Some(&metric));
        }
    }

    #[test]
    fn same_day_samples_keep_insertion_order() {
        let mut store = MetricStore::new();
        let id = store.create_metric("Revenue", 100.0).expect("create").id;
        store.append_sample(id, 1.0, day("2024-01-02")).expect("append");
        store.append_sample(id, 2.0, day("2024-01-01")).expect("append");
        store.append_sample(id, 3.0, day("2024-01-02")).expect("append");
        let metric = store.append_sample(id, 4.0, day("2024-01-01")).expect("append");

        let values: Vec<f64> = metric.samples.iter().map(|sample| sample.value).collect();
        assert_eq!(values, vec![2.0, 4.0, 1.0, 3.0]);
    }

    #[test]
    fn append_to_unknown_metric_is_not_found() {
        let mut store = MetricStore::new();
        let error = store.append_sample(42, 1.0, day("2024-01-01")).expect_err("unknown metric");
        assert!(matches!(error, AppError::NotFound(_)));
        let id = store.create_metric("Revenue", 1.0).expect("create").id;
        assert!(matches!(
            store.append_sample(id, f64::NAN, day("2024-01-01")),
            Err(AppError::InvalidInput(_))
        ));
        assert!(store.get_metric(id).expect("metric").samples.is_empty());
    }

    #[test]
    fn metric_zero_is_addressable() {
        let store_metrics = vec![Metric {
            id: 0,
            name: "Zero".to_string(),
            samples: Vec::new(),
            base_value: 1.0,
            last_updated: None,
        }];
        let mut store = MetricStore::from_metrics(store_metrics);
        let metric = store.append_sample(0, 2.0, day("2024-01-01")).expect("append");
        assert_eq!(metric.samples.len(), 1);
        assert_eq!(store.create_metric("Next", 1.0).expect("create").id, 1);
    }

    #[test]
    fn deleting_unknown_id_leaves_store_unchanged() {
        let mut store = MetricStore::from_metrics(default_metrics());
        let before = store.clone();
        assert!(!store.delete_metric(99));
        assert_eq!(store, before);
    }

    #[test]
    fn deletion_preserves_order_of_remaining_metrics() {
        let mut store = MetricStore::from_metrics(default_metrics());
        store.delete_metric(2);
        let names: Vec<&str> = store.list_metrics().iter().map(|metric| metric.name.as_str()).collect();
        assert_eq!(names, vec!["Revenue", "Newsletter subscribers"]);
        assert_eq!(store.list_metrics(), store.list_metrics());
    }

    #[test]
    fn from_metrics_restores_sample_order() {
        let mut metric = default_metrics().remove(0);
        metric.samples = vec![
            crate::models::Sample::new(day("2024-02-01"), 2.0),
            crate::models::Sample::new(day("2024-01-01"), 1.0),
        ];
        let store = MetricStore::from_metrics(vec![metric]);
        let dates: Vec<String> = store.list_metrics()[0]
            .samples
            .iter()
            .map(|sample| sample.date.to_string())
            .collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-02-01"]);
    }
}
