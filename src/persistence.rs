use crate::errors::{AppError, AppResult};
use crate::models::Metric;
use crate::store::default_metrics;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const STORAGE_KEY: &str = "doubling-tracker.metrics";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Internal("kv mutex poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| AppError::Internal("kv mutex poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads the persisted metric list. Never fails: unreadable or malformed state falls back to the
/// starter set (or nothing when seeding is off).
pub fn load_metrics(kv: &dyn KeyValueStore, seed_defaults: bool) -> Vec<Metric> {
    let fallback = || if seed_defaults { default_metrics() } else { Vec::new() };

    let raw = match kv.get(STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::info!(key = STORAGE_KEY, seed_defaults, "no persisted metrics, starting fresh");
            return fallback();
        }
        Err(error) => {
            tracing::warn!(key = STORAGE_KEY, error = %error, "failed to read persisted metrics");
            return fallback();
        }
    };

    match serde_json::from_str::<Vec<Metric>>(&raw) {
        Ok(metrics) => {
            tracing::debug!(count = metrics.len(), "loaded persisted metrics");
            metrics
        }
        Err(error) => {
            tracing::warn!(key = STORAGE_KEY, error = %error, "persisted metrics are malformed, using defaults");
            fallback()
        }
    }
}

/// Writes the full metric list. Failures are logged and dropped.
pub fn save_metrics(kv: &dyn KeyValueStore, metrics: &[Metric]) {
    if let Err(error) = try_save_metrics(kv, metrics) {
        tracing::warn!(key = STORAGE_KEY, error = %error, "failed to persist metrics");
    }
}

fn try_save_metrics(kv: &dyn KeyValueStore, metrics: &[Metric]) -> AppResult<()> {
    let raw = serde_json::to_string(metrics)?;
    kv.set(STORAGE_KEY, &raw)
}

#[cfg(test)]
mod tests {
    use super::{load_metrics, save_metrics, KeyValueStore, MemoryKvStore, STORAGE_KEY};
    use crate::calendar::CalendarDay;
    use crate::errors::{AppError, AppResult};
    use crate::store::{default_metrics, MetricStore};

    struct BrokenKvStore;

    impl KeyValueStore for BrokenKvStore {
        fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::Persistence("disk unavailable".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(AppError::Persistence("disk unavailable".to_string()))
        }
    }

    #[test]
    fn missing_state_seeds_defaults_when_enabled() {
        let kv = MemoryKvStore::new();
        assert_eq!(load_metrics(&kv, true), default_metrics());
        assert!(load_metrics(&kv, false).is_empty());
    }

    #[test]
    fn malformed_state_falls_back_to_defaults() {
        let kv = MemoryKvStore::new();
        kv.set(STORAGE_KEY, "{not json").expect("set");
        assert_eq!(load_metrics(&kv, true), default_metrics());

        kv.set(STORAGE_KEY, r#"[{"id":1,"name":"x","baseValue":1,"values":[{"date":"01/02/2024","value":1}]}]"#)
            .expect("set");
        assert_eq!(load_metrics(&kv, true), default_metrics());
    }

    #[test]
    fn round_trip_reproduces_metrics_and_samples() {
        let mut store = MetricStore::from_metrics(default_metrics());
        let day = |raw: &str| CalendarDay::parse(raw).expect("day");
        store.append_sample(1, 1_500.0, day("2024-02-01")).expect("append");
        store.append_sample(1, 1_200.0, day("2024-01-01")).expect("append");
        store.append_sample(3, 51.5, day("2024-01-03")).expect("append");
        store.delete_metric(2);

        let kv = MemoryKvStore::new();
        save_metrics(&kv, store.list_metrics());
        let restored = MetricStore::from_metrics(load_metrics(&kv, true));
        assert_eq!(restored, store);
    }

    #[test]
    fn round_trip_preserves_exact_float_bits() {
        let day = |raw: &str| CalendarDay::parse(raw).expect("day");
        let mut store = MetricStore::new();
        let id = store.create_metric("Volume", 0.1 + 0.2).expect("create").id;
        let awkward = [
            1804556375599.5054,
            1799511083037.5837,
            114967114420.98183,
            0.1 + 0.2,
            f64::MIN_POSITIVE,
            1.0 / 3.0,
        ];
        for (offset, value) in awkward.iter().enumerate() {
            let date = day("2024-01-01").add_days(offset as i64).expect("shift");
            store.append_sample(id, *value, date).expect("append");
        }
        // Deterministic spread of full-precision values across many magnitudes.
        let mut state = 0x9E37_79B9_7F4A_7C15_u64;
        for _ in 0..2_000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let mantissa = (state >> 11) as f64 / (1u64 << 53) as f64;
            let value = mantissa * 10f64.powi((state % 30) as i32 - 10);
            store.append_sample(id, value, day("2024-06-01")).expect("append");
        }

        let kv = MemoryKvStore::new();
        save_metrics(&kv, store.list_metrics());
        let restored = MetricStore::from_metrics(load_metrics(&kv, false));
        assert_eq!(restored, store);

        let restored_bits: Vec<u64> = restored.list_metrics()[0]
            .samples
            .iter()
            .map(|sample| sample.value.to_bits())
            .collect();
        let original_bits: Vec<u64> = store.list_metrics()[0]
            .samples
            .iter()
            .map(|sample| sample.value.to_bits())
            .collect();
        assert_eq!(restored_bits, original_bits);
        assert_eq!(
            restored.list_metrics()[0].base_value.to_bits(),
            (0.1_f64 + 0.2).to_bits()
        );
    }

    #[test]
    fn storage_failures_are_absorbed() {
        let kv = BrokenKvStore;
        assert_eq!(load_metrics(&kv, true), default_metrics());
        save_metrics(&kv, &default_metrics());
    }
}
