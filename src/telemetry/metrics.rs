use std::collections::HashMap;

/// Running aggregate for one `(component, metric)` pair.
///
/// While `count > 0`, every buffered sample lies in `min..=max`. After a
/// flush the aggregate is back to its identity values.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub count: u32,
    pub last_logged: f64,
}

impl MetricRecord {
    /// A fresh record counts its time window from `now`.
    pub fn new(now: f64) -> Self {
        Self {
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            count: 0,
            last_logged: now,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn should_flush(&self, now: f64, throttle_ms: f64, sample_size: u32) -> bool {
        self.count >= sample_size || (self.count > 0 && now - self.last_logged >= throttle_ms)
    }

    /// Summarises the buffered samples and resets to identity.
    pub fn flush(&mut self, now: f64) -> Option<MetricSummary> {
        if self.count == 0 {
            return None;
        }
        let summary = MetricSummary {
            samples: self.count,
            average: self.sum / self.count as f64,
            min: self.min,
            max: self.max,
        };
        self.sum = 0.0;
        self.count = 0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.last_logged = now;
        Some(summary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub samples: u32,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

/// All metric aggregates of a telemetry context.
#[derive(Debug, Default)]
pub struct MetricBuffers {
    records: HashMap<(String, String), MetricRecord>,
}

impl MetricBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample; returns a summary when the buffer flushed.
    pub fn record(
        &mut self,
        component: &str,
        metric: &str,
        value: f64,
        now: f64,
        throttle_ms: f64,
        sample_size: u32,
    ) -> Option<MetricSummary> {
        let record = self
            .records
            .entry((component.to_string(), metric.to_string()))
            .or_insert_with(|| MetricRecord::new(now));

        record.push(value);

        if record.should_flush(now, throttle_ms, sample_size) {
            record.flush(now)
        } else {
            None
        }
    }

    pub fn get(&self, component: &str, metric: &str) -> Option<&MetricRecord> {
        self.records.get(&(component.to_string(), metric.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
