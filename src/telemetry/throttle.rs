use std::collections::HashMap;

/// Last emission time per `(component, event)`.
///
/// Entries live for the whole session; nothing is evicted.
#[derive(Debug, Default)]
pub struct LogThrottle {
    last_emitted: HashMap<(String, String), f64>,
}

impl LogThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and stamps `now` when the key may emit.
    /// A suppressed call leaves the previous stamp untouched.
    pub fn should_log(&mut self, component: &str, event: &str, now: f64, throttle_ms: f64) -> bool {
        let key = (component.to_string(), event.to_string());
        if let Some(last) = self.last_emitted.get(&key) {
            if now - last < throttle_ms {
                return false;
            }
        }
        self.last_emitted.insert(key, now);
        true
    }

    pub fn last_emitted(&self, component: &str, event: &str) -> Option<f64> {
        self.last_emitted
            .get(&(component.to_string(), event.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.last_emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_emitted.is_empty()
    }
}
