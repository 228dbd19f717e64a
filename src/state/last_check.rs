use chrono::Utc;
use parking_lot::Mutex;

use crate::domain::{Label, LastCheck};

/// Summary of the most recent check for the popup. Lives only as long as the
/// host process.
#[derive(Debug, Default)]
pub struct LastCheckCell {
    slot: Mutex<Option<LastCheck>>,
}

impl LastCheckCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, url: &str, result: Label, confidence: f64) {
        *self.slot.lock() = Some(LastCheck {
            url: url.to_string(),
            result,
            confidence,
            timestamp: Utc::now(),
        });
    }

    pub fn get(&self) -> Option<LastCheck> {
        self.slot.lock().clone()
    }
}
