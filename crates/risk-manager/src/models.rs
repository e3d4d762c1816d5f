use serde::{Deserialize, Serialize};

/// Stop placement and guard rails for volatility-based sizing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Stop sits this many ATRs below entry
    #[serde(default = "default_stop_atr_multiple")]
    pub stop_atr_multiple: f64,
    /// Floor applied to the entry-to-stop distance
    #[serde(default = "default_min_stop_distance")]
    pub min_stop_distance: f64,
    /// Fail instead of clamping when the stop distance collapses
    #[serde(default)]
    pub strict: bool,
}

fn default_stop_atr_multiple() -> f64 { 2.0 }
fn default_min_stop_distance() -> f64 { 0.01 }

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            stop_atr_multiple: 2.0,
            min_stop_distance: 0.01,
            strict: false,
        }
    }
}
