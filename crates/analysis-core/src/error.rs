use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("No data found for {symbol}")]
    EmptySeries { symbol: String },

    #[error("Insufficient history: need at least {required} bars, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Invalid risk parameters: {0}")]
    InvalidRiskParameters(String),

    #[error("Degenerate stop distance {stop_distance:.6}: ATR is zero or negative")]
    DegenerateStopDistance { stop_distance: f64 },

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),
}

impl AnalysisError {
    /// Message suitable for showing to the person who asked for the report.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::EmptySeries { symbol } => {
                format!("No data found for {}. Check the ticker symbol.", symbol)
            }
            AnalysisError::InsufficientHistory { required, available } => format!(
                "Symbol exists but has too little history ({} usable bars, {} required).",
                available, required
            ),
            other => other.to_string(),
        }
    }
}
