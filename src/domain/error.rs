//! Domain error types.

/// A rejected trade. Every variant is recoverable: the ledger is left
/// exactly as it was before the request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("no price available for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error("insufficient balance: need {required:.2}, have {available:.2}")]
    InsufficientBalance { required: f64, available: f64 },

    #[error("no open position for {symbol}")]
    NoOpenPosition { symbol: String },

    #[error("invalid amount {amount}: must be a positive number")]
    InvalidAmount { amount: f64 },
}

/// Top-level error type for simtrader.
#[derive(Debug, thiserror::Error)]
pub enum SimtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("price feed error: {reason}")]
    Feed { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("session is no longer running")]
    SessionClosed,

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SimtraderError> for std::process::ExitCode {
    fn from(err: &SimtraderError) -> Self {
        let code: u8 = match err {
            SimtraderError::Io(_) => 1,
            SimtraderError::ConfigParse { .. }
            | SimtraderError::ConfigMissing { .. }
            | SimtraderError::ConfigInvalid { .. } => 2,
            SimtraderError::Feed { .. } | SimtraderError::Csv(_) => 3,
            SimtraderError::Trade(_) => 4,
            SimtraderError::Report { .. } => 5,
            SimtraderError::SessionClosed => 6,
        };
        std::process::ExitCode::from(code)
    }
}
