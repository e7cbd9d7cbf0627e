//! Domain error types.

/// A parse error with position information for rule conditions.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for tradekit.
#[derive(Debug, thiserror::Error)]
pub enum TradekitError {
    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("insufficient data for {symbol}: have {candles} candles, need {minimum}")]
    InsufficientData {
        symbol: String,
        candles: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradekitError> for std::process::ExitCode {
    fn from(err: &TradekitError) -> Self {
        let code: u8 = match err {
            TradekitError::Io(_) => 1,
            TradekitError::ConfigParse { .. }
            | TradekitError::ConfigMissing { .. }
            | TradekitError::ConfigInvalid { .. } => 2,
            TradekitError::Data { .. } => 3,
            TradekitError::RuleParse(_) | TradekitError::RuleInvalid { .. } => 4,
            TradekitError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
