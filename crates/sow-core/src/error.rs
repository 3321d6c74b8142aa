use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalendarError {
    #[error("invalid instant: {0}")]
    InvalidInstant(String),

    #[error("{date} falls before the calendar epoch (2025-03-20)")]
    BeforeEpoch { date: NaiveDate },

    #[error("invalid setting {key}={value}")]
    InvalidSetting { key: String, value: String },

    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: f64 },
}

impl CalendarError {
    /// True for failures caused by the caller's input. `OutOfRange` only
    /// arises when the engine feeds itself inconsistent values.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInstant(_) | Self::BeforeEpoch { .. })
    }
}

pub type CalendarResult<T> = Result<T, CalendarError>;
