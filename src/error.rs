pub type LimnerResult<T> = Result<T, LimnerError>;

#[derive(thiserror::Error, Debug)]
pub enum LimnerError {
    #[error("format error: {0}")]
    Format(String),

    #[error("dimension mismatch: {0}")]
    Dimension(String),

    #[error("state error: {0}")]
    State(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LimnerError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn dimension(msg: impl Into<String>) -> Self {
        Self::Dimension(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
