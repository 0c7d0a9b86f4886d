use thiserror::Error;

/// Why a board operation was refused.
///
/// The first four variants are caller-facing and carry the message shown to
/// the member; `Store` wraps backend failures, which are logged and hidden.
#[derive(Error, Debug)]
pub enum GuildError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl GuildError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

pub type GuildResult<T> = Result<T, GuildError>;
