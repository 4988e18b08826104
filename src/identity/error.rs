//! Identity-store error kinds.

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("{0}")]
    Secret(String),
    #[error("{0}")]
    Store(String),
    #[error("invalid username or password")]
    BadCredentials,
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("user {0} already exists")]
    UserExists(String),
    #[error("token error: {0}")]
    Token(String),
}
