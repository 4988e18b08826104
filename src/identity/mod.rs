//! Secret & Identity Store.
//!
//! Persists the bearer-token signing secret and the user registry, and
//! exposes login/verification. Generated secrets and passwords are never
//! regenerated on restart — only ever read from disk once present.

mod error;
mod password;
mod secret;
mod token;
mod users;

pub use error::IdentityError;
pub use password::{generate_password, hash_password, verify_password};
pub use secret::Secret;
pub use token::{issue_token, verify_token, Claims};
pub use users::UserStore;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::types::User;

pub struct IdentityStore {
    pub secret: Secret,
    pub users: UserStore,
}

impl IdentityStore {
    pub fn open(data_dir: &Path) -> Result<Self, IdentityError> {
        Ok(Self {
            secret: Secret::load_or_generate(data_dir)?,
            users: UserStore::load_or_bootstrap(data_dir)?,
        })
    }

    /// Verifies credentials and, on success, issues a bearer token.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, User), IdentityError> {
        let user = self
            .users
            .get(username)
            .ok_or(IdentityError::BadCredentials)?;
        if !user.enabled || !verify_password(password, &user.password_hash) {
            return Err(IdentityError::BadCredentials);
        }
        let token = issue_token(username, user.role, &self.secret, now)?;
        Ok((token, user))
    }

    pub fn authenticate(&self, token: &str) -> Result<Claims, IdentityError> {
        let claims = verify_token(token, &self.secret)?;
        match self.users.get(&claims.sub) {
            Some(user) if user.enabled => Ok(claims),
            _ => Err(IdentityError::BadCredentials),
        }
    }
}
