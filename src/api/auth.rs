//! Bearer-token authentication extractor, matching the teacher's
//! `FromRequestParts`-based key extractor in `hub/auth/api_key.rs`, but
//! backed by signed JWTs instead of a database-checked API key, and with
//! an additional query-param fallback for the push stream (browser
//! `EventSource` clients cannot set headers).

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use crate::context::AppContext;
use crate::identity::Claims;
use crate::types::Role;

use super::error::AppError;

#[derive(serde::Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn username(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn require_role(&self, minimum: Role) -> Result<(), AppError> {
        if self.role().at_least(minimum) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

fn bearer_from_header(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppContext>) -> Result<Self, Self::Rejection> {
        let token = match bearer_from_header(parts) {
            Some(token) => Some(token),
            None => Query::<TokenQuery>::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|q| q.0.token),
        }
        .ok_or(AppError::Unauthorized)?;

        let claims = state.identity.authenticate(&token).map_err(|_| AppError::Unauthorized)?;
        Ok(AuthUser { claims })
    }
}
