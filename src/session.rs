use crate::errors::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

pub const USER_HEADER: &str = "x-user-id";

/// Identity of the caller, set by the auth gateway in front of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::unauthorized("no user is currently signed in"))?;

        Ok(Self {
            user_id: user_id.to_string(),
        })
    }
}
