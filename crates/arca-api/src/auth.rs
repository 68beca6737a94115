//! Caller identity extraction.
//!
//! Authentication itself happens upstream (gateway or reverse proxy); this
//! layer trusts the identity headers it is handed. The token format is not
//! this service's concern.

use crate::error::HttpAppError;
use arca_core::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ADMIN_HEADER: &str = "x-user-admin";

/// The authenticated caller for the current request.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "missing or invalid caller identity".to_string(),
                ))
            })?;

        let is_admin = parts
            .headers
            .get(USER_ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(UserContext { user_id, is_admin })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<UserContext, HttpAppError> {
        let (mut parts, _) = request.into_parts();
        UserContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_identity_headers() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ADMIN_HEADER, "true")
            .body(())
            .unwrap();

        let ctx = extract(request).await.unwrap();
        assert_eq!(ctx.user_id, id);
        assert!(ctx.is_admin);
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        let err = extract(request).await.unwrap_err();
        assert!(matches!(err.0, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_admin_defaults_to_false() {
        let request = Request::builder()
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .unwrap();

        let ctx = extract(request).await.unwrap();
        assert!(!ctx.is_admin);
    }
}
