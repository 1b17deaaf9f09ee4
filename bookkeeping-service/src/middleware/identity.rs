//! Caller identity extraction.
//!
//! Identity arrives in the `x-forwarded-user` header, set by the reverse
//! proxy in front of this service after it has authenticated the user. The
//! header is trusted as-is; the service must not be reachable without the
//! proxy.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use service_core::identity::{AdminList, AuthenticatedIdentity, FORWARDED_USER_HEADER};
use std::sync::Arc;

/// Extractor producing the caller's [`AuthenticatedIdentity`].
///
/// Requires an `Extension(Arc<AdminList>)` layer on the router so the admin
/// flag can be resolved.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub AuthenticatedIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(FORWARDED_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing {} header (required from the proxy)",
                    FORWARDED_USER_HEADER
                ))
            })?;

        let admin_list = parts
            .extensions
            .get::<Arc<AdminList>>()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("Admin list extension not installed"))
            })?;

        Ok(Self(admin_list.identify(username)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<CallerIdentity, AppError> {
        let (mut parts, _) = req.into_parts();
        CallerIdentity::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn resolves_admin_flag_from_list() {
        let req = Request::builder()
            .header(FORWARDED_USER_HEADER, "alice")
            .extension(Arc::new(AdminList::from_csv("alice,bob")))
            .body(())
            .unwrap();

        let CallerIdentity(identity) = extract(req).await.unwrap();
        assert_eq!(identity.username, "alice");
        assert!(identity.is_admin);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let req = Request::builder()
            .extension(Arc::new(AdminList::from_csv("")))
            .body(())
            .unwrap();

        let err = extract(req).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
