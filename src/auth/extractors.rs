//! Axum extractors for authenticated handlers.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::credentials::{CallContext, Credentials};
use crate::api::ApiError;

/// Extractor for endpoints that require credentials.
/// Rejects with `Unauthenticated` when the session middleware attached none.
pub struct Auth(pub Credentials);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts.extensions.get::<CallContext>().ok_or_else(|| {
            tracing::debug!("No call context on request");
            ApiError::unauthenticated("no metadata credentials found")
        })?;
        context.read().map(Auth)
    }
}

/// Optional authentication extractor - never fails.
/// Useful for endpoints that work both authenticated and anonymously.
pub struct MaybeAuth(pub Option<Credentials>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credentials = parts
            .extensions
            .get::<CallContext>()
            .and_then(|context| context.read().ok());
        Ok(MaybeAuth(credentials))
    }
}

/// Hands the whole [`CallContext`] to handlers that forward it to backends.
/// Anonymous requests get an empty context.
pub struct Context(pub CallContext);

impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Context(
            parts
                .extensions
                .get::<CallContext>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Code;
    use axum::http::Request;

    fn parts(context: Option<CallContext>) -> Parts {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        if let Some(context) = context {
            parts.extensions.insert(context);
        }
        parts
    }

    fn alice() -> CallContext {
        CallContext::new()
            .attach("uuid-123", "alice", &["user".to_string()])
            .unwrap()
    }

    #[tokio::test]
    async fn test_auth_reads_attached_credentials() {
        let Ok(Auth(credentials)) = Auth::from_request_parts(&mut parts(Some(alice())), &()).await
        else {
            panic!("expected credentials");
        };
        assert_eq!(credentials.login, "alice");
    }

    #[tokio::test]
    async fn test_auth_without_context() {
        let Err(err) = Auth::from_request_parts(&mut parts(None), &()).await else {
            panic!("expected rejection");
        };
        assert_eq!(err.code, Code::Unauthenticated);
        assert_eq!(err.message, "no metadata credentials found");
    }

    #[tokio::test]
    async fn test_maybe_auth_and_context() {
        let Ok(MaybeAuth(none)) = MaybeAuth::from_request_parts(&mut parts(None), &()).await;
        assert!(none.is_none());

        let Ok(MaybeAuth(some)) = MaybeAuth::from_request_parts(&mut parts(Some(alice())), &()).await;
        assert_eq!(some.unwrap().id, "uuid-123");

        let Ok(Context(context)) = Context::from_request_parts(&mut parts(Some(alice())), &()).await;
        assert_eq!(context.metadata().get("userlogincredential").unwrap(), "alice");

        let Ok(Context(empty)) = Context::from_request_parts(&mut parts(None), &()).await;
        assert!(empty.metadata().is_empty());
    }
}
