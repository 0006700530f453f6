//! Session authentication middleware.
//!
//! Per request: read the access cookie, verify its signature, decode the
//! claims and, when they are no longer live, exchange the refresh cookie for
//! a new token pair. The verified identity is attached to a fresh
//! [`CallContext`] stored in the request extensions.
//!
//! After a successful refresh the identity of the expired claims is used for
//! the current request. The reissued access token is first checked on the
//! client's next request.

use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::claims;
use super::cookie::{
    ACCESS_COOKIE_NAME, CookiePolicy, REFRESH_COOKIE_NAME, append_set_cookies, get_cookie,
};
use super::credentials::CallContext;
use super::refresh::TokenRefresher;
use crate::api::ApiError;
use crate::jwt::Verifier;

/// Shared, read-only middleware state. Built once at startup.
pub struct SessionAuth {
    verifier: Option<Verifier>,
    refresher: Arc<dyn TokenRefresher>,
    cookies: CookiePolicy,
}

impl std::fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuth")
            .field("verifier", &self.verifier)
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}

/// Result of a successful pass through the middleware.
#[derive(Debug)]
pub enum AuthOutcome {
    /// No access cookie; the request continues without credentials.
    Anonymous,
    /// Identity attached. `cookies` holds Set-Cookie values to add to the
    /// response (empty unless the session was refreshed).
    Authenticated {
        context: CallContext,
        cookies: Vec<String>,
    },
}

/// A rejected request: the error to return and the cookies to set with it.
#[derive(Debug)]
pub struct SessionRejection {
    pub error: ApiError,
    pub cookies: Vec<String>,
}

impl SessionRejection {
    fn new(error: ApiError) -> Self {
        Self {
            error,
            cookies: Vec::new(),
        }
    }

    fn clearing(error: ApiError, policy: &CookiePolicy) -> Self {
        Self {
            error,
            cookies: policy.clear_both().into(),
        }
    }
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        let mut response = self.error.into_response();
        append_set_cookies(response.headers_mut(), self.cookies);
        response
    }
}

impl SessionAuth {
    /// An unusable secret does not prevent startup, but every request
    /// carrying a token is then rejected.
    pub fn new(secret: &[u8], refresher: Arc<dyn TokenRefresher>, cookies: CookiePolicy) -> Self {
        let verifier = match Verifier::new(secret) {
            Ok(verifier) => Some(verifier),
            Err(e) => {
                tracing::error!(error = %e, "Cannot build token verifier; all sessions will be rejected");
                None
            }
        };
        Self {
            verifier,
            refresher,
            cookies,
        }
    }

    pub fn cookie_policy(&self) -> &CookiePolicy {
        &self.cookies
    }

    /// Authenticate a request from its headers against the current time.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthOutcome, SessionRejection> {
        self.authenticate_at(headers, SystemTime::now()).await
    }

    /// Authenticate a request, evaluating token liveness at `now`.
    pub async fn authenticate_at(
        &self,
        headers: &HeaderMap,
        now: SystemTime,
    ) -> Result<AuthOutcome, SessionRejection> {
        let Some(token) = get_cookie(headers, ACCESS_COOKIE_NAME) else {
            return Ok(AuthOutcome::Anonymous);
        };

        let Some(verifier) = self.verifier.as_ref() else {
            tracing::error!("Token verifier is not configured");
            return Err(SessionRejection::new(ApiError::unauthenticated(
                "verification failed",
            )));
        };

        let raw = verifier.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "Access token verification failed");
            SessionRejection::new(ApiError::unauthenticated("verification failed"))
        })?;

        let claims = claims::decode(&raw).map_err(|e| {
            tracing::warn!(error = %e, "Access token carries malformed claims");
            SessionRejection::new(ApiError::unauthenticated("malformed claims"))
        })?;

        let mut cookies = Vec::new();

        if !claims.is_live_at(now) {
            let Some(refresh_token) = get_cookie(headers, REFRESH_COOKIE_NAME) else {
                tracing::debug!(login = %claims.login, "Session expired without refresh cookie");
                return Err(SessionRejection::clearing(
                    ApiError::unauthenticated("session expired, no refresh token"),
                    &self.cookies,
                ));
            };

            // Dropping this future (client gone) drops the pending call.
            let tokens = self.refresher.refresh(refresh_token).await.map_err(|e| {
                tracing::warn!(login = %claims.login, error = %e, "Session refresh failed");
                SessionRejection::clearing(e.into(), &self.cookies)
            })?;

            tracing::info!(login = %claims.login, "Session refreshed");
            cookies.extend(
                self.cookies
                    .issue(&tokens.access_token, &tokens.refresh_token),
            );
        }

        // Always a fresh context: identity headers sent by the client are ignored.
        let context = CallContext::new()
            .attach(claims.subject_id(), &claims.login, &claims.roles)
            .map_err(|e| {
                tracing::error!(error = %e, "Cannot attach credentials");
                SessionRejection {
                    error: e.into(),
                    cookies: cookies.clone(),
                }
            })?;

        Ok(AuthOutcome::Authenticated { context, cookies })
    }
}

/// Axum middleware running [`SessionAuth`] in front of the wrapped routes.
pub async fn session_middleware(
    State(auth): State<Arc<SessionAuth>>,
    mut req: Request,
    next: Next,
) -> Response {
    match auth.authenticate(req.headers()).await {
        Ok(AuthOutcome::Anonymous) => next.run(req).await,
        Ok(AuthOutcome::Authenticated { context, cookies }) => {
            req.extensions_mut().insert(context);
            let mut response = next.run(req).await;
            append_set_cookies(response.headers_mut(), cookies);
            response
        }
        Err(rejection) => rejection.into_response(),
    }
}
