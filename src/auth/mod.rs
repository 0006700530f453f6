//! Cookie-based session authentication.
//!
//! A short-lived access token and a long-lived refresh token travel as
//! cookies. Expired access tokens are renewed through the remote token
//! service, and the verified identity is handed to handlers through a
//! request-scoped [`CallContext`].

pub mod claims;
mod cookie;
mod credentials;
mod extractors;
mod middleware;
mod refresh;

pub use claims::{ClaimsError, SessionClaims};
pub use cookie::{
    ACCESS_COOKIE_MAX_AGE_SECS, ACCESS_COOKIE_NAME, CookiePolicy, REFRESH_COOKIE_MAX_AGE_SECS,
    REFRESH_COOKIE_NAME, SameSite, append_set_cookies, get_cookie,
};
pub use credentials::{
    CallContext, CarrierError, Credentials, USER_ID_KEY, USER_LOGIN_KEY, USER_ROLES_KEY,
};
pub use extractors::{Auth, Context, MaybeAuth};
pub use middleware::{AuthOutcome, SessionAuth, SessionRejection, session_middleware};
pub use refresh::{HttpTokenRefresher, RefreshError, TokenPair, TokenRefresher};
