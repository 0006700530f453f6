//! Session cookie parsing and issuing.

use axum::http::{HeaderMap, HeaderValue, header};

/// Cookie name for the access token (short-lived).
pub const ACCESS_COOKIE_NAME: &str = "authTokenCookie";

/// Cookie name for the refresh token (long-lived).
pub const REFRESH_COOKIE_NAME: &str = "refreshTokenCookie";

/// Default access cookie lifetime: 20 minutes
pub const ACCESS_COOKIE_MAX_AGE_SECS: u64 = 20 * 60;

/// Default refresh cookie lifetime: 31 days
pub const REFRESH_COOKIE_MAX_AGE_SECS: u64 = 31 * 24 * 60 * 60;

/// Extract a cookie value from the Cookie header.
/// Pairs are split on raw bytes, so a non-UTF-8 pair does not hide the others.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        for part in cookie_header.as_bytes().split(|&b| b == b';') {
            let Ok(part) = std::str::from_utf8(part) else {
                continue;
            };
            if let Some((key, value)) = part.trim().split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}

/// Whether `value` can be sent as a cookie value without quoting
/// (RFC 6265 `cookie-octet`).
pub fn is_cookie_value(value: &str) -> bool {
    value.bytes().all(|b| {
        matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
    })
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Lifetimes and attributes of the session cookie pair.
/// Cookies are always `Path=/`, `Secure` and `HttpOnly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub access_max_age: u64,
    pub refresh_max_age: u64,
    pub same_site: SameSite,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            access_max_age: ACCESS_COOKIE_MAX_AGE_SECS,
            refresh_max_age: REFRESH_COOKIE_MAX_AGE_SECS,
            same_site: SameSite::default(),
        }
    }
}

impl CookiePolicy {
    fn build(&self, name: &str, value: &str, max_age: Option<i64>) -> String {
        let max_age = match max_age {
            Some(secs) => format!("; Max-Age={}", secs),
            None => String::new(),
        };
        format!(
            "{}={}; Path=/; HttpOnly; Secure; SameSite={}{}",
            name,
            value,
            self.same_site.as_str(),
            max_age
        )
    }

    fn clear(&self, name: &str) -> String {
        self.build(name, "", Some(-1))
    }

    /// Cookies issued after a successful refresh: `[access, refresh]`.
    pub fn issue(&self, access_token: &str, refresh_token: &str) -> [String; 2] {
        [
            self.build(
                ACCESS_COOKIE_NAME,
                access_token,
                Some(self.access_max_age as i64),
            ),
            self.build(
                REFRESH_COOKIE_NAME,
                refresh_token,
                Some(self.refresh_max_age as i64),
            ),
        ]
    }

    /// Cookies that remove both session cookies from the client.
    pub fn clear_both(&self) -> [String; 2] {
        [
            self.clear(ACCESS_COOKIE_NAME),
            self.clear(REFRESH_COOKIE_NAME),
        ]
    }

    /// Cookies for a login response.
    ///
    /// Without `remember_me` the access cookie lives for the browser session
    /// and no refresh cookie is kept. Empty tokens clear their cookie.
    pub fn login_cookies(
        &self,
        access_token: &str,
        refresh_token: &str,
        remember_me: bool,
    ) -> [String; 2] {
        let access = if access_token.is_empty() {
            self.clear(ACCESS_COOKIE_NAME)
        } else if remember_me {
            self.build(
                ACCESS_COOKIE_NAME,
                access_token,
                Some(self.refresh_max_age as i64),
            )
        } else {
            self.build(ACCESS_COOKIE_NAME, access_token, None)
        };

        let refresh = if refresh_token.is_empty() || !remember_me {
            self.clear(REFRESH_COOKIE_NAME)
        } else {
            self.build(
                REFRESH_COOKIE_NAME,
                refresh_token,
                Some(self.refresh_max_age as i64),
            )
        };

        [access, refresh]
    }
}

/// Append Set-Cookie headers, skipping values that are not valid header text.
pub fn append_set_cookies<I>(headers: &mut HeaderMap, cookies: I)
where
    I: IntoIterator<Item = String>,
{
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!("Dropping cookie with invalid header characters"),
        }
    }
}
