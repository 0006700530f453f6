//! Request-scoped identity carrier.
//!
//! Verified identity travels with the request as metadata in three fixed
//! slots. The metadata is an `http::HeaderMap` so it can be forwarded as-is
//! on outgoing calls to backend services.

use axum::http::{HeaderMap, HeaderValue};
use serde::Serialize;

use crate::api::{ApiError, ErrorDetail};

/// Slot holding the subject identifier.
pub const USER_ID_KEY: &str = "userauthid";

/// Slot holding the login.
pub const USER_LOGIN_KEY: &str = "userlogincredential";

/// Multi-valued slot holding the roles.
pub const USER_ROLES_KEY: &str = "userrolescredential";

/// Minimal identity handed to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub id: String,
    pub login: String,
    pub roles: Vec<String>,
}

/// Per-request propagation context.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    metadata: HeaderMap,
}

/// Identity values that cannot be carried as metadata.
#[derive(Debug, thiserror::Error)]
#[error("Cannot carry {field} in request metadata")]
pub struct CarrierError {
    pub field: &'static str,
}

impl From<CarrierError> for ApiError {
    fn from(e: CarrierError) -> Self {
        ApiError::internal("failed to propagate credentials")
            .with_detail(ErrorDetail::new(e.field, e.to_string(), ""))
    }
}

fn metadata_value(field: &'static str, value: &str) -> Result<HeaderValue, CarrierError> {
    HeaderValue::from_str(value).map_err(|_| CarrierError { field })
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a context from propagated headers on the receiving side.
    /// Only the identity slots are copied.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut metadata = HeaderMap::new();
        for key in [USER_ID_KEY, USER_LOGIN_KEY, USER_ROLES_KEY] {
            for value in headers.get_all(key) {
                metadata.append(key, value.clone());
            }
        }
        Self { metadata }
    }

    pub fn metadata(&self) -> &HeaderMap {
        &self.metadata
    }

    /// Return a copy of this context carrying the given identity.
    ///
    /// Existing identity slots are replaced, so attaching the same identity
    /// twice leaves a single value per slot.
    pub fn attach(&self, id: &str, login: &str, roles: &[String]) -> Result<Self, CarrierError> {
        let id = metadata_value("User ID", id)?;
        let login = metadata_value("User Login", login)?;
        let roles = roles
            .iter()
            .map(|role| metadata_value("User Roles", role))
            .collect::<Result<Vec<_>, _>>()?;

        let mut metadata = self.metadata.clone();
        metadata.insert(USER_ID_KEY, id);
        metadata.insert(USER_LOGIN_KEY, login);
        metadata.remove(USER_ROLES_KEY);
        for role in roles {
            metadata.append(USER_ROLES_KEY, role);
        }

        Ok(Self { metadata })
    }

    /// Read the identity back out. `id` and `login` must hold exactly one
    /// value and `roles` at least one.
    pub fn read(&self) -> Result<Credentials, ApiError> {
        let ids = self.values(USER_ID_KEY);
        if ids.len() != 1 {
            tracing::warn!(values = ids.len(), "Cannot get user id from metadata");
            return Err(missing_credentials(
                "User ID",
                "User id was not found in metadata",
                &ids,
            ));
        }

        let logins = self.values(USER_LOGIN_KEY);
        if logins.len() != 1 {
            tracing::warn!(user_id = %ids[0], "Cannot get user login from metadata");
            return Err(missing_credentials(
                "User Login",
                "User login was not found in metadata",
                &logins,
            ));
        }

        let roles = self.values(USER_ROLES_KEY);
        if roles.is_empty() {
            tracing::warn!(user_id = %ids[0], login = %logins[0], "Cannot get user roles from metadata");
            return Err(missing_credentials(
                "User Roles",
                "User roles was not found in metadata",
                &roles,
            ));
        }

        Ok(Credentials {
            id: ids[0].clone(),
            login: logins[0].clone(),
            roles,
        })
    }

    fn values(&self, key: &str) -> Vec<String> {
        self.metadata
            .get_all(key)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect()
    }
}

fn missing_credentials(field: &str, description: &str, actual: &[String]) -> ApiError {
    ApiError::unauthenticated("no user credentials found")
        .with_detail(ErrorDetail::new(field, description, actual.join(",")))
}
