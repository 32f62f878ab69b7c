//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with two roles.
//!
//! ## Token Format
//!
//! ```text
//! Bearer seller:{seller_id}:{secret}   — seller identity
//! Bearer admin:{secret}                — marketplace admin
//! Bearer {secret}                      — legacy format (treated as admin)
//! ```
//!
//! The secret is compared in constant time against the configured service
//! token. When no token is configured the server runs open (development
//! mode) and every caller is an admin; a warning is logged at startup.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts`
//! impl.

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::AppError;
use vend_catalog::CatalogEntry;

// ── Role ────────────────────────────────────────────────────────────────────

/// Caller roles, ordered by privilege level.
///
/// The `Ord` derivation respects variant declaration order:
/// `Seller < Admin`. This enables `>=` comparison for access checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// Can create entries and mutate entries they own.
    Seller,
    /// Full access: review decisions, any entry, any operation.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role.
    pub role: Role,
    /// The caller's seller id (for the seller role). `None` for admins.
    pub seller_id: Option<Uuid>,
}

impl CallerIdentity {
    /// Whether the caller may mutate the given entry.
    ///
    /// Admins may mutate any entry; sellers only their own.
    pub fn can_mutate(&self, entry: &CatalogEntry) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Seller => self.seller_id == Some(entry.seller_id),
        }
    }

    /// The seller identity, required for entry creation.
    pub fn require_seller_id(&self) -> Result<Uuid, AppError> {
        self.seller_id.ok_or_else(|| {
            AppError::Forbidden("a seller identity is required for this operation".to_string())
        })
    }

    /// Require the admin role.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role >= Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("admin role required".to_string()))
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// The configured service token.
///
/// Custom `Debug` redacts the value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct SecretToken(String);

impl SecretToken {
    /// Wrap a token value.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Constant-time comparison against a provided secret.
    pub fn matches(&self, provided: &str) -> bool {
        constant_time_token_eq(provided, &self.0)
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

/// Auth configuration injected into request extensions.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The service token; `None` disables authentication (dev mode).
    pub token: Option<SecretToken>,
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, a dummy comparison runs anyway so timing does not
/// reveal length information.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let dummy = vec![0u8; expected.len()];
        let _ = dummy.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token into a caller identity, verifying the secret.
fn parse_token(token: &str, expected: &SecretToken) -> Result<CallerIdentity, AppError> {
    let parts: Vec<&str> = token.splitn(3, ':').collect();
    match parts.as_slice() {
        ["seller", seller_id, secret] => {
            if !expected.matches(secret) {
                return Err(AppError::Unauthorized("invalid token".to_string()));
            }
            let seller_id = seller_id
                .parse::<Uuid>()
                .map_err(|_| AppError::Unauthorized("invalid seller id in token".to_string()))?;
            Ok(CallerIdentity {
                role: Role::Seller,
                seller_id: Some(seller_id),
            })
        }
        ["admin", secret] => {
            if !expected.matches(secret) {
                return Err(AppError::Unauthorized("invalid token".to_string()));
            }
            Ok(CallerIdentity {
                role: Role::Admin,
                seller_id: None,
            })
        }
        // Legacy format: the bare secret, treated as admin.
        [secret] => {
            if !expected.matches(secret) {
                return Err(AppError::Unauthorized("invalid token".to_string()));
            }
            Ok(CallerIdentity {
                role: Role::Admin,
                seller_id: None,
            })
        }
        _ => Err(AppError::Unauthorized("malformed token".to_string())),
    }
}

/// Axum middleware enforcing bearer auth on the API routes.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or(AuthConfig { token: None });

    let identity = match &config.token {
        None => {
            // Open mode: no token configured.
            CallerIdentity {
                role: Role::Admin,
                seller_id: None,
            }
        }
        Some(expected) => {
            let header_value = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let token = match header_value.strip_prefix("Bearer ") {
                Some(token) => token,
                None => {
                    return AppError::Unauthorized("missing bearer token".to_string())
                        .into_response();
                }
            };
            match parse_token(token, expected) {
                Ok(identity) => identity,
                Err(err) => return err.into_response(),
            }
        }
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}

// ─── Tests ───────────────────────────────────────────────────────────
