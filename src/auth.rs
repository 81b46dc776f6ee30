//! Operator authentication.
//!
//! Passwords are stored as Argon2 PHC strings. A successful login sets a
//! signed, HTTP-only cookie holding the operator id; the signature is checked
//! and the operator re-loaded on every protected request, so deleting an
//! account ends its sessions.

use std::convert::Infallible;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::model::Operator;
use crate::storage::Storage;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "snakesafe_session";

/// Where unauthenticated users are sent.
pub const LOGIN_PATH: &str = "/login";

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a password against a stored PHC string. A malformed hash never matches.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Derive the cookie signing key from the configured secret.
///
/// SHA-512 yields exactly the 64 bytes the cookie key needs, whatever the
/// length of the secret.
pub fn session_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Look up an operator and check the password.
///
/// Returns `Ok(None)` for an unknown user or a wrong password; the two cases
/// are indistinguishable to the caller.
pub async fn authenticate(
    storage: &Storage,
    username: &str,
    password: &str,
) -> Result<Option<Operator>, AppError> {
    let Some(operator) = storage.find_operator_by_username(username).await? else {
        info!("Login failed");
        return Ok(None);
    };

    if verify_password(password, &operator.password_hash) {
        info!(operator_id = operator.id, "Login succeeded");
        Ok(Some(operator))
    } else {
        info!("Login failed");
        Ok(None)
    }
}

/// Add the session cookie for `operator` to the jar.
pub fn start_session(jar: SignedCookieJar, operator: &Operator) -> SignedCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, operator.id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Remove the session cookie from the jar.
pub fn end_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// The logged-in operator. Extracting it from a request without a valid
/// session redirects to the login page.
#[derive(Debug, Clone)]
pub struct CurrentOperator {
    pub id: i64,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentOperator
where
    S: Send + Sync,
    Key: FromRef<S>,
    Storage: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|never: Infallible| -> Response { match never {} })?;

        let Some(id) = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| cookie.value().parse::<i64>().ok())
        else {
            debug!(path = %parts.uri.path(), "No valid session");
            return Err(Redirect::to(LOGIN_PATH).into_response());
        };

        let storage = Storage::from_ref(state);
        match storage.find_operator_by_id(id).await {
            Ok(Some(operator)) => Ok(CurrentOperator {
                id: operator.id,
                username: operator.username,
            }),
            Ok(None) => {
                warn!(operator_id = id, "Session refers to a missing operator");
                Err(Redirect::to(LOGIN_PATH).into_response())
            }
            Err(e) => Err(AppError::from(e).into_response()),
        }
    }
}
