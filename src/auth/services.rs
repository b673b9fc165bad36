use axum::extract::FromRef;
use hmac::{Hmac, Mac};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::auth::{
    dto::{AuthResponse, PublicUser},
    jwt::{JwtKeys, TokenError},
    password::{hash_password_blocking, verify_password_blocking},
    repo::StoreError,
    repo_types::{NewUser, User},
};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are compared case-insensitively; the store only sees this form.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

type HmacSha256 = Hmac<Sha256>;

/// Constant-time secret check: both sides are reduced to fixed-length MACs
/// and compared with `verify_slice`, so neither content nor length leaks.
pub(crate) fn admin_secret_matches(expected: &str, given: &str) -> bool {
    const LABEL: &[u8] = b"smartpantry-admin-secret";
    let Ok(mut expected_mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    expected_mac.update(LABEL);
    let expected_tag = expected_mac.finalize().into_bytes();

    let Ok(mut given_mac) = HmacSha256::new_from_slice(given.as_bytes()) else {
        return false;
    };
    given_mac.update(LABEL);
    given_mac.verify_slice(&expected_tag).is_ok()
}

pub async fn register(
    state: &AppState,
    email: &str,
    name: &str,
    password: &str,
    admin_secret: Option<&str>,
) -> AppResult<PublicUser> {
    let email = normalize_email(email);

    match state.users.find_by_email(&email).await {
        Ok(Some(_)) => {
            warn!(email = %email, "email already registered");
            return Err(AppError::DuplicateEmail);
        }
        Ok(None) => {}
        Err(e) => return Err(AppError::RegistrationFailed(e.into())),
    }

    let is_admin = match admin_secret.map(str::trim).filter(|s| !s.is_empty()) {
        None => false,
        Some(given) => match state.config.admin_secret.as_deref() {
            Some(expected) if admin_secret_matches(expected, given) => true,
            _ => {
                warn!(email = %email, "registration with invalid admin secret");
                return Err(AppError::InvalidAdminSecret);
            }
        },
    };

    let hash = hash_password_blocking(password)
        .await
        .map_err(AppError::RegistrationFailed)?;

    let user = state
        .users
        .create(NewUser {
            email: &email,
            name: name.trim(),
            password_hash: &hash,
            is_admin,
        })
        .await
        .map_err(|e| match e {
            StoreError::Duplicate => {
                warn!(email = %email, "email taken by concurrent registration");
                AppError::DuplicateEmail
            }
            other => {
                error!(error = %other, "create user failed");
                AppError::RegistrationFailed(other.into())
            }
        })?;

    info!(user_id = user.id, email = %user.email, is_admin = user.is_admin, "user registered");
    Ok(user.into())
}

pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<AuthResponse> {
    let email = normalize_email(email);

    let found = state.users.find_by_email(&email).await.map_err(|e| {
        error!(error = %e, "find_by_email failed");
        AppError::Internal(e.into())
    })?;

    // Unknown emails still pay for one Argon2 verification.
    let verified =
        verify_password_blocking(password, found.as_ref().map(|u| u.password_hash.as_str()))
            .await
            .map_err(AppError::Internal)?;

    let user = match found {
        Some(u) if verified => u,
        Some(u) => {
            warn!(email = %email, user_id = u.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign(&user.email).map_err(AppError::Internal)?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(AuthResponse {
        access_token,
        token_type: "bearer",
        user: user.into(),
    })
}

/// Resolve a bearer token to the current user record.
pub async fn identify(state: &AppState, token: &str) -> AppResult<User> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(token).map_err(|e| {
        match e {
            TokenError::Expired => warn!("expired token"),
            TokenError::Invalid(err) => warn!(error = %err, "invalid token"),
        }
        AppError::InvalidCredentials
    })?;

    match state.users.find_by_email(&claims.sub).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!(email = %claims.sub, "token subject no longer exists");
            Err(AppError::UserNotFound)
        }
        Err(e) => Err(AppError::Internal(e.into())),
    }
}

pub fn require_admin(user: User) -> AppResult<User> {
    if user.is_admin {
        Ok(user)
    } else {
        warn!(user_id = user.id, "admin privileges required");
        Err(AppError::Forbidden)
    }
}

/// Out-of-band promotion of an existing account.
pub async fn promote_admin(state: &AppState, email: &str) -> AppResult<PublicUser> {
    let email = normalize_email(email);
    match state.users.set_admin(&email).await {
        Ok(Some(user)) => {
            info!(user_id = user.id, email = %user.email, "user promoted to admin");
            Ok(user.into())
        }
        Ok(None) => Err(AppError::UserNotFound),
        Err(e) => Err(AppError::Internal(e.into())),
    }
}

/// Make sure the configured seed admin exists; safe to run on every start.
pub async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let Some(seed) = state.config.bootstrap_admin.clone() else {
        return Ok(());
    };
    let email = normalize_email(&seed.email);

    match state.users.find_by_email(&email).await? {
        Some(user) if user.is_admin => {
            info!(email = %email, "seed admin already present");
            return Ok(());
        }
        Some(_) => {
            state.users.set_admin(&email).await?;
            info!(email = %email, "seed admin promoted");
            return Ok(());
        }
        None => {}
    }

    let hash = hash_password_blocking(&seed.password).await?;
    let res = state
        .users
        .create(NewUser {
            email: &email,
            name: seed.name.trim(),
            password_hash: &hash,
            is_admin: true,
        })
        .await;
    match res {
        Ok(user) => info!(user_id = user.id, email = %email, "seed admin created"),
        Err(StoreError::Duplicate) => {
            state.users.set_admin(&email).await?;
            info!(email = %email, "seed admin created concurrently");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
