use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::profiles::repo_types::Profile;
use crate::state::AppState;
use crate::store::{NewAccount, StoreError};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Checks a registration payload and returns it normalized.
pub(crate) fn validate_registration(mut req: RegisterRequest) -> Result<RegisterRequest, AppError> {
    req.email = normalize_email(&req.email);
    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::BadRequest("Password too short".into()));
    }
    req.name = req.name.trim().to_string();
    if req.name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    req.bio = req
        .bio
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());
    Ok(req)
}

pub(crate) async fn register(
    state: &AppState,
    req: RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let req = validate_registration(req)?;
    let hash = hash_password(&req.password)?;

    let (user, profile) = state
        .store
        .create_account(NewAccount {
            email: &req.email,
            password_hash: &hash,
            name: &req.name,
            bio: req.bio.as_deref(),
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                warn!(email = %req.email, "email already registered");
                AppError::Conflict("Email already registered".into())
            }
            other => other.into(),
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_session(state, user.id, user.email, profile)
}

pub(crate) async fn login(state: &AppState, req: LoginRequest) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let profile = load_profile(state, user.id).await?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    issue_session(state, user.id, user.email, profile)
}

pub(crate) async fn refresh(
    state: &AppState,
    refresh_token: &str,
) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from(&state.config.jwt);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        AppError::Unauthorized("Invalid refresh token".into())
    })?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    let profile = load_profile(state, user.id).await?;
    issue_session(state, user.id, user.email, profile)
}

async fn load_profile(state: &AppState, user_id: Uuid) -> Result<Profile, AppError> {
    state
        .store
        .get_profile(user_id)
        .await?
        .ok_or(AppError::NotFound("profile"))
}

fn issue_session(
    state: &AppState,
    user_id: Uuid,
    email: String,
    profile: Profile,
) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from(&state.config.jwt);
    Ok(AuthResponse {
        access_token: keys.sign_access(user_id)?,
        refresh_token: keys.sign_refresh(user_id)?,
        user: PublicUser { id: user_id, email },
        profile,
    })
}
