use crate::{
    config::AppConfig,
    database::{UserStore, VerificationUpdate},
    models::{ApiMessage, User},
    services::mailer::Mailer,
    utils::{error::AppError, validation},
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct Claims {
    pub sub: String,           // user_id
    pub username: String,
    pub email: String,
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
    pub jti: String,           // JWT ID
    pub aud: String,           // audience
    pub iss: String,           // issuer
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyCodeRequest {
    pub username: String,
    pub code: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResendCodeRequest {
    pub username: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignInRequest {
    /// Email or username
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub is_accepting_messages: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SignInResponse {
    pub success: bool,
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: Claims,
}

/// Random six digit code in `100000..=999999`
pub fn generate_verification_code() -> String {
    let value = 100_000 + (Uuid::new_v4().as_u128() % 900_000) as u32;
    value.to_string()
}

// Generate JWT token
pub fn generate_jwt(config: &AppConfig, user: &User) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = Duration::try_hours(config.session_ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal(format!("Session TTL out of range: {}h", config.session_ttl_hours)))?;
    let claims = Claims {
        sub: user.user_id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: config.jwt_audience.clone(),
        iss: config.jwt_issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Verify JWT token
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.jwt_audience.clone()]);

    let mut issuers = HashSet::new();
    issuers.insert(config.jwt_issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

fn username_taken() -> AppError {
    AppError::BadRequest("Username is already taken".to_string())
}

fn hash_password(config: &AppConfig, password: &str) -> Result<String, AppError> {
    hash(password, config.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

// User registration
pub async fn sign_up(
    store: &dyn UserStore,
    mailer: &dyn Mailer,
    config: &AppConfig,
    request: &SignUpRequest,
) -> Result<ApiMessage, AppError> {
    let username = request.username.trim();
    let email = request.email.trim().to_lowercase();

    let username_errors = validation::username_errors(username);
    if !username_errors.is_empty() {
        return Err(AppError::BadRequest(username_errors.join(", ")));
    }
    if !validation::is_valid_email(&email) {
        return Err(AppError::BadRequest("Please use a valid email address".to_string()));
    }
    if let Some(error) = validation::password_error(&request.password) {
        return Err(AppError::BadRequest(error));
    }

    let username_holder = store.find_by_username(username).await?;
    if username_holder.as_ref().map_or(false, |holder| holder.is_verified) {
        return Err(username_taken());
    }

    let hashed_password = hash_password(config, &request.password)?;
    let verify_code = generate_verification_code();
    let expiry = Utc::now() + Duration::seconds(config.verify_code_ttl_secs);

    // Unverified accounts can be claimed again with the same email
    let mail_username = match store.find_by_email(&email).await? {
        Some(existing) if existing.is_verified => {
            return Err(AppError::BadRequest("User already exists with this email".to_string()));
        }
        Some(existing) => {
            store
                .update_verification(
                    &existing.user_id,
                    VerificationUpdate {
                        password: Some(hashed_password),
                        verify_code: Some(verify_code.clone()),
                        verify_code_expiry: Some(expiry),
                        is_verified: false,
                    },
                )
                .await?;
            log::info!("🔁 Refreshed pending registration for {}", email);
            existing.username
        }
        // A pending registration under another email still owns the username
        None if username_holder.is_some() => return Err(username_taken()),
        None => {
            let mut user = User::new(username, &email, hashed_password);
            user.verify_code = Some(verify_code.clone());
            user.verify_code_expiry = Some(expiry);
            let user = store.insert_user(user).await.map_err(|e| match e {
                AppError::Conflict(_) => username_taken(),
                other => other,
            })?;
            log::info!("✅ User registered: {} <{}>", user.username, user.email);
            user.username
        }
    };

    mailer
        .send_verification(&email, &mail_username, &verify_code)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to send verification email: {}", e)))?;

    Ok(ApiMessage::ok("User registered successfully. Please verify your account."))
}

pub async fn verify_code(
    store: &dyn UserStore,
    request: &VerifyCodeRequest,
) -> Result<ApiMessage, AppError> {
    let username = urlencoding::decode(&request.username)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| request.username.clone());

    let user = store
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let is_code_valid = user.verify_code.as_deref() == Some(request.code.trim());
    let is_code_not_expired = user
        .verify_code_expiry
        .map(|expiry| expiry > Utc::now())
        .unwrap_or(false);

    if is_code_valid && is_code_not_expired {
        store
            .update_verification(
                &user.user_id,
                VerificationUpdate {
                    password: None,
                    verify_code: None,
                    verify_code_expiry: None,
                    is_verified: true,
                },
            )
            .await?;
        log::info!("✅ Account verified: {}", username);
        Ok(ApiMessage::ok("Account verified successfully"))
    } else if !is_code_not_expired {
        Err(AppError::BadRequest(
            "Verification code is expired. Please sign up again to get a new code.".to_string(),
        ))
    } else {
        Err(AppError::BadRequest("Incorrect verification code".to_string()))
    }
}

pub async fn resend_verify_code(
    store: &dyn UserStore,
    mailer: &dyn Mailer,
    config: &AppConfig,
    request: &ResendCodeRequest,
) -> Result<ApiMessage, AppError> {
    let user = store
        .find_by_username(request.username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.is_verified {
        return Err(AppError::BadRequest("Account is already verified".to_string()));
    }

    let now = Utc::now();

    // The expiry is always issued as "sent at + ttl", so the send time can be recovered from it
    if let Some(expiry) = user.verify_code_expiry {
        let last_sent = expiry - Duration::seconds(config.verify_code_ttl_secs);
        let cooldown_start = now - Duration::seconds(config.resend_cooldown_secs);
        if last_sent > cooldown_start {
            let wait_ms = (last_sent - cooldown_start).num_milliseconds();
            let time_left = (wait_ms + 999) / 1000;
            return Err(AppError::TooManyRequests(format!(
                "Please wait {} seconds before requesting a new code",
                time_left
            )));
        }
    }

    let verify_code = generate_verification_code();
    store
        .update_verification(
            &user.user_id,
            VerificationUpdate {
                password: None,
                verify_code: Some(verify_code.clone()),
                verify_code_expiry: Some(now + Duration::seconds(config.verify_code_ttl_secs)),
                is_verified: false,
            },
        )
        .await?;

    mailer
        .send_verification(&user.email, &user.username, &verify_code)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to send verification email: {}", e)))?;

    Ok(ApiMessage::ok("New verification code sent successfully"))
}

// User login
pub async fn sign_in(
    store: &dyn UserStore,
    config: &AppConfig,
    request: &SignInRequest,
) -> Result<SignInResponse, AppError> {
    if request.identifier.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest("Please provide all required fields".to_string()));
    }

    let user = store
        .find_by_identifier(request.identifier.trim())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = verify(&request.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))?;

    if !valid {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    if !user.is_verified {
        return Err(AppError::Forbidden(
            "Please verify your account before logging in".to_string(),
        ));
    }

    let token = generate_jwt(config, &user)?;

    Ok(SignInResponse {
        success: true,
        token,
        user: SessionUser {
            id: user.user_id,
            username: user.username,
            email: user.email,
            is_verified: user.is_verified,
            is_accepting_messages: user.is_accepting_messages,
        },
    })
}

pub async fn check_identifier(store: &dyn UserStore, identifier: Option<&str>) -> Result<ApiMessage, AppError> {
    let identifier = identifier
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Identifier is required".to_string()))?;

    match store.find_by_identifier(identifier).await? {
        Some(_) => Ok(ApiMessage::ok("Identifier exists")),
        None => Err(AppError::NotFound("No user exists with this identifier".to_string())),
    }
}

pub async fn check_unique_username(store: &dyn UserStore, username: Option<&str>) -> Result<ApiMessage, AppError> {
    let username = username.unwrap_or_default().trim();

    let errors = validation::username_errors(username);
    if !errors.is_empty() {
        return Err(AppError::BadRequest(format!("Invalid username format: {}", errors.join(", "))));
    }

    match store.find_by_username(username).await? {
        Some(_) => Err(AppError::Conflict("Username is already taken".to_string())),
        None => Ok(ApiMessage::ok("Username is available")),
    }
}

pub async fn check_unique_email(store: &dyn UserStore, email: Option<&str>) -> Result<ApiMessage, AppError> {
    let email = email
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required".to_string()))?;

    match store.find_by_email(email).await? {
        Some(_) => Err(AppError::BadRequest("User already exists with this email".to_string())),
        None => Ok(ApiMessage::ok("Email is unique")),
    }
}
