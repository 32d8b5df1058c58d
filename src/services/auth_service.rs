use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    cart::CartOwner,
    config::AuthSettings,
    dto::{
        auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        users::UserProfile,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Role, User},
    pricing::registration_discount,
    regions::format_address,
    response::{ApiResponse, Meta},
    state::AppState,
    store::EMAIL_TAKEN,
    validation::{
        ValidationErrors, validate_address, validate_age, validate_email, validate_name,
        validate_password, validate_phone,
    },
};

pub const STUDENT_EMAIL_DOMAIN: &str = "duocuc.cl";
const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_token(user: &User, settings: &AuthSettings) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(settings.token_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn in_domain(email: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('@');
    !domain.is_empty() && email.ends_with(&format!("@{}", domain.to_lowercase()))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let today = Utc::now().date_naive();
    let email = payload.email.trim().to_lowercase();
    let mut errors = ValidationErrors::new();

    errors.check("name", validate_name(&payload.name));
    errors.check("email", validate_email(&email));
    if in_domain(&email, &state.config.auth.admin_email_domain) {
        errors.add("email", "this email domain is reserved for staff accounts");
    }
    errors.check("password", validate_password(&payload.password));
    if let Some(confirm) = &payload.confirm_password {
        if *confirm != payload.password {
            errors.add("confirm_password", "passwords do not match");
        }
    }

    let phone = payload
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    match phone {
        Some(phone) => {
            errors.check("phone", validate_phone(phone));
        }
        None => errors.add("phone", "phone is required"),
    }

    let age = match payload.birth_date {
        Some(birth) => errors.check("birth_date", validate_age(birth, today)),
        None => {
            errors.add("birth_date", "birth date is required");
            None
        }
    };

    let mut addresses = Vec::new();
    match &payload.address {
        Some(address) => {
            let address_errors = validate_address(
                &address.street,
                &address.number,
                &address.region,
                &address.commune,
            );
            if address_errors.is_empty() {
                addresses.push(format_address(
                    &address.street,
                    &address.number,
                    &address.commune,
                    &address.region,
                ));
            }
            errors.merge(address_errors);
        }
        None => errors.add("address", "a delivery address is required"),
    }
    errors.into_result()?;

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
    }

    let promo_code = payload
        .promo_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    let discount_percent = registration_discount(age, promo_code.as_deref());
    let is_student = in_domain(&email, STUDENT_EMAIL_DOMAIN);

    let user = User {
        id: Uuid::new_v4(),
        email,
        password_hash: hash_password(&payload.password)?,
        name: payload.name.trim().to_string(),
        phone: phone.map(str::to_string),
        birth_date: payload.birth_date,
        role: Role::User,
        protected: false,
        discount_percent,
        promo_code,
        is_student,
        addresses,
        created_at: Utc::now(),
    };
    let user = state.store.insert_user(user).await?;

    let mut benefits = Vec::new();
    if user.is_student {
        benefits.push("Student account: a free cake on your birthday".to_string());
    }
    if user.discount_percent > 0 {
        benefits.push(format!(
            "A {}% discount has been applied to your account",
            user.discount_percent
        ));
    }

    tracing::info!(user_id = %user.id, "user registered");
    if let Err(err) = log_audit(
        &state.store,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "User created",
        RegisterResponse {
            user: user.into(),
            benefits,
        },
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest {
        email,
        password,
        guest_cart_id,
    } = payload;

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;
    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = issue_token(&user, &state.config.auth)?;

    let cart_migrated = match guest_cart_id {
        Some(guest_id) => migrate_guest_cart(state, guest_id, user.id).await?,
        None => false,
    };

    if let Err(err) = log_audit(
        &state.store,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "cart_migrated": cart_migrated })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {token}"),
            user: user.into(),
            cart_migrated,
        },
        Some(Meta::empty()),
    ))
}

/// Carries a guest cart over when the account has none; the guest cart is
/// dropped either way.
async fn migrate_guest_cart(state: &AppState, guest_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let guest = CartOwner::Guest(guest_id);
    let owner = CartOwner::User(user_id);

    let Some(guest_cart) = state.store.load_cart(guest).await? else {
        return Ok(false);
    };
    let mut cart = state.store.load_cart(owner).await?.unwrap_or_default();
    let migrated = cart.adopt(guest_cart);
    if migrated {
        state.store.save_cart(owner, &cart).await?;
        tracing::info!(%user_id, "guest cart migrated");
    }
    state.store.delete_cart(guest).await?;
    Ok(migrated)
}

pub async fn logout_user(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "user_logout",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    Ok(ApiResponse::done("Logged out"))
}

pub async fn verify_session(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UserProfile>> {
    let account = state
        .store
        .find_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session is no longer valid".into()))?;
    Ok(ApiResponse::ok("Session valid", account.into()))
}
