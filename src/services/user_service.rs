use chrono::Utc;

use crate::{
    audit::log_audit,
    dto::users::{AddressRequest, ChangePasswordRequest, UpdateProfileRequest, UserProfile},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::auth_service::{hash_password, verify_password},
    state::AppState,
    validation::{ValidationErrors, validate_age, validate_name, validate_password, validate_phone},
};

async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<User> {
    state
        .store
        .find_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session is no longer valid".into()))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let account = current_user(state, user).await?;
    Ok(ApiResponse::ok("Profile", account.into()))
}

/// Name, phone and birth date only; email and role are not editable here.
pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    let mut account = current_user(state, user).await?;
    let mut errors = ValidationErrors::new();

    if let Some(name) = payload.name {
        if errors.check("name", validate_name(&name)).is_some() {
            account.name = name.trim().to_string();
        }
    }
    if let Some(phone) = payload.phone {
        let phone = phone.trim();
        if phone.is_empty() {
            account.phone = None;
        } else if errors.check("phone", validate_phone(phone)).is_some() {
            account.phone = Some(phone.to_string());
        }
    }
    if let Some(birth_date) = payload.birth_date {
        let today = Utc::now().date_naive();
        if errors
            .check("birth_date", validate_age(birth_date, today))
            .is_some()
        {
            account.birth_date = Some(birth_date);
        }
    }
    errors.into_result()?;

    let account = state.store.update_user(account).await?;
    tracing::info!(user_id = %account.id, "profile updated");
    Ok(ApiResponse::ok("Profile updated", account.into()))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let mut account = current_user(state, user).await?;
    if !verify_password(&payload.old_password, &account.password_hash)? {
        return Err(ValidationErrors::single("old_password", "current password is incorrect").into());
    }
    validate_password(&payload.new_password)
        .map_err(|msg| ValidationErrors::single("new_password", msg))?;

    account.password_hash = hash_password(&payload.new_password)?;
    state.store.update_user(account).await?;

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "password_change",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    Ok(ApiResponse::done("Password updated"))
}

pub async fn add_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Vec<String>>> {
    let address = payload.address.trim();
    if address.is_empty() {
        return Err(ValidationErrors::single("address", "address is required").into());
    }
    let mut account = current_user(state, user).await?;
    if account
        .addresses
        .iter()
        .any(|a| a.eq_ignore_ascii_case(address))
    {
        return Err(AppError::Conflict("Address already saved".into()));
    }
    account.addresses.push(address.to_string());
    let account = state.store.update_user(account).await?;
    Ok(ApiResponse::ok("Address added", account.addresses))
}

pub async fn remove_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Vec<String>>> {
    let address = payload.address.trim();
    let mut account = current_user(state, user).await?;
    let before = account.addresses.len();
    account.addresses.retain(|a| !a.eq_ignore_ascii_case(address));
    if account.addresses.len() == before {
        return Err(AppError::NotFound);
    }
    let account = state.store.update_user(account).await?;
    Ok(ApiResponse::ok("Address removed", account.addresses))
}
