use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};

use crate::{
    dto::users::{AddressRequest, ChangePasswordRequest, UpdateProfileRequest, UserProfile},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/perfil", get(get_profile).put(update_profile))
        .route("/perfil/password", put(change_password))
        .route(
            "/perfil/direcciones",
            post(add_address).delete(remove_address),
        )
}

#[utoipa::path(
    get,
    path = "/api/usuarios/perfil",
    responses(
        (status = 200, description = "Current user's profile", body = ApiResponse<UserProfile>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = user_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/usuarios/perfil",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = user_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/usuarios/perfil/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Wrong current password or weak new password"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = user_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/usuarios/perfil/direcciones",
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Saved addresses after the change", body = ApiResponse<Vec<String>>),
        (status = 409, description = "Address already saved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn add_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let resp = user_service::add_address(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/usuarios/perfil/direcciones",
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Saved addresses after the change", body = ApiResponse<Vec<String>>),
        (status = 404, description = "Address not saved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn remove_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let resp = user_service::remove_address(&state, &user, payload).await?;
    Ok(Json(resp))
}
