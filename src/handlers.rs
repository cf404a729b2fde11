use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    error::AppError,
    models::{
        DashboardView, DeleteProfileRequest, LoginRequest, NewUser, ProfileChanges,
        RegisterUserRequest, Role, TokenResponse, UpdateProfileRequest, UserProfile, WelcomeView,
        normalize_email,
    },
};
use axum::{Json, extract::State, http::StatusCode};

// --- Input Validation ---

const MIN_PASSWORD_LEN: usize = 8;

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.len() > 255 {
        return Err(AppError::Validation("name must be 1-255 characters".into()));
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    let valid = email.len() <= 255
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::Validation("email must be a valid address".into()));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn token_response(user_id: uuid::Uuid, state: &AppState) -> Result<TokenResponse, AppError> {
    let (access_token, expires_in) = issue_token(user_id, &state.config)?;
    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".into(),
        expires_in,
    })
}

// --- Public Handlers ---

/// welcome
///
/// [Public Route] Landing payload.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome", body = WelcomeView))
)]
pub async fn welcome() -> Json<WelcomeView> {
    Json(WelcomeView {
        view: "welcome".into(),
        app: env!("CARGO_PKG_NAME").into(),
    })
}

/// register_user
///
/// [Public Route] Creates an account and signs it in. The role is always
/// `Role::User`; clients cannot pick one.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = TokenResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let name = validate_name(&payload.name)?;
    let email = validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    let password_hash = state.credentials.hash(&payload.password)?;
    let user = state
        .repo
        .create_user(NewUser {
            name,
            email,
            password_hash,
            role: Role::User,
            email_verified_at: None,
        })
        .await?;

    tracing::info!(user_id = %user.id, "registered new account");
    Ok((StatusCode::CREATED, Json(token_response(user.id, &state)?)))
}

/// login
///
/// [Public Route] Exchanges email and password for a bearer token. Unknown email and
/// wrong password produce the same 401.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let email = normalize_email(&payload.email);
    let Some(user) = state.repo.find_user_by_email(&email).await? else {
        // Spend the same verification work as a wrong password.
        let _ = state
            .credentials
            .verify(&payload.password, &state.credentials.decoy_hash());
        tracing::debug!("login rejected: unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !state.credentials.verify(&payload.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    Ok(Json(token_response(user.id, &state)?))
}

// --- Authenticated Handlers ---

/// dashboard
///
/// [Verified Route] Generic dashboard for any signed-in user with a confirmed email.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Email not verified")
    )
)]
pub async fn dashboard(user: AuthUser) -> Json<DashboardView> {
    Json(DashboardView {
        view: "dashboard".into(),
        user_id: user.id,
        email: user.email,
        role: user.role.ok(),
    })
}

/// edit_profile
///
/// [Authenticated Route] Returns the caller's own profile.
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn edit_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state.repo.get_user(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(user.into()))
}

/// update_profile
///
/// [Authenticated Route] Changes name and/or email. A new email has to be verified
/// again. The role is not part of the payload and cannot change here.
#[utoipa::path(
    patch,
    path = "/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn update_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let changes = ProfileChanges {
        name: payload.name.as_deref().map(validate_name).transpose()?,
        email: payload.email.as_deref().map(validate_email).transpose()?,
    };
    let user = state.repo.update_profile(id, changes).await?;
    Ok(Json(user.into()))
}

/// destroy_profile
///
/// [Authenticated Route] Deletes the caller's account after confirming the current
/// password. Outstanding tokens stop resolving because the subject is gone.
#[utoipa::path(
    delete,
    path = "/profile",
    request_body = DeleteProfileRequest,
    responses(
        (status = 204, description = "Deleted"),
        (status = 422, description = "Password confirmation failed")
    )
)]
pub async fn destroy_profile(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeleteProfileRequest>,
) -> Result<StatusCode, AppError> {
    let user = state.repo.get_user(id).await?.ok_or(AppError::NotFound)?;
    if !state.credentials.verify(&payload.password, &user.password_hash)? {
        return Err(AppError::Validation("the provided password is incorrect".into()));
    }

    if state.repo.delete_user(id).await? {
        tracing::info!(user_id = %id, "account deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// --- Role Dashboards ---
// Only reachable through the role gate of their group, so the role is known here.

fn role_dashboard(role: Role, user: AuthUser) -> Json<DashboardView> {
    Json(DashboardView {
        view: format!("{role}.dashboard"),
        user_id: user.id,
        email: user.email,
        role: Some(role),
    })
}

/// admin_dashboard
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Admin dashboard", body = DashboardView),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn admin_dashboard(user: AuthUser) -> Json<DashboardView> {
    role_dashboard(Role::Admin, user)
}

/// manager_dashboard
#[utoipa::path(
    get,
    path = "/manager/dashboard",
    responses(
        (status = 200, description = "Manager dashboard", body = DashboardView),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not a manager")
    )
)]
pub async fn manager_dashboard(user: AuthUser) -> Json<DashboardView> {
    role_dashboard(Role::Manager, user)
}

/// user_dashboard
#[utoipa::path(
    get,
    path = "/user/dashboard",
    responses(
        (status = 200, description = "User dashboard", body = DashboardView),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not a regular user")
    )
)]
pub async fn user_dashboard(user: AuthUser) -> Json<DashboardView> {
    role_dashboard(Role::User, user)
}
