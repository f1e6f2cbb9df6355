use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;

use crate::authorization::{hash_password, issue_token, verify_password, MIN_PASSWORD_LENGTH};
use crate::controllers::required_text;
use crate::dtos::{ApiResponse, AuthResponseDto, LoginRequestDto, RegisterRequestDto, UserResponseDto};
use crate::errors::problem::Problem;
use crate::middleware::authorization::AuthUser;
use crate::models::{Role, User};
use crate::AppState;

fn auth_response(state: &AppState, user: User) -> Result<AuthResponseDto, Problem> {
        let token = issue_token(&user, &state.config.jwt_secret, state.config.token_ttl_seconds)?;
        let redirect_url = user.role.parse::<Role>().unwrap_or(Role::User).redirect_url().to_string();

        Ok(AuthResponseDto {
                user: UserResponseDto::from(user),
                token,
                redirect_url,
        })
}

pub async fn register(
        State(state): State<AppState>,
        payload: Result<Json<RegisterRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponseDto>>), Problem> {
        let Json(body) = payload?;

        let email = required_text(body.email.as_deref(), "Email and password are required")?.to_lowercase();
        let password = body
                .password
                .filter(|p| !p.is_empty())
                .ok_or(Problem::BadRequest("Email and password are required".to_string()))?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
                return Err(Problem::BadRequest(format!(
                        "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
                )));
        }

        if state.user_repository.exists_by_email(&email)? {
                return Err(Problem::Conflict("User with this email already exists".to_string()));
        }

        let now = Utc::now().naive_utc();
        let user = state.user_repository.save(User {
                id: state.id_generator.generate()?,
                created_at: now,
                updated_at: now,
                email,
                password_hash: hash_password(&password)?,
                // Self-registration only creates plain users; admins are promoted out of band.
                role: Role::User.as_str().to_string(),
                is_active: true,
                last_login: None,
                profile_id: None,
        })?;

        info!("registered user {}", user.id);
        Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new("Registration successful", auth_response(&state, user)?)),
        ))
}

pub async fn login(
        State(state): State<AppState>,
        payload: Result<Json<LoginRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthResponseDto>>, Problem> {
        let Json(body) = payload?;

        let (Some(email), Some(password)) = (
                body.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
                body.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
                return Err(Problem::BadRequest("Email and password are required".to_string()));
        };

        let invalid = || Problem::Unauthorized("Invalid email or password".to_string());

        let user = state.user_repository.find_by_email(email)?.ok_or_else(invalid)?;
        if !user.is_active {
                return Err(Problem::Unauthorized("Account is deactivated".to_string()));
        }
        if !verify_password(password, &user.password_hash)? {
                return Err(invalid());
        }

        let user = state.user_repository.record_login(user.id)?;

        info!("user {} logged in", user.id);
        Ok(Json(ApiResponse::new("Login successful", auth_response(&state, user)?)))
}

pub async fn get_auth_user(AuthUser(user): AuthUser) -> Json<UserResponseDto> {
        Json(UserResponseDto::from(user))
}
