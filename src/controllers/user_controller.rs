use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::controllers::{parse_id, parse_optional_id};
use crate::dtos::{ApiResponse, LinkProfileRequestDto, UserPayload, UserResponseDto};
use crate::errors::problem::Problem;
use crate::middleware::authorization::AuthUser;
use crate::models::Role;
use crate::AppState;

pub async fn link_profile(
        AuthUser(auth_user): AuthUser,
        State(state): State<AppState>,
        Path(user_id): Path<String>,
        payload: Result<Json<LinkProfileRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<UserPayload>>, Problem> {
        let user_id = parse_id(&user_id, "user id")?;
        let Json(body) = payload?;
        let profile_id = parse_optional_id(body.profile_id.as_deref(), "profile id")?
                .ok_or(Problem::BadRequest("Profile ID is required".to_string()))?;

        let is_admin = auth_user.role.parse::<Role>().is_ok_and(|role| role == Role::Admin);
        if auth_user.id != user_id && !is_admin {
                return Err(Problem::Forbidden("Cannot link a profile to another account".to_string()));
        }

        let user = state.user_repository.link_profile(user_id, profile_id)?;

        Ok(Json(ApiResponse::new(
                "Profile linked successfully",
                UserPayload {
                        user: UserResponseDto::from(user),
                },
        )))
}
