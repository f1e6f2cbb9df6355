use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;

use crate::controllers::{optional_text, parse_id, parse_optional_id, required_text};
use crate::dtos::{
        ApiResponse, AvatarPayload, CatalogItemResponseDto, Empty, GroupChangeRequestDto, GroupPayload,
        ProfilePayload, ProfileRequestDto, ProfileResponseDto, ProfileSummaryDto,
};
use crate::errors::problem::Problem;
use crate::models::Profile;
use crate::AppState;

const DEFAULT_AGE: i32 = 18;
const AVATAR_FIELD: &str = "avatar";

struct ProfileInput {
        first_name: String,
        last_name: String,
        age: i32,
        message: Option<String>,
        professions: Vec<String>,
}

fn validate(body: ProfileRequestDto) -> Result<ProfileInput, Problem> {
        let first_name = required_text(body.first_name.as_deref(), "First name and last name are required")?;
        let last_name = required_text(body.last_name.as_deref(), "First name and last name are required")?;

        let age = body.age.unwrap_or(DEFAULT_AGE);
        if age < 0 {
                return Err(Problem::BadRequest("Age must not be negative".to_string()));
        }

        Ok(ProfileInput {
                first_name,
                last_name,
                age,
                message: optional_text(body.message.as_deref()),
                professions: body.professions,
        })
}

pub async fn get_profiles(State(state): State<AppState>) -> Result<Json<Vec<ProfileResponseDto>>, Problem> {
        let profiles = state.profile_repository.find_all()?;

        Ok(Json(profiles.into_iter().map(ProfileResponseDto::from).collect()))
}

pub async fn get_profile(
        State(state): State<AppState>,
        Path(profile_id): Path<String>,
) -> Result<Json<ProfileResponseDto>, Problem> {
        let profile_id = parse_id(&profile_id, "profile id")?;

        let profile = state
                .profile_repository
                .find_by_id(profile_id)?
                .ok_or(Problem::NotFound("Profile not found".to_string()))?;

        Ok(Json(ProfileResponseDto::from(profile)))
}

pub async fn get_profiles_without_group(
        State(state): State<AppState>,
) -> Result<Json<Vec<ProfileSummaryDto>>, Problem> {
        let profiles = state.profile_repository.find_without_group()?;

        Ok(Json(profiles.into_iter().map(ProfileSummaryDto::from).collect()))
}

pub async fn get_unseated_profiles(State(state): State<AppState>) -> Result<Json<Vec<ProfileSummaryDto>>, Problem> {
        let profiles = state.profile_repository.find_unseated()?;

        Ok(Json(profiles.into_iter().map(ProfileSummaryDto::from).collect()))
}

pub async fn get_profiles_available_for_group(
        State(state): State<AppState>,
        Path(group_id): Path<String>,
) -> Result<Json<Vec<ProfileSummaryDto>>, Problem> {
        let group_id = parse_id(&group_id, "group id")?;

        let profiles = state.profile_repository.find_available_for_group(group_id)?;

        Ok(Json(profiles.into_iter().map(ProfileSummaryDto::from).collect()))
}

pub async fn create_profile(
        State(state): State<AppState>,
        payload: Result<Json<ProfileRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ProfilePayload>>), Problem> {
        let Json(body) = payload?;
        let input = validate(body)?;

        let now = Utc::now().naive_utc();
        let profile = state.profile_repository.create(
                Profile {
                        id: state.id_generator.generate()?,
                        created_at: now,
                        updated_at: now,
                        first_name: input.first_name,
                        last_name: input.last_name,
                        age: input.age,
                        message: input.message,
                        avatar_url: None,
                },
                &input.professions,
        )?;

        info!("created profile {}", profile.profile.id);
        Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(
                        "Profile created successfully",
                        ProfilePayload {
                                profile: ProfileResponseDto::from(profile),
                        },
                )),
        ))
}

pub async fn update_profile(
        State(state): State<AppState>,
        Path(profile_id): Path<String>,
        payload: Result<Json<ProfileRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<ProfilePayload>>, Problem> {
        let profile_id = parse_id(&profile_id, "profile id")?;
        let Json(body) = payload?;
        let input = validate(body)?;

        let profile = state.profile_repository.update(
                profile_id,
                input.first_name,
                input.last_name,
                input.age,
                input.message,
                &input.professions,
        )?;

        Ok(Json(ApiResponse::new(
                "Profile updated successfully",
                ProfilePayload {
                        profile: ProfileResponseDto::from(profile),
                },
        )))
}

pub async fn delete_profile(
        State(state): State<AppState>,
        Path(profile_id): Path<String>,
) -> Result<Json<ApiResponse<Empty>>, Problem> {
        let profile_id = parse_id(&profile_id, "profile id")?;

        let profile = state.profile_repository.delete(profile_id)?;
        if let Some(avatar_url) = profile.avatar_url {
                state.avatar_storage_service.remove(&avatar_url).await;
        }

        info!("deleted profile {profile_id}");
        Ok(Json(ApiResponse::ok("Profile deleted successfully")))
}

pub async fn change_group(
        State(state): State<AppState>,
        Path(profile_id): Path<String>,
        payload: Result<Json<GroupChangeRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<GroupPayload>>, Problem> {
        let profile_id = parse_id(&profile_id, "profile id")?;
        let Json(body) = payload?;
        let group_id = parse_optional_id(body.target_group_id.as_deref(), "group id")?
                .ok_or(Problem::BadRequest("Target group ID is required".to_string()))?;

        let group = state.group_repository.reassign_profile(profile_id, group_id)?;

        Ok(Json(ApiResponse::new(
                format!("Profile moved to group {}", group.name),
                GroupPayload {
                        group: CatalogItemResponseDto::from(group),
                },
        )))
}

pub async fn upload_avatar(
        State(state): State<AppState>,
        Path(profile_id): Path<String>,
        multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<AvatarPayload>>, Problem> {
        let profile_id = parse_id(&profile_id, "profile id")?;
        let mut multipart = multipart?;

        let mut upload = None;
        while let Some(field) = multipart.next_field().await? {
                if field.name() != Some(AVATAR_FIELD) {
                        continue;
                }
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                upload = Some((content_type, bytes));
                break;
        }
        let (content_type, bytes) = upload.ok_or(Problem::BadRequest("No file uploaded".to_string()))?;

        if !state.profile_repository.exists(profile_id)? {
                return Err(Problem::NotFound("Profile not found".to_string()));
        }

        let avatar_url = state
                .avatar_storage_service
                .store(profile_id, state.id_generator.generate()?, content_type.as_deref(), &bytes)
                .await?;

        let previous = match state.profile_repository.set_avatar_url(profile_id, Some(avatar_url.clone())) {
                Ok(previous) => previous,
                Err(err) => {
                        state.avatar_storage_service.remove(&avatar_url).await;
                        return Err(err);
                }
        };
        if let Some(previous) = previous.filter(|previous| *previous != avatar_url) {
                state.avatar_storage_service.remove(&previous).await;
        }

        info!("stored avatar for profile {profile_id}");
        Ok(Json(ApiResponse::new(
                "Avatar uploaded successfully",
                AvatarPayload {
                        avatar_url: Some(avatar_url),
                },
        )))
}

pub async fn remove_avatar(
        State(state): State<AppState>,
        Path(profile_id): Path<String>,
) -> Result<Json<ApiResponse<AvatarPayload>>, Problem> {
        let profile_id = parse_id(&profile_id, "profile id")?;

        if let Some(previous) = state.profile_repository.set_avatar_url(profile_id, None)? {
                state.avatar_storage_service.remove(&previous).await;
        }

        Ok(Json(ApiResponse::new("Avatar removed successfully", AvatarPayload { avatar_url: None })))
}

#[cfg(test)]
mod tests {
        use super::*;

        fn body(first_name: Option<&str>, age: Option<i32>) -> ProfileRequestDto {
                ProfileRequestDto {
                        first_name: first_name.map(str::to_string),
                        last_name: Some("Lovelace".to_string()),
                        age,
                        message: Some("   ".to_string()),
                        professions: vec!["Engineer".to_string()],
                }
        }

        #[test]
        fn age_defaults_to_eighteen() {
                let input = validate(body(Some("Ada"), None)).unwrap();

                assert_eq!(input.age, DEFAULT_AGE);
                assert_eq!(input.message, None);
        }

        #[test]
        fn first_name_is_required() {
                assert!(matches!(validate(body(None, Some(30))), Err(Problem::BadRequest(_))));
                assert!(matches!(validate(body(Some(" "), Some(30))), Err(Problem::BadRequest(_))));
        }

        #[test]
        fn negative_age_is_rejected() {
                assert!(validate(body(Some("Ada"), Some(-1))).is_err());
        }
}
