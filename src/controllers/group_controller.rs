use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::controllers::{optional_text, parse_id, parse_ids, required_text};
use crate::dtos::{
        ApiResponse, CatalogItemResponseDto, Empty, GroupPayload, GroupRequestDto, GroupResponseDto,
        GroupSummaryResponseDto,
};
use crate::errors::problem::Problem;
use crate::models::Group;
use crate::AppState;

struct GroupInput {
        name: String,
        description: Option<String>,
        subject_ids: Vec<i64>,
        profile_ids: Vec<i64>,
}

fn validate(body: GroupRequestDto) -> Result<GroupInput, Problem> {
        let name = required_text(body.name.as_deref(), "Group name is required")?;
        if body.subject_ids.is_empty() {
                return Err(Problem::BadRequest("At least one subject is required".to_string()));
        }

        Ok(GroupInput {
                name,
                description: optional_text(body.description.as_deref()),
                subject_ids: parse_ids(&body.subject_ids, "subject id")?,
                profile_ids: parse_ids(&body.profile_ids, "profile id")?,
        })
}

pub async fn get_groups(State(state): State<AppState>) -> Result<Json<Vec<GroupSummaryResponseDto>>, Problem> {
        let groups = state.group_repository.find_all()?;

        Ok(Json(groups.into_iter().map(GroupSummaryResponseDto::from).collect()))
}

pub async fn get_group(
        State(state): State<AppState>,
        Path(group_id): Path<String>,
) -> Result<Json<GroupResponseDto>, Problem> {
        let group_id = parse_id(&group_id, "group id")?;

        let group = state
                .group_repository
                .find_by_id(group_id)?
                .ok_or(Problem::NotFound("Group not found".to_string()))?;

        Ok(Json(GroupResponseDto::from(group)))
}

pub async fn get_group_subjects(
        State(state): State<AppState>,
        Path(group_id): Path<String>,
) -> Result<Json<Vec<CatalogItemResponseDto>>, Problem> {
        let group_id = parse_id(&group_id, "group id")?;

        let subjects = state.group_repository.find_subjects(group_id)?;

        Ok(Json(subjects.into_iter().map(CatalogItemResponseDto::from).collect()))
}

pub async fn create_group(
        State(state): State<AppState>,
        payload: Result<Json<GroupRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<GroupPayload>>), Problem> {
        let Json(body) = payload?;
        let input = validate(body)?;

        let now = Utc::now().naive_utc();
        let group = state.group_repository.create(
                Group {
                        id: state.id_generator.generate()?,
                        created_at: now,
                        updated_at: now,
                        name: input.name,
                        description: input.description,
                },
                &input.subject_ids,
                &input.profile_ids,
        )?;

        Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(
                        "Group created successfully",
                        GroupPayload {
                                group: CatalogItemResponseDto::from(group),
                        },
                )),
        ))
}

pub async fn update_group(
        State(state): State<AppState>,
        Path(group_id): Path<String>,
        payload: Result<Json<GroupRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<GroupPayload>>, Problem> {
        let group_id = parse_id(&group_id, "group id")?;
        let Json(body) = payload?;
        let input = validate(body)?;

        let group = state.group_repository.update(
                group_id,
                input.name,
                input.description,
                &input.subject_ids,
                &input.profile_ids,
        )?;

        Ok(Json(ApiResponse::new(
                "Group updated successfully",
                GroupPayload {
                        group: CatalogItemResponseDto::from(group),
                },
        )))
}

pub async fn delete_group(
        State(state): State<AppState>,
        Path(group_id): Path<String>,
) -> Result<Json<ApiResponse<Empty>>, Problem> {
        let group_id = parse_id(&group_id, "group id")?;

        state.group_repository.delete(group_id)?;

        Ok(Json(ApiResponse::ok("Group deleted successfully")))
}
