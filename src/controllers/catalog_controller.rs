use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::controllers::required_text;
use crate::dtos::{ApiResponse, CatalogItemResponseDto, NamedRequestDto, ProfessionPayload, SubjectPayload};
use crate::errors::problem::Problem;
use crate::models::{Profession, Subject};
use crate::AppState;

pub async fn get_professions(State(state): State<AppState>) -> Result<Json<Vec<CatalogItemResponseDto>>, Problem> {
        let professions = state.catalog_repository.find_professions()?;

        Ok(Json(professions.into_iter().map(CatalogItemResponseDto::from).collect()))
}

pub async fn create_profession(
        State(state): State<AppState>,
        payload: Result<Json<NamedRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ProfessionPayload>>), Problem> {
        let Json(body) = payload?;
        let name = required_text(body.name.as_deref(), "Profession name is required")?;

        let profession = state.catalog_repository.save_profession(Profession {
                id: state.id_generator.generate()?,
                name,
        })?;

        Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(
                        "Profession created successfully",
                        ProfessionPayload {
                                profession: CatalogItemResponseDto::from(profession),
                        },
                )),
        ))
}

pub async fn get_subjects(State(state): State<AppState>) -> Result<Json<Vec<CatalogItemResponseDto>>, Problem> {
        let subjects = state.catalog_repository.find_subjects()?;

        Ok(Json(subjects.into_iter().map(CatalogItemResponseDto::from).collect()))
}

pub async fn create_subject(
        State(state): State<AppState>,
        payload: Result<Json<NamedRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<SubjectPayload>>), Problem> {
        let Json(body) = payload?;
        let name = required_text(body.name.as_deref(), "Subject name is required")?;

        let subject = state.catalog_repository.save_subject(Subject {
                id: state.id_generator.generate()?,
                name,
        })?;

        Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(
                        "Subject created successfully",
                        SubjectPayload {
                                subject: CatalogItemResponseDto::from(subject),
                        },
                )),
        ))
}
