use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;

use crate::controllers::{optional_text, parse_id, parse_optional_id, required_text};
use crate::dtos::{
        AffectedPayload, ApiResponse, Empty, GroupJoinRequestDto, NotificationCountResponseDto, NotificationPayload,
        NotificationRequestDto, NotificationResponseDto, ResolveRequestDto,
};
use crate::errors::problem::Problem;
use crate::models::{Notification, NotificationKind, Priority, Resolution};
use crate::AppState;

const GROUP_REQUEST_TITLE: &str = "Group Join Request";

fn parse_action(action: Option<&str>) -> Result<Resolution, Problem> {
        match action.map(str::trim) {
                Some("approve") => Ok(Resolution::Approved),
                Some("deny") => Ok(Resolution::Denied),
                _ => Err(Problem::BadRequest("Action must be approve or deny".to_string())),
        }
}

fn notification_payload(notification: Notification) -> NotificationPayload {
        NotificationPayload {
                notification: NotificationResponseDto::from(notification),
        }
}

pub async fn get_notifications(
        State(state): State<AppState>,
) -> Result<Json<Vec<NotificationResponseDto>>, Problem> {
        let notifications = state.notification_repository.find_all()?;

        Ok(Json(notifications.into_iter().map(NotificationResponseDto::from).collect()))
}

pub async fn get_notification_count(
        State(state): State<AppState>,
) -> Result<Json<NotificationCountResponseDto>, Problem> {
        let counts = state.notification_repository.counts()?;

        Ok(Json(NotificationCountResponseDto::from(counts)))
}

pub async fn create_notification(
        State(state): State<AppState>,
        payload: Result<Json<NotificationRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationPayload>>), Problem> {
        let Json(body) = payload?;
        let title = required_text(body.title.as_deref(), "Title and message are required")?;
        let message = required_text(body.message.as_deref(), "Title and message are required")?;

        let now = Utc::now().naive_utc();
        let notification = state.notification_repository.save(Notification {
                id: state.id_generator.generate()?,
                created_at: now,
                updated_at: now,
                kind: body.kind.unwrap_or(NotificationKind::General).as_str().to_string(),
                title,
                message,
                priority: body.priority.unwrap_or(Priority::Normal).as_str().to_string(),
                profile_id: parse_optional_id(body.profile_id.as_deref(), "profile id")?,
                group_id: parse_optional_id(body.group_id.as_deref(), "group id")?,
                room_id: parse_optional_id(body.room_id.as_deref(), "room id")?,
                read_status: false,
                resolved: false,
                resolution: None,
                resolved_at: None,
        })?;

        Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new("Notification created successfully", notification_payload(notification))),
        ))
}

pub async fn create_group_request(
        State(state): State<AppState>,
        payload: Result<Json<GroupJoinRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationPayload>>), Problem> {
        let Json(body) = payload?;
        let (Some(profile_id), Some(group_id)) = (
                parse_optional_id(body.profile_id.as_deref(), "profile id")?,
                parse_optional_id(body.group_id.as_deref(), "group id")?,
        ) else {
                return Err(Problem::BadRequest("Profile ID and Group ID are required".to_string()));
        };

        let now = Utc::now().naive_utc();
        let notification = state.notification_repository.save_group_request(Notification {
                id: state.id_generator.generate()?,
                created_at: now,
                updated_at: now,
                kind: NotificationKind::GroupRequest.as_str().to_string(),
                title: GROUP_REQUEST_TITLE.to_string(),
                message: optional_text(body.message.as_deref()).unwrap_or_default(),
                priority: Priority::Normal.as_str().to_string(),
                profile_id: Some(profile_id),
                group_id: Some(group_id),
                room_id: None,
                read_status: false,
                resolved: false,
                resolution: None,
                resolved_at: None,
        })?;

        info!("profile {profile_id} requested to join group {group_id}");
        Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(
                        "Group join request submitted successfully",
                        notification_payload(notification),
                )),
        ))
}

pub async fn mark_read(
        State(state): State<AppState>,
        Path(notification_id): Path<String>,
) -> Result<Json<ApiResponse<NotificationPayload>>, Problem> {
        let notification_id = parse_id(&notification_id, "notification id")?;

        let notification = state.notification_repository.mark_read(notification_id)?;

        Ok(Json(ApiResponse::new("Notification marked as read", notification_payload(notification))))
}

pub async fn mark_all_read(State(state): State<AppState>) -> Result<Json<ApiResponse<AffectedPayload>>, Problem> {
        let affected = state.notification_repository.mark_all_read()?;

        Ok(Json(ApiResponse::new(
                "All notifications marked as read",
                AffectedPayload { affected },
        )))
}

pub async fn resolve_notification(
        State(state): State<AppState>,
        Path(notification_id): Path<String>,
        payload: Result<Json<ResolveRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<NotificationPayload>>, Problem> {
        let notification_id = parse_id(&notification_id, "notification id")?;
        let Json(body) = payload?;
        let resolution = parse_action(body.action.as_deref())?;

        let notification = state.notification_repository.resolve(notification_id, resolution)?;

        let message = match resolution {
                Resolution::Approved => "Request approved successfully",
                Resolution::Denied => "Request denied successfully",
        };
        Ok(Json(ApiResponse::new(message, notification_payload(notification))))
}

pub async fn delete_notification(
        State(state): State<AppState>,
        Path(notification_id): Path<String>,
) -> Result<Json<ApiResponse<Empty>>, Problem> {
        let notification_id = parse_id(&notification_id, "notification id")?;

        state.notification_repository.delete(notification_id)?;

        Ok(Json(ApiResponse::ok("Notification deleted successfully")))
}

pub async fn delete_notifications(
        State(state): State<AppState>,
) -> Result<Json<ApiResponse<AffectedPayload>>, Problem> {
        let affected = state.notification_repository.delete_all()?;

        Ok(Json(ApiResponse::new("All notifications cleared", AffectedPayload { affected })))
}

#[cfg(test)]
mod tests {
        use super::*;

        #[test]
        fn parses_resolution_actions() {
                assert_eq!(parse_action(Some("approve")).unwrap(), Resolution::Approved);
                assert_eq!(parse_action(Some("deny")).unwrap(), Resolution::Denied);
                assert!(parse_action(Some("maybe")).is_err());
                assert!(parse_action(None).is_err());
        }
}
