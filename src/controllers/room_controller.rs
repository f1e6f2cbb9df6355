use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::controllers::{optional_text, parse_id, parse_ids, parse_optional_id, required_text};
use crate::dtos::{
        ApiResponse, AutoAssignPayload, AutoAssignmentDto, BulkSeatPayload, CatalogItemResponseDto, Empty,
        GroupSeatPayload, MemberRemovedPayload, MembersRemovedPayload, ProfileSummaryDto, RoomGroupsRequestDto,
        RoomMemberRequestDto, RoomMembersRequestDto, RoomPayload, RoomRequestDto, RoomResponseDto,
        RoomSummaryResponseDto, SeatPayload,
};
use crate::errors::problem::Problem;
use crate::models::{Room, RoomWithOccupancy};
use crate::AppState;

fn validate(body: RoomRequestDto) -> Result<(String, Option<String>, i32), Problem> {
        let name = required_text(body.name.as_deref(), "Room name and max capacity are required")?;
        let max_capacity = body
                .max_capacity
                .ok_or(Problem::BadRequest("Room name and max capacity are required".to_string()))?;
        if max_capacity < 0 {
                return Err(Problem::BadRequest("Max capacity must not be negative".to_string()));
        }

        Ok((name, optional_text(body.description.as_deref()), max_capacity))
}

pub async fn get_rooms(State(state): State<AppState>) -> Result<Json<Vec<RoomSummaryResponseDto>>, Problem> {
        let rooms = state.room_repository.find_all()?;

        Ok(Json(rooms.into_iter().map(RoomSummaryResponseDto::from).collect()))
}

pub async fn get_room(
        State(state): State<AppState>,
        Path(room_id): Path<String>,
) -> Result<Json<RoomResponseDto>, Problem> {
        let room_id = parse_id(&room_id, "room id")?;

        let room = state
                .room_repository
                .find_by_id(room_id)?
                .ok_or(Problem::NotFound("Room not found".to_string()))?;

        Ok(Json(RoomResponseDto::from(room)))
}

pub async fn create_room(
        State(state): State<AppState>,
        payload: Result<Json<RoomRequestDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<RoomPayload>>), Problem> {
        let Json(body) = payload?;
        let (name, description, max_capacity) = validate(body)?;

        let now = Utc::now().naive_utc();
        let room = state.room_repository.save(Room {
                id: state.id_generator.generate()?,
                created_at: now,
                updated_at: now,
                name,
                description,
                max_capacity,
        })?;

        Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(
                        "Room created successfully",
                        RoomPayload {
                                room: RoomSummaryResponseDto::from(RoomWithOccupancy { room, current_count: 0 }),
                        },
                )),
        ))
}

pub async fn update_room(
        State(state): State<AppState>,
        Path(room_id): Path<String>,
        payload: Result<Json<RoomRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<RoomPayload>>, Problem> {
        let room_id = parse_id(&room_id, "room id")?;
        let Json(body) = payload?;
        let (name, description, max_capacity) = validate(body)?;

        let room = state.room_repository.update(room_id, name, description, max_capacity)?;

        Ok(Json(ApiResponse::new(
                "Room updated successfully",
                RoomPayload {
                        room: RoomSummaryResponseDto::from(room),
                },
        )))
}

pub async fn delete_room(
        State(state): State<AppState>,
        Path(room_id): Path<String>,
) -> Result<Json<ApiResponse<Empty>>, Problem> {
        let room_id = parse_id(&room_id, "room id")?;

        state.room_repository.delete(room_id)?;

        Ok(Json(ApiResponse::ok("Room deleted successfully")))
}

pub async fn add_member(
        State(state): State<AppState>,
        Path(room_id): Path<String>,
        payload: Result<Json<RoomMemberRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<SeatPayload>>, Problem> {
        let room_id = parse_id(&room_id, "room id")?;
        let Json(body) = payload?;
        let profile_id = parse_optional_id(body.profile_id.as_deref(), "profile id")?
                .ok_or(Problem::BadRequest("Profile ID is required".to_string()))?;

        let (room, profile) = state.room_repository.add_member(room_id, profile_id)?;

        Ok(Json(ApiResponse::new(
                format!("{} added to {}", profile.full_name(), room.name),
                SeatPayload {
                        room_id: room.id.to_string(),
                        profile: ProfileSummaryDto::from(profile),
                },
        )))
}

pub async fn add_members(
        State(state): State<AppState>,
        Path(room_id): Path<String>,
        payload: Result<Json<RoomMembersRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<BulkSeatPayload>>, Problem> {
        let room_id = parse_id(&room_id, "room id")?;
        let Json(body) = payload?;
        if body.profile_ids.is_empty() {
                return Err(Problem::BadRequest("Profile IDs array is required".to_string()));
        }
        let profile_ids = parse_ids(&body.profile_ids, "profile id")?;

        let assignment = state.room_repository.add_members(room_id, &profile_ids)?;

        let added_count = assignment.admitted.len();
        let mut message = format!("{added_count} profile(s) added to {}", assignment.room.name);
        if assignment.skipped_count > 0 {
                message.push_str(&format!(", {} skipped", assignment.skipped_count));
        }

        Ok(Json(ApiResponse::new(
                message,
                BulkSeatPayload {
                        room_id: assignment.room.id.to_string(),
                        added: assignment.admitted.into_iter().map(ProfileSummaryDto::from).collect(),
                        added_count,
                        skipped_count: assignment.skipped_count,
                },
        )))
}

pub async fn remove_member(
        State(state): State<AppState>,
        Path((room_id, profile_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<MemberRemovedPayload>>, Problem> {
        let room_id = parse_id(&room_id, "room id")?;
        let profile_id = parse_id(&profile_id, "profile id")?;

        let group_removed = state.room_repository.remove_member(room_id, profile_id)?;

        let message = if group_removed {
                "Member removed; the group no longer has members in this room"
        } else {
                "Member removed successfully"
        };
        Ok(Json(ApiResponse::new(message, MemberRemovedPayload { group_removed })))
}

pub async fn assign_groups(
        State(state): State<AppState>,
        Path(room_id): Path<String>,
        payload: Result<Json<RoomGroupsRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<GroupSeatPayload>>, Problem> {
        let room_id = parse_id(&room_id, "room id")?;
        let Json(body) = payload?;
        if body.group_ids.is_empty() {
                return Err(Problem::BadRequest("Group IDs array is required".to_string()));
        }
        let group_ids = parse_ids(&body.group_ids, "group id")?;

        let assignment = state.room_repository.assign_groups(room_id, &group_ids)?;

        Ok(Json(ApiResponse::new(
                format!(
                        "{} group(s) assigned to {}, {} member(s) seated",
                        assignment.groups.len(),
                        assignment.room.name,
                        assignment.seated_count
                ),
                GroupSeatPayload {
                        room_id: assignment.room.id.to_string(),
                        assigned_groups: assignment.groups.into_iter().map(CatalogItemResponseDto::from).collect(),
                        members_seated: assignment.seated_count,
                },
        )))
}

pub async fn remove_group(
        State(state): State<AppState>,
        Path((room_id, group_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<MembersRemovedPayload>>, Problem> {
        let room_id = parse_id(&room_id, "room id")?;
        let group_id = parse_id(&group_id, "group id")?;

        let members_removed = state.room_repository.remove_group(room_id, group_id)?;

        Ok(Json(ApiResponse::new(
                format!("Group removed from room, {members_removed} member(s) unseated"),
                MembersRemovedPayload { members_removed },
        )))
}

pub async fn auto_assign(State(state): State<AppState>) -> Result<Json<ApiResponse<AutoAssignPayload>>, Problem> {
        let outcome = state.room_repository.auto_assign()?;

        let assigned_count = outcome.assigned.len();
        let message = match (assigned_count, outcome.unassigned_remaining) {
                (0, 0) => "Every profile already has a room".to_string(),
                (0, remaining) => format!("No room has free capacity; {remaining} profile(s) remain unassigned"),
                (assigned, 0) => format!("{assigned} profile(s) assigned"),
                (assigned, remaining) => format!("{assigned} profile(s) assigned, {remaining} remain unassigned"),
        };

        Ok(Json(ApiResponse::new(
                message,
                AutoAssignPayload {
                        assignments: outcome.assigned.into_iter().map(AutoAssignmentDto::from).collect(),
                        assigned_count,
                        unassigned_remaining: outcome.unassigned_remaining,
                },
        )))
}
