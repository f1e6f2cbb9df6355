use serde::{Deserialize, Serialize};

use crate::models::{
        AssignedGroup, Group, GroupWithMemberCount, GroupWithRelationships, Notification, NotificationCounts,
        NotificationKind, NotificationWithRelationships, Priority, Profession, Profile, ProfileWithRelationships, Room,
        RoomWithOccupancy, RoomWithRelationships, SeatedProfile, Subject, User,
};

/// Mutation envelope: `{success, message, ...payload}`.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T: Serialize> {
        pub success: bool,
        pub message: String,
        #[serde(flatten)]
        pub payload: T,
}

impl<T: Serialize> ApiResponse<T> {
        pub fn new(message: impl Into<String>, payload: T) -> Self {
                Self {
                        success: true,
                        message: message.into(),
                        payload,
                }
        }
}

impl ApiResponse<Empty> {
        pub fn ok(message: impl Into<String>) -> Self {
                Self::new(message, Empty {})
        }
}

#[derive(Serialize, Debug)]
pub struct Empty {}

// Requests. Required fields are optional here so a missing field is reported as a 400 with a
// readable message rather than a deserialization failure.

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequestDto {
        pub email: Option<String>,
        pub password: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequestDto {
        pub email: Option<String>,
        pub password: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LinkProfileRequestDto {
        pub profile_id: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequestDto {
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub age: Option<i32>,
        pub message: Option<String>,
        #[serde(default)]
        pub professions: Vec<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupChangeRequestDto {
        pub target_group_id: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NamedRequestDto {
        pub name: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequestDto {
        pub name: Option<String>,
        pub description: Option<String>,
        #[serde(default)]
        pub subject_ids: Vec<String>,
        #[serde(default)]
        pub profile_ids: Vec<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequestDto {
        pub name: Option<String>,
        pub description: Option<String>,
        pub max_capacity: Option<i32>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberRequestDto {
        pub profile_id: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomMembersRequestDto {
        #[serde(default)]
        pub profile_ids: Vec<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomGroupsRequestDto {
        #[serde(default)]
        pub group_ids: Vec<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequestDto {
        #[serde(rename = "type")]
        pub kind: Option<NotificationKind>,
        pub title: Option<String>,
        pub message: Option<String>,
        pub priority: Option<Priority>,
        pub profile_id: Option<String>,
        pub group_id: Option<String>,
        pub room_id: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupJoinRequestDto {
        pub profile_id: Option<String>,
        pub group_id: Option<String>,
        pub message: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequestDto {
        pub action: Option<String>,
}

// Responses.

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponseDto {
        pub id: String,
        pub created_at: chrono::NaiveDateTime,
        pub email: String,
        pub role: String,
        pub is_active: bool,
        pub last_login: Option<chrono::NaiveDateTime>,
        pub profile_id: Option<String>,
}

impl From<User> for UserResponseDto {
        fn from(user: User) -> Self {
                UserResponseDto {
                        id: user.id.to_string(),
                        created_at: user.created_at,
                        email: user.email,
                        role: user.role,
                        is_active: user.is_active,
                        last_login: user.last_login,
                        profile_id: user.profile_id.map(|id| id.to_string()),
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponseDto {
        pub user: UserResponseDto,
        pub token: String,
        pub redirect_url: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
        pub user: UserResponseDto,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummaryDto {
        pub id: String,
        pub first_name: String,
        pub last_name: String,
        pub age: i32,
        pub avatar_url: Option<String>,
}

impl From<Profile> for ProfileSummaryDto {
        fn from(profile: Profile) -> Self {
                ProfileSummaryDto {
                        id: profile.id.to_string(),
                        first_name: profile.first_name,
                        last_name: profile.last_name,
                        age: profile.age,
                        avatar_url: profile.avatar_url,
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponseDto {
        pub id: String,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub first_name: String,
        pub last_name: String,
        pub age: i32,
        pub message: Option<String>,
        pub avatar_url: Option<String>,
        pub professions: Vec<String>,
        pub group_id: Option<String>,
        pub group_name: Option<String>,
        pub room_id: Option<String>,
        pub room_name: Option<String>,
}

impl From<ProfileWithRelationships> for ProfileResponseDto {
        fn from(value: ProfileWithRelationships) -> Self {
                let ProfileWithRelationships {
                        profile,
                        professions,
                        group,
                        room,
                } = value;

                ProfileResponseDto {
                        id: profile.id.to_string(),
                        created_at: profile.created_at,
                        updated_at: profile.updated_at,
                        first_name: profile.first_name,
                        last_name: profile.last_name,
                        age: profile.age,
                        message: profile.message,
                        avatar_url: profile.avatar_url,
                        professions,
                        group_id: group.as_ref().map(|g| g.id.to_string()),
                        group_name: group.map(|g| g.name),
                        room_id: room.as_ref().map(|r| r.id.to_string()),
                        room_name: room.map(|r| r.name),
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
        pub profile: ProfileResponseDto,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AvatarPayload {
        pub avatar_url: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemResponseDto {
        pub id: String,
        pub name: String,
}

impl From<Profession> for CatalogItemResponseDto {
        fn from(profession: Profession) -> Self {
                CatalogItemResponseDto {
                        id: profession.id.to_string(),
                        name: profession.name,
                }
        }
}

impl From<Subject> for CatalogItemResponseDto {
        fn from(subject: Subject) -> Self {
                CatalogItemResponseDto {
                        id: subject.id.to_string(),
                        name: subject.name,
                }
        }
}

impl From<Group> for CatalogItemResponseDto {
        fn from(group: Group) -> Self {
                CatalogItemResponseDto {
                        id: group.id.to_string(),
                        name: group.name,
                }
        }
}

impl From<Room> for CatalogItemResponseDto {
        fn from(room: Room) -> Self {
                CatalogItemResponseDto {
                        id: room.id.to_string(),
                        name: room.name,
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionPayload {
        pub profession: CatalogItemResponseDto,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPayload {
        pub subject: CatalogItemResponseDto,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummaryResponseDto {
        pub id: String,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub name: String,
        pub description: Option<String>,
        pub member_count: i64,
}

impl From<GroupWithMemberCount> for GroupSummaryResponseDto {
        fn from(value: GroupWithMemberCount) -> Self {
                GroupSummaryResponseDto {
                        id: value.group.id.to_string(),
                        created_at: value.group.created_at,
                        updated_at: value.group.updated_at,
                        name: value.group.name,
                        description: value.group.description,
                        member_count: value.member_count,
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponseDto {
        pub id: String,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub name: String,
        pub description: Option<String>,
        pub members: Vec<ProfileSummaryDto>,
        pub subjects: Vec<CatalogItemResponseDto>,
        pub assigned_room: Option<CatalogItemResponseDto>,
}

impl From<GroupWithRelationships> for GroupResponseDto {
        fn from(value: GroupWithRelationships) -> Self {
                GroupResponseDto {
                        id: value.group.id.to_string(),
                        created_at: value.group.created_at,
                        updated_at: value.group.updated_at,
                        name: value.group.name,
                        description: value.group.description,
                        members: value.members.into_iter().map(ProfileSummaryDto::from).collect(),
                        subjects: value.subjects.into_iter().map(CatalogItemResponseDto::from).collect(),
                        assigned_room: value.assigned_room.map(CatalogItemResponseDto::from),
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
        pub group: CatalogItemResponseDto,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryResponseDto {
        pub id: String,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub name: String,
        pub description: Option<String>,
        pub max_capacity: i32,
        pub current_count: i64,
        pub available_spots: i64,
}

impl From<RoomWithOccupancy> for RoomSummaryResponseDto {
        fn from(value: RoomWithOccupancy) -> Self {
                let available_spots = value.available_spots();

                RoomSummaryResponseDto {
                        id: value.room.id.to_string(),
                        created_at: value.room.created_at,
                        updated_at: value.room.updated_at,
                        name: value.room.name,
                        description: value.room.description,
                        max_capacity: value.room.max_capacity,
                        current_count: value.current_count,
                        available_spots,
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberResponseDto {
        #[serde(flatten)]
        pub profile: ProfileSummaryDto,
        pub group_id: Option<String>,
        pub group_name: Option<String>,
}

impl From<SeatedProfile> for RoomMemberResponseDto {
        fn from(value: SeatedProfile) -> Self {
                RoomMemberResponseDto {
                        profile: ProfileSummaryDto::from(value.profile),
                        group_id: value.group.as_ref().map(|g| g.id.to_string()),
                        group_name: value.group.map(|g| g.name),
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssignedGroupResponseDto {
        pub id: String,
        pub name: String,
        pub seated_count: i64,
}

impl From<AssignedGroup> for AssignedGroupResponseDto {
        fn from(value: AssignedGroup) -> Self {
                AssignedGroupResponseDto {
                        id: value.group.id.to_string(),
                        name: value.group.name,
                        seated_count: value.seated_count,
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponseDto {
        #[serde(flatten)]
        pub room: RoomSummaryResponseDto,
        pub members: Vec<RoomMemberResponseDto>,
        pub assigned_groups: Vec<AssignedGroupResponseDto>,
}

impl From<RoomWithRelationships> for RoomResponseDto {
        fn from(value: RoomWithRelationships) -> Self {
                let occupancy = RoomWithOccupancy {
                        current_count: value.members.len() as i64,
                        room: value.room,
                };

                RoomResponseDto {
                        room: RoomSummaryResponseDto::from(occupancy),
                        members: value.members.into_iter().map(RoomMemberResponseDto::from).collect(),
                        assigned_groups: value.assigned_groups.into_iter().map(AssignedGroupResponseDto::from).collect(),
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
        pub room: RoomSummaryResponseDto,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SeatPayload {
        pub room_id: String,
        pub profile: ProfileSummaryDto,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BulkSeatPayload {
        pub room_id: String,
        pub added: Vec<ProfileSummaryDto>,
        pub added_count: usize,
        pub skipped_count: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GroupSeatPayload {
        pub room_id: String,
        pub assigned_groups: Vec<CatalogItemResponseDto>,
        pub members_seated: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MembersRemovedPayload {
        pub members_removed: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MemberRemovedPayload {
        pub group_removed: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignmentDto {
        pub profile_id: String,
        pub profile_name: String,
        pub room_id: String,
        pub room_name: String,
}

impl From<(Profile, Room)> for AutoAssignmentDto {
        fn from((profile, room): (Profile, Room)) -> Self {
                AutoAssignmentDto {
                        profile_id: profile.id.to_string(),
                        profile_name: profile.full_name(),
                        room_id: room.id.to_string(),
                        room_name: room.name,
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AutoAssignPayload {
        pub assignments: Vec<AutoAssignmentDto>,
        pub assigned_count: usize,
        pub unassigned_remaining: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponseDto {
        pub id: String,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        #[serde(rename = "type")]
        pub kind: String,
        pub title: String,
        pub message: String,
        pub priority: String,
        pub profile_id: Option<String>,
        pub profile_name: Option<String>,
        pub group_id: Option<String>,
        pub group_name: Option<String>,
        pub room_id: Option<String>,
        pub room_name: Option<String>,
        pub read_status: bool,
        pub resolved: bool,
        pub resolution: Option<String>,
        pub resolved_at: Option<chrono::NaiveDateTime>,
}

impl From<Notification> for NotificationResponseDto {
        fn from(notification: Notification) -> Self {
                NotificationResponseDto {
                        id: notification.id.to_string(),
                        created_at: notification.created_at,
                        updated_at: notification.updated_at,
                        kind: notification.kind,
                        title: notification.title,
                        message: notification.message,
                        priority: notification.priority,
                        profile_id: notification.profile_id.map(|id| id.to_string()),
                        profile_name: None,
                        group_id: notification.group_id.map(|id| id.to_string()),
                        group_name: None,
                        room_id: notification.room_id.map(|id| id.to_string()),
                        room_name: None,
                        read_status: notification.read_status,
                        resolved: notification.resolved,
                        resolution: notification.resolution,
                        resolved_at: notification.resolved_at,
                }
        }
}

impl From<NotificationWithRelationships> for NotificationResponseDto {
        fn from(value: NotificationWithRelationships) -> Self {
                NotificationResponseDto {
                        profile_name: value.profile.map(|p| p.full_name()),
                        group_name: value.group_name,
                        room_name: value.room_name,
                        ..NotificationResponseDto::from(value.notification)
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
        pub notification: NotificationResponseDto,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCountResponseDto {
        pub total_count: i64,
        pub unread_count: i64,
        pub pending_requests: i64,
}

impl From<NotificationCounts> for NotificationCountResponseDto {
        fn from(counts: NotificationCounts) -> Self {
                NotificationCountResponseDto {
                        total_count: counts.total,
                        unread_count: counts.unread,
                        pending_requests: counts.pending_requests,
                }
        }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AffectedPayload {
        pub affected: usize,
}

#[cfg(test)]
mod tests {
        use chrono::NaiveDate;
        use serde_json::json;

        use super::*;

        fn room(max_capacity: i32) -> Room {
                let at = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
                Room {
                        id: 7,
                        created_at: at,
                        updated_at: at,
                        name: "Library".to_string(),
                        description: None,
                        max_capacity,
                }
        }

        #[test]
        fn envelope_flattens_payload() {
                let response = ApiResponse::new("Removed", MembersRemovedPayload { members_removed: 3 });

                let value = serde_json::to_value(&response).unwrap();

                assert_eq!(value, json!({ "success": true, "message": "Removed", "membersRemoved": 3 }));
        }

        #[test]
        fn empty_envelope_has_only_status_fields() {
                let value = serde_json::to_value(ApiResponse::ok("Deleted")).unwrap();

                assert_eq!(value, json!({ "success": true, "message": "Deleted" }));
        }

        #[test]
        fn room_summary_renders_ids_as_strings_and_free_spots() {
                let dto = RoomSummaryResponseDto::from(RoomWithOccupancy {
                        room: room(5),
                        current_count: 3,
                });

                let value = serde_json::to_value(&dto).unwrap();

                assert_eq!(value["id"], json!("7"));
                assert_eq!(value["maxCapacity"], json!(5));
                assert_eq!(value["availableSpots"], json!(2));
        }

        #[test]
        fn notification_request_reads_type_field() {
                let dto: NotificationRequestDto = serde_json::from_value(json!({
                        "type": "group_request",
                        "title": "Join",
                        "message": "please",
                        "priority": "high"
                }))
                .unwrap();

                assert_eq!(dto.kind, Some(NotificationKind::GroupRequest));
                assert_eq!(dto.priority, Some(Priority::High));
        }
}
