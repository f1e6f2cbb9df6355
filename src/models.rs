use std::fmt::{Display, Formatter};
use std::str::FromStr;

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::problem::Problem;
use crate::schema;

#[derive(Queryable, Identifiable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Profile {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub first_name: String,
        pub last_name: String,
        pub age: i32,
        pub message: Option<String>,
        pub avatar_url: Option<String>,
}

impl Profile {
        pub fn full_name(&self) -> String {
                format!("{} {}", self.first_name, self.last_name)
        }
}

#[derive(Queryable, Identifiable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::professions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Profession {
        pub id: i64,
        pub name: String,
}

#[derive(Queryable, Selectable, Insertable, Associations, Debug, Clone)]
#[diesel(belongs_to(Profile))]
#[diesel(belongs_to(Profession))]
#[diesel(primary_key(profile_id, profession_id))]
#[diesel(table_name = schema::profession_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfessionMember {
        pub profile_id: i64,
        pub profession_id: i64,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::subjects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subject {
        pub id: i64,
        pub name: String,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Group {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub name: String,
        pub description: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::group_subjects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GroupSubject {
        pub group_id: i64,
        pub subject_id: i64,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, Associations, Debug, Clone)]
#[diesel(belongs_to(Group))]
#[diesel(primary_key(profile_id))]
#[diesel(table_name = schema::group_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GroupMember {
        pub profile_id: i64,
        pub group_id: i64,
        pub created_at: chrono::NaiveDateTime,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = schema::rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Room {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub name: String,
        pub description: Option<String>,
        pub max_capacity: i32,
}

/// A seat in a room. `group_id` is set when the seat was granted through a group assignment.
#[derive(Queryable, Identifiable, Selectable, Insertable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Room))]
#[diesel(primary_key(profile_id))]
#[diesel(table_name = schema::room_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoomMember {
        pub profile_id: i64,
        pub room_id: i64,
        pub group_id: Option<i64>,
        pub created_at: chrono::NaiveDateTime,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, Associations, Debug, Clone)]
#[diesel(belongs_to(Room))]
#[diesel(primary_key(group_id))]
#[diesel(table_name = schema::group_rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GroupRoom {
        pub group_id: i64,
        pub room_id: i64,
        pub created_at: chrono::NaiveDateTime,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub kind: String,
        pub title: String,
        pub message: String,
        pub priority: String,
        pub profile_id: Option<i64>,
        pub group_id: Option<i64>,
        pub room_id: Option<i64>,
        pub read_status: bool,
        pub resolved: bool,
        pub resolution: Option<String>,
        pub resolved_at: Option<chrono::NaiveDateTime>,
}

#[derive(Queryable, Identifiable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
        pub id: i64,
        pub created_at: chrono::NaiveDateTime,
        pub updated_at: chrono::NaiveDateTime,
        pub email: String,
        pub password_hash: String,
        pub role: String,
        pub is_active: bool,
        pub last_login: Option<chrono::NaiveDateTime>,
        pub profile_id: Option<i64>,
}

macro_rules! string_enum {
        ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
                #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
                #[serde(rename_all = "snake_case")]
                pub enum $name {
                        $($variant),+
                }

                impl $name {
                        pub fn as_str(&self) -> &'static str {
                                match self {
                                        $($name::$variant => $text),+
                                }
                        }
                }

                impl Display for $name {
                        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                                f.write_str(self.as_str())
                        }
                }

                impl FromStr for $name {
                        type Err = Problem;

                        fn from_str(value: &str) -> Result<Self, Self::Err> {
                                match value {
                                        $($text => Ok($name::$variant),)+
                                        other => Err(Problem::BadRequest(format!(
                                                "Invalid {}: {other}",
                                                stringify!($name)
                                        ))),
                                }
                        }
                }
        };
}

string_enum!(NotificationKind {
        General => "general",
        GroupRequest => "group_request",
});

string_enum!(Priority {
        Low => "low",
        Normal => "normal",
        High => "high",
});

string_enum!(Resolution {
        Approved => "approved",
        Denied => "denied",
});

string_enum!(Role {
        Admin => "admin",
        User => "user",
});

impl Role {
        pub fn redirect_url(&self) -> &'static str {
                match self {
                        Role::Admin => "/",
                        Role::User => "/test",
                }
        }
}

#[derive(Debug, Clone)]
pub struct ProfileWithRelationships {
        pub profile: Profile,
        pub professions: Vec<String>,
        pub group: Option<Group>,
        pub room: Option<Room>,
}

#[derive(Debug, Clone)]
pub struct GroupWithMemberCount {
        pub group: Group,
        pub member_count: i64,
}

#[derive(Debug, Clone)]
pub struct GroupWithRelationships {
        pub group: Group,
        pub members: Vec<Profile>,
        pub subjects: Vec<Subject>,
        pub assigned_room: Option<Room>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomWithOccupancy {
        pub room: Room,
        pub current_count: i64,
}

impl RoomWithOccupancy {
        pub fn available_spots(&self) -> i64 {
                crate::allocation::available_seats(self.room.max_capacity, self.current_count)
        }
}

#[derive(Debug, Clone)]
pub struct SeatedProfile {
        pub profile: Profile,
        pub group: Option<Group>,
}

#[derive(Debug, Clone)]
pub struct AssignedGroup {
        pub group: Group,
        pub seated_count: i64,
}

#[derive(Debug, Clone)]
pub struct RoomWithRelationships {
        pub room: Room,
        pub members: Vec<SeatedProfile>,
        pub assigned_groups: Vec<AssignedGroup>,
}

#[derive(Debug, Clone)]
pub struct BulkAssignment {
        pub room: Room,
        pub admitted: Vec<Profile>,
        pub skipped_count: usize,
}

#[derive(Debug, Clone)]
pub struct GroupAssignment {
        pub room: Room,
        pub groups: Vec<Group>,
        pub seated_count: usize,
}

#[derive(Debug, Clone)]
pub struct AutoAssignment {
        pub assigned: Vec<(Profile, Room)>,
        pub unassigned_remaining: usize,
}

#[derive(Debug, Clone)]
pub struct NotificationWithRelationships {
        pub notification: Notification,
        pub profile: Option<Profile>,
        pub group_name: Option<String>,
        pub room_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationCounts {
        pub total: i64,
        pub unread: i64,
        pub pending_requests: i64,
}

#[cfg(test)]
mod tests {
        use super::*;

        #[test]
        fn notification_kind_round_trips_through_text() {
                assert_eq!("group_request".parse::<NotificationKind>().unwrap(), NotificationKind::GroupRequest);
                assert_eq!(NotificationKind::General.as_str(), "general");
        }

        #[test]
        fn unknown_priority_is_bad_request() {
                let err = "urgent".parse::<Priority>().unwrap_err();
                assert!(matches!(err, Problem::BadRequest(_)));
        }

        #[test]
        fn role_redirects() {
                assert_eq!(Role::Admin.redirect_url(), "/");
                assert_eq!(Role::User.redirect_url(), "/test");
        }

        #[test]
        fn serde_uses_snake_case() {
                let json = serde_json::to_string(&NotificationKind::GroupRequest).unwrap();
                assert_eq!(json, "\"group_request\"");
        }
}
