use std::collections::{HashMap, HashSet};

use chrono::Utc;
use diesel::prelude::*;
use tracing::info;

use crate::errors::problem::Problem;
use crate::models::{Group, GroupMember, GroupSubject, GroupWithMemberCount, GroupWithRelationships, Profile, Room, Subject};
use crate::schema::{group_members, group_rooms, group_subjects, groups, profiles, room_members, rooms, subjects};
use crate::DbPool;

/// Moves a profile into `group_id`, dropping any other group membership. A seated
/// profile keeps its seat; the seat is re-tagged with the new group.
pub(crate) fn transfer_profile_to_group(
        connection: &mut PgConnection,
        profile_id: i64,
        group_id: i64,
) -> QueryResult<()> {
        diesel::delete(
                group_members::table
                        .filter(group_members::profile_id.eq(profile_id).and(group_members::group_id.ne(group_id))),
        )
        .execute(connection)?;

        diesel::insert_into(group_members::table)
                .values(&GroupMember {
                        profile_id,
                        group_id,
                        created_at: Utc::now().naive_utc(),
                })
                .on_conflict(group_members::profile_id)
                .do_nothing()
                .execute(connection)?;

        diesel::update(room_members::table.filter(room_members::profile_id.eq(profile_id)))
                .set(room_members::group_id.eq(Some(group_id)))
                .execute(connection)?;

        Ok(())
}

fn dedup(ids: &[i64]) -> Vec<i64> {
        let mut seen = HashSet::new();
        ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn require_subjects(connection: &mut PgConnection, subject_ids: &[i64]) -> Result<(), Problem> {
        let found = subjects::table
                .filter(subjects::id.eq_any(subject_ids))
                .count()
                .get_result::<i64>(connection)?;

        if found as usize != subject_ids.len() {
                return Err(Problem::BadRequest("One or more subjects not found".to_string()));
        }

        Ok(())
}

/// Checks every profile exists and is not held by a group other than `group_id`.
fn require_free_profiles(
        connection: &mut PgConnection,
        profile_ids: &[i64],
        group_id: Option<i64>,
) -> Result<(), Problem> {
        let found = profiles::table
                .filter(profiles::id.eq_any(profile_ids))
                .count()
                .get_result::<i64>(connection)?;
        if found as usize != profile_ids.len() {
                return Err(Problem::NotFound("One or more profiles not found".to_string()));
        }

        let mut taken = profiles::table
                .inner_join(group_members::table)
                .filter(profiles::id.eq_any(profile_ids))
                .select(Profile::as_select())
                .into_boxed();
        if let Some(group_id) = group_id {
                taken = taken.filter(group_members::group_id.ne(group_id));
        }
        let taken = taken.load::<Profile>(connection)?;

        if !taken.is_empty() {
                let names: Vec<String> = taken.iter().map(Profile::full_name).collect();
                return Err(Problem::Conflict(format!(
                        "Some profiles are already assigned to other groups: {}",
                        names.join(", ")
                )));
        }

        Ok(())
}

fn insert_subjects(connection: &mut PgConnection, group_id: i64, subject_ids: &[i64]) -> QueryResult<usize> {
        if subject_ids.is_empty() {
                return Ok(0);
        }
        let rows: Vec<GroupSubject> = subject_ids
                .iter()
                .map(|subject_id| GroupSubject {
                        group_id,
                        subject_id: *subject_id,
                })
                .collect();

        diesel::insert_into(group_subjects::table).values(&rows).execute(connection)
}

fn insert_members(connection: &mut PgConnection, group_id: i64, profile_ids: &[i64]) -> QueryResult<usize> {
        if profile_ids.is_empty() {
                return Ok(0);
        }
        let now = Utc::now().naive_utc();
        let rows: Vec<GroupMember> = profile_ids
                .iter()
                .map(|profile_id| GroupMember {
                        profile_id: *profile_id,
                        group_id,
                        created_at: now,
                })
                .collect();

        diesel::insert_into(group_members::table).values(&rows).execute(connection)
}

#[derive(Debug, Clone)]
pub struct GroupRepository {
        pool: DbPool,
}

impl GroupRepository {
        pub fn new(pool: DbPool) -> Self {
                Self { pool }
        }

        pub fn find_all(&self) -> Result<Vec<GroupWithMemberCount>, Problem> {
                let mut connection = self.pool.get()?;

                let groups = groups::table.order_by(groups::name).load::<Group>(&mut connection)?;
                let members = GroupMember::belonging_to(&groups).load::<GroupMember>(&mut connection)?;

                let mut counts: HashMap<i64, i64> = HashMap::new();
                for member in &members {
                        *counts.entry(member.group_id).or_default() += 1;
                }

                Ok(groups
                        .into_iter()
                        .map(|group| GroupWithMemberCount {
                                member_count: counts.get(&group.id).copied().unwrap_or_default(),
                                group,
                        })
                        .collect())
        }

        pub fn find_by_id(&self, group_id: i64) -> Result<Option<GroupWithRelationships>, Problem> {
                let mut connection = self.pool.get()?;

                let group = groups::table.find(group_id).first::<Group>(&mut connection).optional()?;

                group.map_or(Ok(None), |group| {
                        let members = profiles::table
                                .inner_join(group_members::table)
                                .filter(group_members::group_id.eq(group.id))
                                .order_by((profiles::first_name, profiles::last_name))
                                .select(Profile::as_select())
                                .load::<Profile>(&mut connection)?;

                        let subjects = self.load_subjects(&mut connection, group.id)?;

                        let assigned_room = rooms::table
                                .inner_join(group_rooms::table)
                                .filter(group_rooms::group_id.eq(group.id))
                                .select(Room::as_select())
                                .first::<Room>(&mut connection)
                                .optional()?;

                        Ok(Some(GroupWithRelationships {
                                group,
                                members,
                                subjects,
                                assigned_room,
                        }))
                })
        }

        pub fn find_subjects(&self, group_id: i64) -> Result<Vec<Subject>, Problem> {
                let mut connection = self.pool.get()?;

                let exists = groups::table.find(group_id).count().get_result::<i64>(&mut connection)?;
                if exists == 0 {
                        return Err(Problem::NotFound("Group not found".to_string()));
                }

                self.load_subjects(&mut connection, group_id)
        }

        fn load_subjects(&self, connection: &mut PgConnection, group_id: i64) -> Result<Vec<Subject>, Problem> {
                Ok(subjects::table
                        .inner_join(group_subjects::table)
                        .filter(group_subjects::group_id.eq(group_id))
                        .order_by(subjects::name)
                        .select(Subject::as_select())
                        .load::<Subject>(connection)?)
        }

        pub fn create(&self, group: Group, subject_ids: &[i64], profile_ids: &[i64]) -> Result<Group, Problem> {
                let mut connection = self.pool.get()?;
                let subject_ids = dedup(subject_ids);
                let profile_ids = dedup(profile_ids);

                connection.transaction::<_, Problem, _>(|connection| {
                        require_subjects(connection, &subject_ids)?;
                        require_free_profiles(connection, &profile_ids, None)?;

                        let group = diesel::insert_into(groups::table).values(&group).get_result::<Group>(connection)?;
                        insert_subjects(connection, group.id, &subject_ids)?;
                        insert_members(connection, group.id, &profile_ids)?;

                        info!("created group {} with {} member(s)", group.id, profile_ids.len());
                        Ok(group)
                })
        }

        /// Replaces a group's fields, subjects and members. Members dropped from the group
        /// keep any seat they hold, but the seat no longer counts as the group's.
        pub fn update(
                &self,
                group_id: i64,
                name: String,
                description: Option<String>,
                subject_ids: &[i64],
                profile_ids: &[i64],
        ) -> Result<Group, Problem> {
                let mut connection = self.pool.get()?;
                let subject_ids = dedup(subject_ids);
                let profile_ids = dedup(profile_ids);

                connection.transaction::<_, Problem, _>(|connection| {
                        groups::table
                                .find(group_id)
                                .for_update()
                                .get_result::<Group>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("Group not found".to_string()))?;

                        require_subjects(connection, &subject_ids)?;
                        require_free_profiles(connection, &profile_ids, Some(group_id))?;

                        let group = diesel::update(groups::table.find(group_id))
                                .set((
                                        groups::name.eq(name),
                                        groups::description.eq(description),
                                        groups::updated_at.eq(Utc::now().naive_utc()),
                                ))
                                .get_result::<Group>(connection)?;

                        diesel::delete(group_subjects::table.filter(group_subjects::group_id.eq(group_id)))
                                .execute(connection)?;
                        insert_subjects(connection, group_id, &subject_ids)?;

                        let removed: Vec<i64> = group_members::table
                                .filter(group_members::group_id.eq(group_id))
                                .filter(group_members::profile_id.ne_all(&profile_ids))
                                .select(group_members::profile_id)
                                .load::<i64>(connection)?;

                        diesel::delete(group_members::table.filter(group_members::group_id.eq(group_id)))
                                .execute(connection)?;
                        insert_members(connection, group_id, &profile_ids)?;

                        diesel::update(
                                room_members::table
                                        .filter(room_members::profile_id.eq_any(&removed))
                                        .filter(room_members::group_id.eq(group_id)),
                        )
                        .set(room_members::group_id.eq(None::<i64>))
                        .execute(connection)?;

                        info!("updated group {group_id}, {} member(s) removed", removed.len());
                        Ok(group)
                })
        }

        pub fn delete(&self, group_id: i64) -> Result<(), Problem> {
                let mut connection = self.pool.get()?;

                let deleted = diesel::delete(groups::table.find(group_id)).execute(&mut connection)?;
                if deleted == 0 {
                        return Err(Problem::NotFound("Group not found".to_string()));
                }

                Ok(())
        }

        pub fn reassign_profile(&self, profile_id: i64, group_id: i64) -> Result<Group, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        profiles::table
                                .find(profile_id)
                                .for_update()
                                .get_result::<Profile>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("Profile not found".to_string()))?;
                        let group = groups::table
                                .find(group_id)
                                .first::<Group>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("Group not found".to_string()))?;

                        transfer_profile_to_group(connection, profile_id, group_id)?;

                        info!("moved profile {profile_id} to group {group_id}");
                        Ok(group)
                })
        }
}
