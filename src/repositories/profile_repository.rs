use std::collections::HashMap;

use chrono::Utc;
use derive_new::new;
use diesel::prelude::*;
use tracing::warn;

use crate::errors::problem::Problem;
use crate::models::{Group, Profession, ProfessionMember, Profile, ProfileWithRelationships, Room, RoomMember};
use crate::repositories::room_repository::unlink_vacated_group;
use crate::schema::{group_members, groups, profession_members, professions, profiles, room_members, rooms};
use crate::DbPool;

/// Matches profession names case-insensitively. Unknown names are logged and dropped.
fn resolve_professions(connection: &mut PgConnection, names: &[String]) -> QueryResult<Vec<Profession>> {
        let known = professions::table.load::<Profession>(connection)?;

        let mut resolved: Vec<Profession> = Vec::with_capacity(names.len());
        for name in names {
                let wanted = name.trim().to_lowercase();
                match known.iter().find(|profession| profession.name.to_lowercase() == wanted) {
                        Some(profession) if !resolved.contains(profession) => resolved.push(profession.clone()),
                        Some(_) => {}
                        None => warn!("ignoring unknown profession {name:?}"),
                }
        }

        Ok(resolved)
}

fn replace_professions(connection: &mut PgConnection, profile_id: i64, names: &[String]) -> QueryResult<()> {
        diesel::delete(profession_members::table.filter(profession_members::profile_id.eq(profile_id)))
                .execute(connection)?;

        let rows: Vec<ProfessionMember> = resolve_professions(connection, names)?
                .into_iter()
                .map(|profession| ProfessionMember {
                        profile_id,
                        profession_id: profession.id,
                })
                .collect();
        if !rows.is_empty() {
                diesel::insert_into(profession_members::table).values(&rows).execute(connection)?;
        }

        Ok(())
}

/// Attaches professions, group and room to each profile with one query per relation.
fn with_relationships(
        connection: &mut PgConnection,
        profiles: Vec<Profile>,
) -> QueryResult<Vec<ProfileWithRelationships>> {
        let ids: Vec<i64> = profiles.iter().map(|p| p.id).collect();

        let mut profession_map: HashMap<i64, Vec<String>> = HashMap::new();
        for (profile_id, name) in profession_members::table
                .inner_join(professions::table)
                .filter(profession_members::profile_id.eq_any(&ids))
                .order_by(professions::name)
                .select((profession_members::profile_id, professions::name))
                .load::<(i64, String)>(connection)?
        {
                profession_map.entry(profile_id).or_default().push(name);
        }

        let mut group_map: HashMap<i64, Group> = group_members::table
                .inner_join(groups::table)
                .filter(group_members::profile_id.eq_any(&ids))
                .select((group_members::profile_id, Group::as_select()))
                .load::<(i64, Group)>(connection)?
                .into_iter()
                .collect();

        let mut room_map: HashMap<i64, Room> = room_members::table
                .inner_join(rooms::table)
                .filter(room_members::profile_id.eq_any(&ids))
                .select((room_members::profile_id, Room::as_select()))
                .load::<(i64, Room)>(connection)?
                .into_iter()
                .collect();

        Ok(profiles
                .into_iter()
                .map(|profile| ProfileWithRelationships {
                        professions: profession_map.remove(&profile.id).unwrap_or_default(),
                        group: group_map.remove(&profile.id),
                        room: room_map.remove(&profile.id),
                        profile,
                })
                .collect())
}

#[derive(new, Debug, Clone)]
pub struct ProfileRepository {
        pool: DbPool,
}

impl ProfileRepository {
        pub fn find_all(&self) -> Result<Vec<ProfileWithRelationships>, Problem> {
                let mut connection = self.pool.get()?;

                let profiles = profiles::table
                        .order_by((profiles::created_at.desc(), profiles::id.desc()))
                        .load::<Profile>(&mut connection)?;

                Ok(with_relationships(&mut connection, profiles)?)
        }

        pub fn find_by_id(&self, profile_id: i64) -> Result<Option<ProfileWithRelationships>, Problem> {
                let mut connection = self.pool.get()?;

                let profile = profiles::table.find(profile_id).first::<Profile>(&mut connection).optional()?;

                match profile {
                        Some(profile) => Ok(with_relationships(&mut connection, vec![profile])?.pop()),
                        None => Ok(None),
                }
        }

        /// Profiles that belong to no group.
        pub fn find_without_group(&self) -> Result<Vec<Profile>, Problem> {
                let mut connection = self.pool.get()?;

                Ok(profiles::table
                        .left_join(group_members::table)
                        .filter(group_members::profile_id.is_null())
                        .order_by((profiles::first_name, profiles::last_name))
                        .select(Profile::as_select())
                        .load::<Profile>(&mut connection)?)
        }

        /// Profiles that hold no seat in any room.
        pub fn find_unseated(&self) -> Result<Vec<Profile>, Problem> {
                let mut connection = self.pool.get()?;

                Ok(profiles::table
                        .left_join(room_members::table)
                        .filter(room_members::profile_id.is_null())
                        .order_by((profiles::first_name, profiles::last_name))
                        .select(Profile::as_select())
                        .load::<Profile>(&mut connection)?)
        }

        /// Profiles a group editor may pick: those without a group plus the group's own members.
        pub fn find_available_for_group(&self, group_id: i64) -> Result<Vec<Profile>, Problem> {
                let mut connection = self.pool.get()?;

                Ok(profiles::table
                        .left_join(group_members::table)
                        .filter(group_members::profile_id.is_null().or(group_members::group_id.eq(group_id)))
                        .order_by((profiles::first_name, profiles::last_name))
                        .select(Profile::as_select())
                        .load::<Profile>(&mut connection)?)
        }

        pub fn create(&self, profile: Profile, profession_names: &[String]) -> Result<ProfileWithRelationships, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let profile = diesel::insert_into(profiles::table)
                                .values(&profile)
                                .get_result::<Profile>(connection)?;
                        replace_professions(connection, profile.id, profession_names)?;

                        with_relationships(connection, vec![profile])?
                                .pop()
                                .ok_or(Problem::InternalServerError("failed to load profile".to_string()))
                })
        }

        pub fn update(
                &self,
                profile_id: i64,
                first_name: String,
                last_name: String,
                age: i32,
                message: Option<String>,
                profession_names: &[String],
        ) -> Result<ProfileWithRelationships, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let profile = diesel::update(profiles::table.find(profile_id))
                                .set((
                                        profiles::first_name.eq(first_name),
                                        profiles::last_name.eq(last_name),
                                        profiles::age.eq(age),
                                        profiles::message.eq(message),
                                        profiles::updated_at.eq(Utc::now().naive_utc()),
                                ))
                                .get_result::<Profile>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("Profile not found".to_string()))?;
                        replace_professions(connection, profile.id, profession_names)?;

                        with_relationships(connection, vec![profile])?
                                .pop()
                                .ok_or(Problem::InternalServerError("failed to load profile".to_string()))
                })
        }

        /// Deletes a profile together with its memberships and hands back the removed row.
        /// A group whose last seat in a room belonged to this profile loses its link to that room.
        pub fn delete(&self, profile_id: i64) -> Result<Profile, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let seat = room_members::table
                                .filter(room_members::profile_id.eq(profile_id))
                                .first::<RoomMember>(connection)
                                .optional()?;

                        let profile = diesel::delete(profiles::table.find(profile_id))
                                .get_result::<Profile>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("Profile not found".to_string()))?;

                        if let Some(RoomMember {
                                room_id,
                                group_id: Some(group_id),
                                ..
                        }) = seat
                        {
                                unlink_vacated_group(connection, room_id, group_id)?;
                        }

                        Ok(profile)
                })
        }

        /// Stores a new avatar url and returns the one it replaced.
        pub fn set_avatar_url(&self, profile_id: i64, avatar_url: Option<String>) -> Result<Option<String>, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let previous = profiles::table
                                .find(profile_id)
                                .for_update()
                                .get_result::<Profile>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("Profile not found".to_string()))?
                                .avatar_url;

                        diesel::update(profiles::table.find(profile_id))
                                .set((
                                        profiles::avatar_url.eq(avatar_url),
                                        profiles::updated_at.eq(Utc::now().naive_utc()),
                                ))
                                .execute(connection)?;

                        Ok(previous)
                })
        }

        pub fn exists(&self, profile_id: i64) -> Result<bool, Problem> {
                let mut connection = self.pool.get()?;

                let count = profiles::table.find(profile_id).count().get_result::<i64>(&mut connection)?;

                Ok(count > 0)
        }
}
