use std::collections::{HashMap, HashSet};

use chrono::Utc;
use derive_new::new;
use diesel::dsl::count_star;
use diesel::prelude::*;
use tracing::{debug, info};

use crate::allocation::{self, Placement, RoomVacancy};
use crate::errors::problem::Problem;
use crate::models::{
        AssignedGroup, AutoAssignment, BulkAssignment, Group, GroupAssignment, GroupMember, GroupRoom, Profile, Room,
        RoomMember, RoomWithOccupancy, RoomWithRelationships, SeatedProfile,
};
use crate::schema::{group_members, group_rooms, groups, profiles, room_members, rooms};
use crate::DbPool;

/// Locks the room row for the rest of the transaction and reads its occupancy.
///
/// Every path that hands out seats calls this first, so concurrent writers to the
/// same room queue up on the row lock instead of racing on the member count.
pub(crate) fn lock_room(connection: &mut PgConnection, room_id: i64) -> QueryResult<Option<RoomWithOccupancy>> {
        let room = rooms::table.find(room_id).for_update().get_result::<Room>(connection).optional()?;

        room.map_or(Ok(None), |room| {
                let current_count = room_members::table
                        .filter(room_members::room_id.eq(room.id))
                        .count()
                        .get_result::<i64>(connection)?;

                Ok(Some(RoomWithOccupancy { room, current_count }))
        })
}

/// Drops the group's link to the room once none of its tagged seats remain there.
pub(crate) fn unlink_vacated_group(connection: &mut PgConnection, room_id: i64, group_id: i64) -> QueryResult<bool> {
        let remaining = room_members::table
                .filter(room_members::room_id.eq(room_id).and(room_members::group_id.eq(group_id)))
                .count()
                .get_result::<i64>(connection)?;
        if remaining > 0 {
                return Ok(false);
        }

        let unlinked = diesel::delete(
                group_rooms::table.filter(group_rooms::group_id.eq(group_id).and(group_rooms::room_id.eq(room_id))),
        )
        .execute(connection)?;
        if unlinked > 0 {
                debug!("group {group_id} has no members left in room {room_id}");
        }

        Ok(unlinked > 0)
}

fn occupancy_by_room(connection: &mut PgConnection) -> QueryResult<HashMap<i64, i64>> {
        let counts = room_members::table
                .group_by(room_members::room_id)
                .select((room_members::room_id, count_star()))
                .load::<(i64, i64)>(connection)?;

        Ok(counts.into_iter().collect())
}

#[derive(new, Debug, Clone)]
pub struct RoomRepository {
        pool: DbPool,
}

impl RoomRepository {
        pub fn find_all(&self) -> Result<Vec<RoomWithOccupancy>, Problem> {
                let mut connection = self.pool.get()?;

                let rooms = rooms::table.order_by(rooms::name).load::<Room>(&mut connection)?;
                let counts = occupancy_by_room(&mut connection)?;

                Ok(rooms
                        .into_iter()
                        .map(|room| {
                                let current_count = counts.get(&room.id).copied().unwrap_or_default();
                                RoomWithOccupancy { room, current_count }
                        })
                        .collect())
        }

        pub fn find_by_id(&self, room_id: i64) -> Result<Option<RoomWithRelationships>, Problem> {
                let mut connection = self.pool.get()?;

                let room = rooms::table.find(room_id).first::<Room>(&mut connection).optional()?;

                room.map_or(Ok(None), |room| {
                        let seated = profiles::table
                                .inner_join(room_members::table)
                                .filter(room_members::room_id.eq(room.id))
                                .order_by((profiles::first_name, profiles::last_name))
                                .select((Profile::as_select(), room_members::group_id))
                                .load::<(Profile, Option<i64>)>(&mut connection)?;

                        let mut group_ids: Vec<i64> = seated.iter().filter_map(|(_, group_id)| *group_id).collect();
                        group_ids.sort_unstable();
                        group_ids.dedup();
                        let assigned = groups::table
                                .inner_join(group_rooms::table)
                                .filter(group_rooms::room_id.eq(room.id))
                                .order_by(groups::name)
                                .select(Group::as_select())
                                .load::<Group>(&mut connection)?;
                        let tagging_groups = groups::table
                                .filter(groups::id.eq_any(&group_ids))
                                .load::<Group>(&mut connection)?;
                        let group_map: HashMap<i64, Group> = tagging_groups.into_iter().map(|g| (g.id, g)).collect();

                        let mut seated_per_group: HashMap<i64, i64> = HashMap::new();
                        for group_id in seated.iter().filter_map(|(_, group_id)| *group_id) {
                                *seated_per_group.entry(group_id).or_default() += 1;
                        }

                        let mut members: Vec<SeatedProfile> = seated
                                .into_iter()
                                .map(|(profile, group_id)| SeatedProfile {
                                        profile,
                                        group: group_id.and_then(|id| group_map.get(&id).cloned()),
                                })
                                .collect();
                        members.sort_by(|a, b| {
                                let a_group = a.group.as_ref().map(|g| g.name.as_str());
                                let b_group = b.group.as_ref().map(|g| g.name.as_str());
                                a_group.cmp(&b_group)
                        });

                        let assigned_groups = assigned
                                .into_iter()
                                .map(|group| AssignedGroup {
                                        seated_count: seated_per_group.get(&group.id).copied().unwrap_or_default(),
                                        group,
                                })
                                .collect();

                        Ok(Some(RoomWithRelationships {
                                room,
                                members,
                                assigned_groups,
                        }))
                })
        }

        pub fn save(&self, room: Room) -> Result<Room, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::insert_into(rooms::table).values(&room).get_result(&mut connection)?)
        }

        /// Updates a room. Lowering the capacity below the seats already taken is refused.
        pub fn update(
                &self,
                room_id: i64,
                name: String,
                description: Option<String>,
                max_capacity: i32,
        ) -> Result<RoomWithOccupancy, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let occupancy =
                                lock_room(connection, room_id)?.ok_or(Problem::NotFound("Room not found".to_string()))?;

                        if i64::from(max_capacity) < occupancy.current_count {
                                return Err(Problem::Conflict(format!(
                                        "Room {} already seats {} profile(s); capacity cannot drop to {max_capacity}",
                                        occupancy.room.name, occupancy.current_count
                                )));
                        }

                        let room = diesel::update(rooms::table.find(room_id))
                                .set((
                                        rooms::name.eq(name),
                                        rooms::description.eq(description),
                                        rooms::max_capacity.eq(max_capacity),
                                        rooms::updated_at.eq(Utc::now().naive_utc()),
                                ))
                                .get_result::<Room>(connection)?;

                        Ok(RoomWithOccupancy {
                                room,
                                current_count: occupancy.current_count,
                        })
                })
        }

        pub fn delete(&self, room_id: i64) -> Result<(), Problem> {
                let mut connection = self.pool.get()?;

                let deleted = diesel::delete(rooms::table.find(room_id)).execute(&mut connection)?;
                if deleted == 0 {
                        return Err(Problem::NotFound("Room not found".to_string()));
                }

                Ok(())
        }

        /// Seats one profile. Fails if the room is full or the profile already holds a seat anywhere.
        pub fn add_member(&self, room_id: i64, profile_id: i64) -> Result<(Room, Profile), Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let occupancy =
                                lock_room(connection, room_id)?.ok_or(Problem::NotFound("Room not found".to_string()))?;

                        let available = occupancy.available_spots();
                        if available < 1 {
                                return Err(Problem::Conflict(format!(
                                        "Room {} is full ({}/{})",
                                        occupancy.room.name, occupancy.current_count, occupancy.room.max_capacity
                                )));
                        }

                        let profile = profiles::table
                                .find(profile_id)
                                .first::<Profile>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("Profile not found".to_string()))?;

                        let existing = room_members::table
                                .find(profile_id)
                                .first::<RoomMember>(connection)
                                .optional()?;
                        if existing.is_some() {
                                return Err(Problem::Conflict("Profile is already assigned to a room".to_string()));
                        }

                        diesel::insert_into(room_members::table)
                                .values(&RoomMember {
                                        profile_id,
                                        room_id,
                                        group_id: None,
                                        created_at: Utc::now().naive_utc(),
                                })
                                .execute(connection)?;

                        info!("seated profile {profile_id} in room {room_id}");
                        Ok((occupancy.room, profile))
                })
        }

        /// Seats as many of the requested profiles as fit. Profiles that are unknown or
        /// already seated are skipped and show up in the skipped count.
        pub fn add_members(&self, room_id: i64, profile_ids: &[i64]) -> Result<BulkAssignment, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let occupancy =
                                lock_room(connection, room_id)?.ok_or(Problem::NotFound("Room not found".to_string()))?;

                        let unseated = profiles::table
                                .left_join(room_members::table)
                                .filter(profiles::id.eq_any(profile_ids))
                                .filter(room_members::profile_id.is_null())
                                .select(Profile::as_select())
                                .load::<Profile>(connection)?;
                        let eligible: HashSet<i64> = unseated.iter().map(|p| p.id).collect();

                        let admission = allocation::admit_partial(
                                &occupancy.room.name,
                                occupancy.available_spots(),
                                profile_ids,
                                &eligible,
                        )?;

                        let now = Utc::now().naive_utc();
                        let rows: Vec<RoomMember> = admission
                                .admitted
                                .iter()
                                .map(|profile_id| RoomMember {
                                        profile_id: *profile_id,
                                        room_id,
                                        group_id: None,
                                        created_at: now,
                                })
                                .collect();
                        if !rows.is_empty() {
                                diesel::insert_into(room_members::table).values(&rows).execute(connection)?;
                        }

                        let mut profile_map: HashMap<i64, Profile> = unseated.into_iter().map(|p| (p.id, p)).collect();
                        let admitted = admission
                                .admitted
                                .iter()
                                .filter_map(|profile_id| profile_map.remove(profile_id))
                                .collect();

                        info!(
                                "seated {} profile(s) in room {room_id}, skipped {}",
                                rows.len(),
                                admission.skipped_count
                        );
                        Ok(BulkAssignment {
                                room: occupancy.room,
                                admitted,
                                skipped_count: admission.skipped_count,
                        })
                })
        }

        /// Links whole groups to a room and seats their members. The room must have a free seat for every
        /// member of every group, even members already seated elsewhere, who keep their current seat.
        /// Either every group fits or nothing changes.
        pub fn assign_groups(&self, room_id: i64, group_ids: &[i64]) -> Result<GroupAssignment, Problem> {
                let mut connection = self.pool.get()?;

                let mut unique_group_ids: Vec<i64> = Vec::with_capacity(group_ids.len());
                for group_id in group_ids {
                        if !unique_group_ids.contains(group_id) {
                                unique_group_ids.push(*group_id);
                        }
                }

                connection.transaction::<_, Problem, _>(|connection| {
                        let occupancy =
                                lock_room(connection, room_id)?.ok_or(Problem::NotFound("Room not found".to_string()))?;

                        let groups = groups::table
                                .filter(groups::id.eq_any(&unique_group_ids))
                                .order_by(groups::name)
                                .load::<Group>(connection)?;
                        if groups.len() != unique_group_ids.len() {
                                return Err(Problem::NotFound("One or more groups not found".to_string()));
                        }

                        let existing = group_rooms::table
                                .filter(group_rooms::group_id.eq_any(&unique_group_ids))
                                .load::<GroupRoom>(connection)?;
                        if existing.iter().any(|link| link.room_id == room_id) {
                                return Err(Problem::Conflict(
                                        "One or more groups are already assigned to this room".to_string(),
                                ));
                        }
                        if !existing.is_empty() {
                                return Err(Problem::Conflict(
                                        "One or more groups are already assigned to another room".to_string(),
                                ));
                        }

                        let members = group_members::table
                                .filter(group_members::group_id.eq_any(&unique_group_ids))
                                .load::<GroupMember>(connection)?;

                        let member_ids: Vec<i64> = members.iter().map(|m| m.profile_id).collect();
                        let already_seated: HashSet<i64> = room_members::table
                                .filter(room_members::profile_id.eq_any(&member_ids))
                                .select(room_members::profile_id)
                                .load::<i64>(connection)?
                                .into_iter()
                                .collect();

                        let to_seat: Vec<&GroupMember> =
                                members.iter().filter(|member| !already_seated.contains(&member.profile_id)).collect();
                        allocation::admit_all(&occupancy.room.name, occupancy.available_spots(), members.len() as i64)?;

                        let now = Utc::now().naive_utc();
                        let links: Vec<GroupRoom> = unique_group_ids
                                .iter()
                                .map(|group_id| GroupRoom {
                                        group_id: *group_id,
                                        room_id,
                                        created_at: now,
                                })
                                .collect();
                        if !links.is_empty() {
                                diesel::insert_into(group_rooms::table).values(&links).execute(connection)?;
                        }

                        let seats: Vec<RoomMember> = to_seat
                                .iter()
                                .map(|member| RoomMember {
                                        profile_id: member.profile_id,
                                        room_id,
                                        group_id: Some(member.group_id),
                                        created_at: now,
                                })
                                .collect();
                        if !seats.is_empty() {
                                diesel::insert_into(room_members::table).values(&seats).execute(connection)?;
                        }

                        info!(
                                "assigned {} group(s) to room {room_id}, seated {} member(s)",
                                groups.len(),
                                seats.len()
                        );
                        Ok(GroupAssignment {
                                room: occupancy.room,
                                groups,
                                seated_count: seats.len(),
                        })
                })
        }

        /// Unlinks a group and frees only the seats that group contributed.
        pub fn remove_group(&self, room_id: i64, group_id: i64) -> Result<usize, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        lock_room(connection, room_id)?.ok_or(Problem::NotFound("Room not found".to_string()))?;

                        let unlinked = diesel::delete(
                                group_rooms::table.filter(
                                        group_rooms::group_id.eq(group_id).and(group_rooms::room_id.eq(room_id)),
                                ),
                        )
                        .execute(connection)?;
                        if unlinked == 0 {
                                return Err(Problem::NotFound("Group is not assigned to this room".to_string()));
                        }

                        let removed = diesel::delete(
                                room_members::table.filter(
                                        room_members::room_id.eq(room_id).and(room_members::group_id.eq(group_id)),
                                ),
                        )
                        .execute(connection)?;

                        info!("removed group {group_id} from room {room_id}, freed {removed} seat(s)");
                        Ok(removed)
                })
        }

        /// Frees one seat. Returns whether the profile's group lost its link to the room
        /// because it was the last member seated through it.
        pub fn remove_member(&self, room_id: i64, profile_id: i64) -> Result<bool, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let membership = diesel::delete(
                                room_members::table.filter(
                                        room_members::profile_id.eq(profile_id).and(room_members::room_id.eq(room_id)),
                                ),
                        )
                        .get_result::<RoomMember>(connection)
                        .optional()?
                        .ok_or(Problem::NotFound("Profile not found in this room".to_string()))?;

                        match membership.group_id {
                                Some(group_id) => Ok(unlink_vacated_group(connection, room_id, group_id)?),
                                None => Ok(false),
                        }
                })
        }

        /// Distributes every unseated profile over the rooms that still have space.
        pub fn auto_assign(&self) -> Result<AutoAssignment, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let rooms = rooms::table.order_by(rooms::id).for_update().load::<Room>(connection)?;
                        let counts = occupancy_by_room(connection)?;

                        let unseated = profiles::table
                                .left_join(room_members::table)
                                .filter(room_members::profile_id.is_null())
                                .order_by((profiles::first_name, profiles::last_name, profiles::id))
                                .select(Profile::as_select())
                                .load::<Profile>(connection)?;

                        let vacancies = rooms
                                .iter()
                                .map(|room| RoomVacancy {
                                        room_id: room.id,
                                        name: room.name.clone(),
                                        available: allocation::available_seats(
                                                room.max_capacity,
                                                counts.get(&room.id).copied().unwrap_or_default(),
                                        ),
                                })
                                .collect();
                        let profile_ids: Vec<i64> = unseated.iter().map(|p| p.id).collect();
                        let placements = allocation::plan_auto_assignment(&profile_ids, vacancies);

                        let now = Utc::now().naive_utc();
                        let rows: Vec<RoomMember> = placements
                                .iter()
                                .map(|placement| RoomMember {
                                        profile_id: placement.profile_id,
                                        room_id: placement.room_id,
                                        group_id: None,
                                        created_at: now,
                                })
                                .collect();
                        if !rows.is_empty() {
                                diesel::insert_into(room_members::table).values(&rows).execute(connection)?;
                        }

                        let unassigned_remaining = unseated.len() - placements.len();
                        let room_map: HashMap<i64, Room> = rooms.into_iter().map(|r| (r.id, r)).collect();
                        let mut profile_map: HashMap<i64, Profile> = unseated.into_iter().map(|p| (p.id, p)).collect();

                        let assigned = placements
                                .into_iter()
                                .filter_map(|Placement { profile_id, room_id }| {
                                        let profile = profile_map.remove(&profile_id)?;
                                        let room = room_map.get(&room_id)?.clone();
                                        Some((profile, room))
                                })
                                .collect::<Vec<(Profile, Room)>>();

                        info!(
                                "auto-assigned {} profile(s), {unassigned_remaining} left without a seat",
                                assigned.len()
                        );
                        Ok(AutoAssignment {
                                assigned,
                                unassigned_remaining,
                        })
                })
        }
}
