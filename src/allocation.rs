//! Seat arithmetic shared by every path that puts profiles into rooms.
//!
//! The database layer locks a room before reading its occupancy and then asks
//! these functions what may be admitted. Nothing here touches a connection, so
//! the admission policy can be reasoned about (and tested) on its own.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::errors::problem::Problem;

/// Seats left in a room. Never negative, even if the room was overbooked by a
/// writer that bypassed the lock or had its capacity lowered.
pub fn available_seats(max_capacity: i32, current_count: i64) -> i64 {
        (i64::from(max_capacity) - current_count).max(0)
}

/// All-or-nothing admission used for group assignment.
pub fn admit_all(room_name: &str, available: i64, requested: i64) -> Result<(), Problem> {
        if requested > available {
                return Err(Problem::capacity_exceeded(room_name, available, requested));
        }

        Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkAdmission {
        pub admitted: Vec<i64>,
        pub skipped_count: usize,
}

/// Partial admission used for bulk individual assignment.
///
/// `requested` keeps the caller's order; duplicates count once towards the
/// admitted set but every extra copy is reported as skipped. `eligible` is the
/// subset of requested profiles that exist and hold no room membership.
pub fn admit_partial(
        room_name: &str,
        available: i64,
        requested: &[i64],
        eligible: &HashSet<i64>,
) -> Result<BulkAdmission, Problem> {
        let mut seen = HashSet::new();
        let candidates: Vec<i64> = requested
                .iter()
                .copied()
                .filter(|profile_id| eligible.contains(profile_id) && seen.insert(*profile_id))
                .collect();

        if candidates.is_empty() {
                return Err(Problem::BadRequest("No available profiles found for assignment".to_string()));
        }

        if available <= 0 {
                return Err(Problem::capacity_exceeded(room_name, 0, candidates.len() as i64));
        }

        let admitted: Vec<i64> = candidates.into_iter().take(available as usize).collect();

        Ok(BulkAdmission {
                skipped_count: requested.len() - admitted.len(),
                admitted,
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomVacancy {
        pub room_id: i64,
        pub name: String,
        pub available: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
        pub profile_id: i64,
        pub room_id: i64,
}

/// Greedy distribution of unseated profiles.
///
/// Rooms are filled one at a time, largest vacancy first (ties by name), and
/// each room is filled completely before the next one is opened.
pub fn plan_auto_assignment(profile_ids: &[i64], mut rooms: Vec<RoomVacancy>) -> Vec<Placement> {
        rooms.retain(|room| room.available > 0);
        rooms.sort_by(|a, b| match b.available.cmp(&a.available) {
                Ordering::Equal => a.name.cmp(&b.name),
                ordering => ordering,
        });

        let mut profiles = profile_ids.iter().copied();
        let mut placements = Vec::with_capacity(profile_ids.len());

        'rooms: for room in rooms {
                for _ in 0..room.available {
                        match profiles.next() {
                                Some(profile_id) => placements.push(Placement {
                                        profile_id,
                                        room_id: room.room_id,
                                }),
                                None => break 'rooms,
                        }
                }
        }

        placements
}
