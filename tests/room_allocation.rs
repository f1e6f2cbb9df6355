mod common;

use std::thread;

use chrono::Utc;
use common::fixture;
use seating_api::errors::problem::Problem;
use seating_api::models::{Notification, NotificationKind, Resolution};

#[test]
fn group_fills_room_then_individual_is_refused() {
        let fx = fixture!();
        let room = fx.room("Hall", 5);
        let people = fx.profiles(6);

        let seated: Vec<i64> = people[..3].iter().map(|p| p.id).collect();
        fx.rooms.add_members(room.id, &seated).unwrap();
        assert_eq!(fx.seated_count(room.id), 3);

        let group = fx.group("Pair", &[&people[3], &people[4]]);
        let assignment = fx.rooms.assign_groups(room.id, &[group.id]).unwrap();
        assert_eq!(assignment.seated_count, 2);
        assert_eq!(fx.seated_count(room.id), 5);

        let err = fx.rooms.add_member(room.id, people[5].id).unwrap_err();
        assert!(matches!(err, Problem::Conflict(_)));
        assert_eq!(fx.seated_count(room.id), 5);
}

#[test]
fn oversized_group_leaves_room_untouched() {
        let fx = fixture!();
        let room = fx.room("Studio", 2);
        let people = fx.profiles(3);
        fx.rooms.add_member(room.id, people[0].id).unwrap();

        let group = fx.group("Couple", &[&people[1], &people[2]]);
        let err = fx.rooms.assign_groups(room.id, &[group.id]).unwrap_err();
        assert!(err.detail().contains("short by 1"));

        let details = fx.rooms.find_by_id(room.id).unwrap().unwrap();
        assert_eq!(details.members.len(), 1);
        assert!(details.assigned_groups.is_empty());
}

#[test]
fn group_cannot_be_linked_twice() {
        let fx = fixture!();
        let first = fx.room("North", 4);
        let second = fx.room("South", 4);
        let person = fx.profile("Solo");
        let group = fx.group("Linked", &[&person]);

        fx.rooms.assign_groups(first.id, &[group.id]).unwrap();

        let same = fx.rooms.assign_groups(first.id, &[group.id]).unwrap_err();
        let other = fx.rooms.assign_groups(second.id, &[group.id]).unwrap_err();
        assert!(matches!(same, Problem::Conflict(_)));
        assert!(matches!(other, Problem::Conflict(_)));
        assert_eq!(fx.seated_count(second.id), 0);
}

#[test]
fn removing_group_frees_only_its_seats() {
        let fx = fixture!();
        let room = fx.room("Lab", 5);
        let people = fx.profiles(3);
        fx.rooms.add_member(room.id, people[0].id).unwrap();

        let group = fx.group("Team", &[&people[1], &people[2]]);
        fx.rooms.assign_groups(room.id, &[group.id]).unwrap();

        let removed = fx.rooms.remove_group(room.id, group.id).unwrap();

        assert_eq!(removed, 2);
        let details = fx.rooms.find_by_id(room.id).unwrap().unwrap();
        assert_eq!(details.members.len(), 1);
        assert_eq!(details.members[0].profile.id, people[0].id);
        assert!(details.assigned_groups.is_empty());

        let again = fx.rooms.remove_group(room.id, group.id).unwrap_err();
        assert!(matches!(again, Problem::NotFound(_)));
}

#[test]
fn last_group_member_leaving_unlinks_group() {
        let fx = fixture!();
        let room = fx.room("Annex", 5);
        let people = fx.profiles(2);
        let group = fx.group("Duo", &[&people[0], &people[1]]);
        fx.rooms.assign_groups(room.id, &[group.id]).unwrap();

        assert!(!fx.rooms.remove_member(room.id, people[0].id).unwrap());
        assert!(fx.rooms.remove_member(room.id, people[1].id).unwrap());

        let details = fx.rooms.find_by_id(room.id).unwrap().unwrap();
        assert!(details.members.is_empty());
        assert!(details.assigned_groups.is_empty());
}

#[test]
fn bulk_add_skips_seated_profiles_and_overflow() {
        let fx = fixture!();
        let elsewhere = fx.room("Elsewhere", 5);
        let room = fx.room("Target", 2);
        let people = fx.profiles(4);
        fx.rooms.add_member(elsewhere.id, people[3].id).unwrap();

        let requested: Vec<i64> = people.iter().map(|p| p.id).collect();
        let assignment = fx.rooms.add_members(room.id, &requested).unwrap();

        assert_eq!(assignment.admitted.len(), 2);
        assert_eq!(assignment.skipped_count, requested.len() - assignment.admitted.len());
        assert!(assignment.admitted.iter().all(|p| p.id != people[3].id));
        assert_eq!(fx.seated_count(room.id), 2);
        assert_eq!(fx.seated_count(elsewhere.id), 1);
}

#[test]
fn capacity_cannot_drop_below_occupancy() {
        let fx = fixture!();
        let room = fx.room("Shrinking", 3);
        let people = fx.profiles(2);
        let ids: Vec<i64> = people.iter().map(|p| p.id).collect();
        fx.rooms.add_members(room.id, &ids).unwrap();

        let err = fx.rooms.update(room.id, room.name.clone(), None, 1).unwrap_err();
        assert!(matches!(err, Problem::Conflict(_)));

        let updated = fx.rooms.update(room.id, room.name.clone(), None, 2).unwrap();
        assert_eq!(updated.available_spots(), 0);
}

#[test]
fn concurrent_adds_never_overbook() {
        let fx = fixture!();
        let room = fx.room("Contested", 3);
        let people = fx.profiles(10);

        let handles: Vec<_> = people
                .iter()
                .map(|person| {
                        let rooms = fx.rooms.clone();
                        let (room_id, profile_id) = (room.id, person.id);
                        thread::spawn(move || rooms.add_member(room_id, profile_id))
                })
                .collect();
        let results: Vec<Result<_, Problem>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let admitted = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(admitted, 3);
        assert!(results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|err| matches!(err, Problem::Conflict(_))));
        assert_eq!(fx.seated_count(room.id), 3);
}

#[test]
fn approving_group_request_moves_profile() {
        let fx = fixture!();
        let room = fx.room("Office", 4);
        let person = fx.profile("Mover");
        let from = fx.group("From", &[&person]);
        let to = fx.group("To", &[]);
        fx.rooms.assign_groups(room.id, &[from.id]).unwrap();

        let now = Utc::now().naive_utc();
        let request = fx
                .notifications
                .save_group_request(Notification {
                        id: fx.ids.generate().unwrap(),
                        created_at: now,
                        updated_at: now,
                        kind: NotificationKind::GroupRequest.as_str().to_string(),
                        title: "Group Join Request".to_string(),
                        message: String::new(),
                        priority: "normal".to_string(),
                        profile_id: Some(person.id),
                        group_id: Some(to.id),
                        room_id: None,
                        read_status: false,
                        resolved: false,
                        resolution: None,
                        resolved_at: None,
                })
                .unwrap();
        assert!(request.message.contains("wants to join the \"To\" group"));

        let resolved = fx.notifications.resolve(request.id, Resolution::Approved).unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.resolution.as_deref(), Some("approved"));

        let profile = fx.profiles.find_by_id(person.id).unwrap().unwrap();
        assert_eq!(profile.group.map(|g| g.id), Some(to.id));
        assert_eq!(fx.groups.find_by_id(from.id).unwrap().unwrap().members.len(), 0);

        let seat = fx.rooms.find_by_id(room.id).unwrap().unwrap();
        assert_eq!(seat.members[0].group.as_ref().map(|g| g.id), Some(to.id));

        let twice = fx.notifications.resolve(request.id, Resolution::Denied).unwrap_err();
        assert!(matches!(twice, Problem::Conflict(_)));
}

#[test]
fn profile_cannot_join_two_groups_at_creation() {
        let fx = fixture!();
        let person = fx.profile("Taken");
        fx.group("First", &[&person]);

        let subject = fx.catalog.find_subjects().unwrap().remove(0);
        let now = Utc::now().naive_utc();
        let err = fx
                .groups
                .create(
                        seating_api::models::Group {
                                id: fx.ids.generate().unwrap(),
                                created_at: now,
                                updated_at: now,
                                name: "Second".to_string(),
                                description: None,
                        },
                        &[subject.id],
                        &[person.id],
                )
                .unwrap_err();

        assert!(matches!(err, Problem::Conflict(_)));
}

#[test]
fn auto_assign_fills_largest_room_first() {
        let fx = fixture!();
        let small = fx.room("Small", 1);
        let large = fx.room("Large", 2);
        fx.profiles(4);

        let outcome = fx.rooms.auto_assign().unwrap();

        assert_eq!(outcome.assigned.len(), 3);
        assert_eq!(outcome.unassigned_remaining, 1);
        assert_eq!(outcome.assigned[0].1.id, large.id);
        assert_eq!(outcome.assigned[2].1.id, small.id);
        assert_eq!(fx.seated_count(large.id), 2);
        assert_eq!(fx.seated_count(small.id), 1);

        let again = fx.rooms.auto_assign().unwrap();
        assert!(again.assigned.is_empty());
        assert_eq!(again.unassigned_remaining, 1);
}

#[test]
fn group_members_seated_elsewhere_still_need_room() {
        let fx = fixture!();
        let elsewhere = fx.room("Elsewhere", 5);
        let room = fx.room("Tight", 2);
        let people = fx.profiles(4);
        fx.rooms.add_member(room.id, people[0].id).unwrap();
        fx.rooms.add_members(elsewhere.id, &[people[1].id, people[2].id]).unwrap();

        let group = fx.group("Trio", &[&people[1], &people[2], &people[3]]);
        let err = fx.rooms.assign_groups(room.id, &[group.id]).unwrap_err();

        assert!(matches!(err, Problem::Conflict(_)));
        assert!(err.detail().contains("short by 2"));
        assert_eq!(fx.seated_count(room.id), 1);
        assert!(fx.rooms.find_by_id(room.id).unwrap().unwrap().assigned_groups.is_empty());
}

#[test]
fn group_assignment_keeps_existing_seats() {
        let fx = fixture!();
        let elsewhere = fx.room("Elsewhere", 5);
        let room = fx.room("Roomy", 3);
        let people = fx.profiles(3);
        fx.rooms.add_members(elsewhere.id, &[people[0].id, people[1].id]).unwrap();

        let group = fx.group("Trio", &[&people[0], &people[1], &people[2]]);
        let assignment = fx.rooms.assign_groups(room.id, &[group.id]).unwrap();

        assert_eq!(assignment.seated_count, 1);
        assert_eq!(fx.seated_count(room.id), 1);
        assert_eq!(fx.seated_count(elsewhere.id), 2);
}

#[test]
fn changing_group_retags_seat() {
        let fx = fixture!();
        let room = fx.room("Studio", 3);
        let person = fx.profile("Switcher");
        let from = fx.group("Before", &[&person]);
        let to = fx.group("After", &[]);
        fx.rooms.assign_groups(room.id, &[from.id]).unwrap();

        let group = fx.groups.reassign_profile(person.id, to.id).unwrap();
        assert_eq!(group.id, to.id);

        let profile = fx.profiles.find_by_id(person.id).unwrap().unwrap();
        assert_eq!(profile.group.map(|g| g.id), Some(to.id));
        assert!(fx.groups.find_by_id(from.id).unwrap().unwrap().members.is_empty());

        let details = fx.rooms.find_by_id(room.id).unwrap().unwrap();
        assert_eq!(details.members.len(), 1);
        assert_eq!(details.members[0].group.as_ref().map(|g| g.id), Some(to.id));

        let missing = fx.groups.reassign_profile(person.id, fx.ids.generate().unwrap()).unwrap_err();
        assert!(matches!(missing, Problem::NotFound(_)));
}

#[test]
fn dropping_member_from_group_clears_seat_tag() {
        let fx = fixture!();
        let room = fx.room("Seminar", 4);
        let people = fx.profiles(2);
        let group = fx.group("Pair", &[&people[0], &people[1]]);
        fx.rooms.assign_groups(room.id, &[group.id]).unwrap();

        let subject_ids: Vec<i64> = fx.groups.find_subjects(group.id).unwrap().iter().map(|s| s.id).collect();
        fx.groups
                .update(group.id, group.name.clone(), None, &subject_ids, &[people[0].id])
                .unwrap();

        let details = fx.rooms.find_by_id(room.id).unwrap().unwrap();
        assert_eq!(details.members.len(), 2);
        for seat in &details.members {
                let tag = seat.group.as_ref().map(|g| g.id);
                if seat.profile.id == people[0].id {
                        assert_eq!(tag, Some(group.id));
                } else {
                        assert_eq!(tag, None);
                }
        }
}

#[test]
fn deleting_last_seated_member_unlinks_group() {
        let fx = fixture!();
        let room = fx.room("Closet", 2);
        let person = fx.profile("Leaver");
        let group = fx.group("Single", &[&person]);
        fx.rooms.assign_groups(room.id, &[group.id]).unwrap();

        let deleted = fx.profiles.delete(person.id).unwrap();
        assert_eq!(deleted.id, person.id);

        let details = fx.rooms.find_by_id(room.id).unwrap().unwrap();
        assert!(details.members.is_empty());
        assert!(details.assigned_groups.is_empty());
}
