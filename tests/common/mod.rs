#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use seating_api::ids::IdGenerator;
use seating_api::models::{Group, Profile, Room, Subject};
use seating_api::repositories::catalog_repository::CatalogRepository;
use seating_api::repositories::group_repository::GroupRepository;
use seating_api::repositories::notification_repository::NotificationRepository;
use seating_api::repositories::profile_repository::ProfileRepository;
use seating_api::repositories::room_repository::RoomRepository;
use seating_api::{run_migrations, DbPool};

static DATABASE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A throwaway database created next to the one `TEST_DATABASE_URL` points at.
pub struct TestDb {
        pub pool: DbPool,
        admin_url: String,
        name: String,
}

impl TestDb {
        pub fn create() -> Option<TestDb> {
                let admin_url = std::env::var("TEST_DATABASE_URL").ok()?;
                let (server, _) = admin_url.rsplit_once('/')?;

                let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
                let name = format!(
                        "seating_test_{}_{}_{}",
                        std::process::id(),
                        nanos,
                        DATABASE_COUNTER.fetch_add(1, Ordering::SeqCst)
                );

                let mut admin = PgConnection::establish(&admin_url).unwrap();
                diesel::sql_query(format!("CREATE DATABASE {name}")).execute(&mut admin).unwrap();

                let manager = ConnectionManager::<PgConnection>::new(format!("{server}/{name}"));
                let pool = Pool::builder().max_size(16).build(manager).unwrap();
                run_migrations(&pool).unwrap();

                Some(TestDb { pool, admin_url, name })
        }
}

impl Drop for TestDb {
        fn drop(&mut self) {
                if let Ok(mut admin) = PgConnection::establish(&self.admin_url) {
                        let _ = diesel::sql_query(format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.name))
                                .execute(&mut admin);
                }
        }
}

/// Repositories wired to a fresh database plus helpers for seeding rows.
pub struct Fixture {
        pub ids: IdGenerator,
        pub catalog: CatalogRepository,
        pub groups: GroupRepository,
        pub notifications: NotificationRepository,
        pub profiles: ProfileRepository,
        pub rooms: RoomRepository,
        pub db: TestDb,
}

impl Fixture {
        pub fn new(db: TestDb) -> Self {
                Fixture {
                        ids: IdGenerator::new(1, 1),
                        catalog: CatalogRepository::new(db.pool.clone()),
                        groups: GroupRepository::new(db.pool.clone()),
                        notifications: NotificationRepository::new(db.pool.clone()),
                        profiles: ProfileRepository::new(db.pool.clone()),
                        rooms: RoomRepository::new(db.pool.clone()),
                        db,
                }
        }

        pub fn room(&self, name: &str, max_capacity: i32) -> Room {
                let now = Utc::now().naive_utc();
                self.rooms
                        .save(Room {
                                id: self.ids.generate().unwrap(),
                                created_at: now,
                                updated_at: now,
                                name: name.to_string(),
                                description: None,
                                max_capacity,
                        })
                        .unwrap()
        }

        pub fn profile(&self, first_name: &str) -> Profile {
                let now = Utc::now().naive_utc();
                self.profiles
                        .create(
                                Profile {
                                        id: self.ids.generate().unwrap(),
                                        created_at: now,
                                        updated_at: now,
                                        first_name: first_name.to_string(),
                                        last_name: "Tester".to_string(),
                                        age: 30,
                                        message: None,
                                        avatar_url: None,
                                },
                                &[],
                        )
                        .unwrap()
                        .profile
        }

        pub fn profiles(&self, count: usize) -> Vec<Profile> {
                (0..count).map(|i| self.profile(&format!("Person{i:02}"))).collect()
        }

        pub fn group(&self, name: &str, members: &[&Profile]) -> Group {
                let subject = self
                        .catalog
                        .save_subject(Subject {
                                id: self.ids.generate().unwrap(),
                                name: format!("{name} subject"),
                        })
                        .unwrap();
                let now = Utc::now().naive_utc();
                let member_ids: Vec<i64> = members.iter().map(|p| p.id).collect();

                self.groups
                        .create(
                                Group {
                                        id: self.ids.generate().unwrap(),
                                        created_at: now,
                                        updated_at: now,
                                        name: name.to_string(),
                                        description: None,
                                },
                                &[subject.id],
                                &member_ids,
                        )
                        .unwrap()
        }

        pub fn seated_count(&self, room_id: i64) -> i64 {
                self.rooms
                        .find_all()
                        .unwrap()
                        .into_iter()
                        .find(|occupancy| occupancy.room.id == room_id)
                        .map(|occupancy| occupancy.current_count)
                        .unwrap()
        }
}

macro_rules! fixture {
        () => {
                match common::TestDb::create() {
                        Some(db) => common::Fixture::new(db),
                        None => {
                                eprintln!("TEST_DATABASE_URL not set, skipping");
                                return;
                        }
                }
        };
}

#[allow(unused_imports)]
pub(crate) use fixture;
