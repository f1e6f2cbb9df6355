use chrono::Utc;
use derive_new::new;
use diesel::prelude::*;

use crate::errors::problem::Problem;
use crate::models::User;
use crate::schema::{profiles, users};
use crate::DbPool;

#[derive(new, Debug, Clone)]
pub struct UserRepository {
        pool: DbPool,
}

impl UserRepository {
        pub fn find_by_id(&self, user_id: i64) -> Result<Option<User>, Problem> {
                let mut connection = self.pool.get()?;

                Ok(users::table.find(user_id).first(&mut connection).optional()?)
        }

        pub fn find_by_email(&self, email: &str) -> Result<Option<User>, Problem> {
                let mut connection = self.pool.get()?;

                Ok(users::table
                        .filter(users::email.eq(email.to_lowercase()))
                        .first(&mut connection)
                        .optional()?)
        }

        pub fn exists_by_email(&self, email: &str) -> Result<bool, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::select(diesel::dsl::exists(users::table.filter(users::email.eq(email.to_lowercase()))))
                        .get_result(&mut connection)?)
        }

        pub fn save(&self, user: User) -> Result<User, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::insert_into(users::table)
                        .values(&user)
                        .on_conflict(users::id)
                        .do_update()
                        .set(&user)
                        .get_result(&mut connection)?)
        }

        pub fn record_login(&self, user_id: i64) -> Result<User, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::update(users::table.find(user_id))
                        .set(users::last_login.eq(Some(Utc::now().naive_utc())))
                        .get_result(&mut connection)?)
        }

        pub fn link_profile(&self, user_id: i64, profile_id: i64) -> Result<User, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let profile_exists = diesel::select(diesel::dsl::exists(profiles::table.find(profile_id)))
                                .get_result::<bool>(connection)?;
                        if !profile_exists {
                                return Err(Problem::NotFound("Profile not found".to_string()));
                        }

                        diesel::update(users::table.find(user_id))
                                .set((
                                        users::profile_id.eq(Some(profile_id)),
                                        users::updated_at.eq(Utc::now().naive_utc()),
                                ))
                                .get_result::<User>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("User not found".to_string()))
                })
        }
}
