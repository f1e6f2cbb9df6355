use derive_new::new;
use diesel::prelude::*;

use crate::errors::problem::Problem;
use crate::models::{Profession, Subject};
use crate::schema::{professions, subjects};
use crate::DbPool;

/// Reference lists: the professions a profile may carry and the subjects a group may study.
#[derive(new, Debug, Clone)]
pub struct CatalogRepository {
        pool: DbPool,
}

impl CatalogRepository {
        pub fn find_professions(&self) -> Result<Vec<Profession>, Problem> {
                let mut connection = self.pool.get()?;

                Ok(professions::table.order_by(professions::name).load(&mut connection)?)
        }

        pub fn save_profession(&self, profession: Profession) -> Result<Profession, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::insert_into(professions::table)
                        .values(&profession)
                        .get_result(&mut connection)?)
        }

        pub fn find_subjects(&self) -> Result<Vec<Subject>, Problem> {
                let mut connection = self.pool.get()?;

                Ok(subjects::table.order_by(subjects::name).load(&mut connection)?)
        }

        pub fn save_subject(&self, subject: Subject) -> Result<Subject, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::insert_into(subjects::table).values(&subject).get_result(&mut connection)?)
        }
}
