use std::sync::{Arc, Mutex};

use snowflake::SnowflakeIdGenerator;
use tracing::error;

use crate::errors::problem::Problem;

/// Shared snowflake generator. Every table keyed by `BIGINT` takes its ids from here.
#[derive(Clone)]
pub struct IdGenerator {
        inner: Arc<Mutex<SnowflakeIdGenerator>>,
}

impl IdGenerator {
        pub fn new(machine_id: i32, node_id: i32) -> Self {
                Self {
                        inner: Arc::new(Mutex::new(SnowflakeIdGenerator::new(machine_id, node_id))),
                }
        }

        pub fn generate(&self) -> Result<i64, Problem> {
                let mut generator = self.inner.lock().map_err(|_| {
                        error!("id generator lock poisoned");
                        Problem::InternalServerError("failed to generate id".to_string())
                })?;

                Ok(generator.generate())
        }
}

impl std::fmt::Debug for IdGenerator {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct("IdGenerator").finish_non_exhaustive()
        }
}

#[cfg(test)]
mod tests {
        use std::collections::HashSet;

        use super::*;

        #[test]
        fn generates_unique_ids() {
                let ids = IdGenerator::new(1, 1);

                let generated: HashSet<i64> = (0..1000).map(|_| ids.generate().unwrap()).collect();

                assert_eq!(generated.len(), 1000);
        }
}
