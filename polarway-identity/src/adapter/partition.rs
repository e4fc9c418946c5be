//! Partition membership of users
//!
//! An unknown user has no partitions: every answer degrades to
//! `None` / empty / `false` rather than an error.

use std::sync::Arc;

use crate::error::Result;

use super::traits::UserStore;

pub struct UserPartitionService {
    users: Arc<dyn UserStore>,
}

impl UserPartitionService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// The explicit default partition, else the first listed one
    pub async fn default_partition(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.users.find_by_id(user_id).await?.and_then(|user| {
            user.default_partition
                .or_else(|| user.partitions.into_iter().next())
        }))
    }

    pub async fn partitions(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self
            .users
            .find_by_id(user_id)
            .await?
            .map(|user| user.partitions)
            .unwrap_or_default())
    }

    pub async fn in_partition(&self, user_id: &str, partition_id: &str) -> Result<bool> {
        Ok(self
            .users
            .find_by_id(user_id)
            .await?
            .is_some_and(|user| user.partitions.iter().any(|p| p == partition_id)))
    }
}
