//! In-memory [`UserRepository`], keyed by GitHub username.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::contract::UserRepository;
use crate::error::RepositoryError;
use crate::model::UserRecord;

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    records: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.github_username.clone(), r))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self.records.read().await.get(username).cloned())
    }

    async fn save(&self, record: UserRecord) -> Result<(), RepositoryError> {
        self.records
            .write()
            .await
            .insert(record.github_username.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str, token: &str) -> UserRecord {
        UserRecord {
            github_username: username.into(),
            access_token: token.into(),
            display_name: None,
            email: None,
            stream_id: None,
            write_token: None,
            watermark: None,
        }
    }

    #[tokio::test]
    async fn save_replaces_the_record_for_a_username() {
        let repo = InMemoryUserRepository::with_records([record("octo", "old")]);
        repo.save(record("octo", "new")).await.unwrap();

        let found = repo.find_by_username("octo").await.unwrap().unwrap();
        assert_eq!(found.access_token, "new");
        assert!(repo.find_by_username("ghost").await.unwrap().is_none());
    }
}
