//! The in-memory keyspace.
//!
//! A [`Database`] is a cheaply cloneable handle over mutex-guarded state, so
//! connection tasks and expiry timers can all hold one. Every stored field
//! carries a version stamped at insertion time; a scheduled removal only
//! fires if the key still holds the version captured when the removal was
//! scheduled, so an old expiry can never evict a newer value.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use tokio::sync::Mutex;

use crate::rdb::{DatabaseImage, ResizeHints};

/// A stored value. Only strings are live today; the enum leaves room for
/// further type tags.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
    pub expires_at: Option<Timestamp>,
    version: u64,
}

#[derive(Debug)]
struct DatabaseState {
    id: usize,
    resize_hints: Option<ResizeHints>,
    fields: HashMap<String, Field>,
    next_version: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    state: Arc<Mutex<DatabaseState>>,
}

impl Database {
    pub fn new(id: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(DatabaseState {
                id,
                resize_hints: None,
                fields: HashMap::new(),
                next_version: 0,
            })),
        }
    }

    /// Builds a database from a decoded snapshot section, installing every
    /// field and scheduling removals for the ones that carry an expiry.
    pub async fn from_image(image: DatabaseImage) -> Self {
        let database = Database::new(image.id);

        {
            let mut state = database.state.lock().await;
            state.resize_hints = image.resize_hints;
        }

        for (_, field) in image.fields {
            database
                .install(field.key, field.value, field.expires_at)
                .await;
        }

        database
    }

    pub async fn id(&self) -> usize {
        self.state.lock().await.id
    }

    pub async fn resize_hints(&self) -> Option<ResizeHints> {
        self.state.lock().await.resize_hints
    }

    /// Stores `value` under `key`, superseding any existing field. With an
    /// expiry the removal is scheduled immediately, guarded by the new
    /// field's version.
    pub async fn set(&self, key: String, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.and_then(instant_after);
        self.install(key, FieldValue::String(value), expires_at).await;
    }

    /// Returns the string value under `key`, treating fields whose expiry
    /// has passed as absent and removing them on the spot.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut state = self.state.lock().await;

        let expires_at = state.fields.get(key)?.expires_at;
        if let Some(expires_at) = expires_at {
            if Timestamp::now() > expires_at {
                state.fields.remove(key);
                return None;
            }
        }

        match &state.fields.get(key)?.value {
            FieldValue::String(value) => Some(value.clone()),
        }
    }

    pub async fn unset(&self, key: &str) {
        self.state.lock().await.fields.remove(key);
    }

    /// Schedules an unset of `key` at `now + duration`. The removal is
    /// guarded by the version the key holds right now, so it becomes a no-op
    /// once the key is overwritten.
    pub async fn unset_after(&self, duration: Duration, key: &str) {
        let version = {
            let state = self.state.lock().await;
            match state.fields.get(key) {
                Some(field) => field.version,
                None => return,
            }
        };

        self.spawn_guarded_removal(key.to_string(), version, duration);
    }

    /// Snapshot of the current key set.
    pub async fn keys(&self) -> Vec<String> {
        self.state.lock().await.fields.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.fields.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.fields.is_empty()
    }

    async fn install(&self, key: String, value: FieldValue, expires_at: Option<Timestamp>) {
        let version = {
            let mut state = self.state.lock().await;
            let version = state.next_version;
            state.next_version += 1;

            state.fields.insert(
                key.clone(),
                Field {
                    key: key.clone(),
                    value,
                    expires_at,
                    version,
                },
            );
            version
        };

        if let Some(expires_at) = expires_at {
            self.spawn_guarded_removal(key, version, duration_until(expires_at));
        }
    }

    fn spawn_guarded_removal(&self, key: String, version: u64, delay: Duration) {
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut state = state.lock().await;
            let matches_version = state
                .fields
                .get(&key)
                .is_some_and(|field| field.version == version);

            if matches_version {
                state.fields.remove(&key);
            }
        });
    }
}

fn instant_after(duration: Duration) -> Option<Timestamp> {
    let expires_ms = Timestamp::now()
        .as_millisecond()
        .checked_add(duration.as_millis() as i64)?;
    Timestamp::from_millisecond(expires_ms).ok()
}

fn duration_until(instant: Timestamp) -> Duration {
    let delay_ms = instant.as_millisecond() - Timestamp::now().as_millisecond();
    Duration::from_millis(delay_ms.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let database = Database::new(0);

        database.set("foo".to_string(), "bar".to_string(), None).await;
        assert_eq!(database.get("foo").await, Some("bar".to_string()));

        database.set("foo".to_string(), "baz".to_string(), None).await;
        assert_eq!(database.get("foo").await, Some("baz".to_string()));
    }

    #[tokio::test]
    async fn test_unset() {
        let database = Database::new(0);

        database.set("foo".to_string(), "bar".to_string(), None).await;
        database.unset("foo").await;
        assert_eq!(database.get("foo").await, None);
    }

    #[tokio::test]
    async fn test_expired_field_reads_as_absent() {
        let database = Database::new(0);
        let past = Timestamp::from_second(1).unwrap();

        database
            .install(
                "stale".to_string(),
                FieldValue::String("value".to_string()),
                Some(past),
            )
            .await;

        assert_eq!(database.get("stale").await, None);
        assert_eq!(database.len().await, 0);
    }

    #[tokio::test]
    async fn test_from_image_installs_fields() {
        use std::collections::HashMap;

        use crate::rdb::FieldImage;

        let image = DatabaseImage {
            id: 3,
            resize_hints: Some(ResizeHints {
                hash_table_size: 2,
                expire_hash_table_size: 0,
            }),
            fields: HashMap::from([
                (
                    "a".to_string(),
                    FieldImage {
                        key: "a".to_string(),
                        value: FieldValue::String("1".to_string()),
                        expires_at: None,
                    },
                ),
                (
                    "b".to_string(),
                    FieldImage {
                        key: "b".to_string(),
                        value: FieldValue::String("2".to_string()),
                        expires_at: None,
                    },
                ),
            ]),
        };

        let database = Database::from_image(image).await;
        assert_eq!(database.id().await, 3);
        assert_eq!(database.get("a").await, Some("1".to_string()));
        assert_eq!(database.get("b").await, Some("2".to_string()));
        assert_eq!(
            database.resize_hints().await,
            Some(ResizeHints {
                hash_table_size: 2,
                expire_hash_table_size: 0,
            })
        );
    }
}
