use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{info, warn};

use matchday_common::{FixtureKey, Snapshot};

/// Durable fixture snapshots keyed by [`FixtureKey`]. No expiry; last write wins.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &FixtureKey) -> Result<Option<Snapshot>>;
    async fn put(&self, key: &FixtureKey, snapshot: &Snapshot) -> Result<()>;
}

// =============================================================================
// Postgres
// =============================================================================

pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the `match_snapshots` table up to date.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run snapshot migrations")?;
        info!("Snapshot store migrations applied");
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn get(&self, key: &FixtureKey) -> Result<Option<Snapshot>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT data FROM match_snapshots WHERE id = $1")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;

        let Some((data,)) = row else {
            return Ok(None);
        };

        // Rows written under an older snapshot shape are re-scraped, not fatal.
        match serde_json::from_value::<Snapshot>(data) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(fixture = %key, error = %e, "Stored snapshot no longer decodes, treating as miss");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &FixtureKey, snapshot: &Snapshot) -> Result<()> {
        sqlx::query(
            "INSERT INTO match_snapshots (id, home_team, away_team, data, updated_at)
             VALUES ($1, $2, $3, $4, now())
             ON CONFLICT (id)
             DO UPDATE SET home_team = EXCLUDED.home_team,
                           away_team = EXCLUDED.away_team,
                           data = EXCLUDED.data,
                           updated_at = now()",
        )
        .bind(key.as_str())
        .bind(snapshot.home_team())
        .bind(snapshot.away_team())
        .bind(sqlx::types::Json(snapshot))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<FixtureKey, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an already-assembled snapshot.
    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.entries
            .get_mut()
            .insert(snapshot.id().clone(), snapshot);
        self
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, key: &FixtureKey) -> Result<Option<Snapshot>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &FixtureKey, snapshot: &Snapshot) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.clone(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::snapshot_for;

    #[tokio::test]
    async fn memory_store_round_trips_by_key() {
        let store = MemorySnapshotStore::new();
        let key = FixtureKey::new("Arsenal", "Chelsea");
        assert!(store.get(&key).await.unwrap().is_none());

        let snapshot = snapshot_for("Arsenal", "Chelsea");
        store.put(&key, &snapshot).await.unwrap();

        let lookup = FixtureKey::new(" arsenal", "CHELSEA ");
        assert_eq!(store.get(&lookup).await.unwrap(), Some(snapshot));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn later_put_replaces_earlier() {
        let store = MemorySnapshotStore::new();
        let key = FixtureKey::new("Arsenal", "Chelsea");

        store.put(&key, &snapshot_for("Arsenal", "Chelsea")).await.unwrap();
        let replacement = snapshot_for("ARSENAL", "CHELSEA");
        store.put(&key, &replacement).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&key).await.unwrap().unwrap().home_team(), "ARSENAL");
    }

    #[tokio::test]
    async fn primed_store_serves_snapshot() {
        let store = MemorySnapshotStore::new().with_snapshot(snapshot_for("Leeds", "Everton"));
        let hit = store.get(&FixtureKey::new("Leeds", "Everton")).await.unwrap();
        assert!(hit.is_some());
    }
}
