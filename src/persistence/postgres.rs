//! PostgreSQL implementation of the storage capabilities.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use super::models::{BungeeRow, PlayerRow, ServerRow};
use super::{ConfigStore, PlayerRowLock, PlayerStore, ServerStore};
use crate::config::NebulaConfig;
use crate::domain::{
    BungeeConfig, Lockdown, PingStatus, PlayerProfile, PushOutcome, ServerEntry, ServerUpdate,
};
use crate::error::NebulaError;

const SERVER_COLUMNS: &str = "name, display_name, address, port, motd, fallback, lockdown, status";
const PLAYER_COLUMNS: &str = "uuid, name, current_server, latency, properties";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    /// Wraps an existing pool. Player row locks wait at most
    /// `lock_timeout`.
    #[must_use]
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Opens a pool from `config` and applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Storage`] if the database is unreachable or
    /// a migration fails.
    pub async fn connect(config: &NebulaConfig) -> Result<Self, NebulaError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(storage)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| NebulaError::Storage(e.to_string()))?;
        tracing::info!("database migrations applied");

        Ok(Self::new(pool, config.player_lock_timeout()))
    }
}

fn storage(err: sqlx::Error) -> NebulaError {
    NebulaError::Storage(err.to_string())
}

async fn upsert_player<'e, E: PgExecutor<'e>>(
    executor: E,
    profile: &PlayerProfile,
) -> Result<(), NebulaError> {
    sqlx::query(
        "INSERT INTO players (uuid, name, current_server, latency, properties) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (uuid) DO UPDATE SET name = EXCLUDED.name, \
         current_server = EXCLUDED.current_server, latency = EXCLUDED.latency, \
         properties = EXCLUDED.properties",
    )
    .bind(&profile.uuid)
    .bind(&profile.name)
    .bind(&profile.current_server)
    .bind(profile.latency)
    .bind(Json(&profile.properties))
    .execute(executor)
    .await
    .map_err(storage)?;
    Ok(())
}

#[async_trait]
impl ServerStore for PostgresStore {
    async fn insert_server(&self, entry: &ServerEntry) -> Result<(), NebulaError> {
        let result = sqlx::query(
            "INSERT INTO servers (name, display_name, address, port, motd, fallback, lockdown, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (name) DO NOTHING",
        )
        .bind(&entry.name)
        .bind(&entry.display_name)
        .bind(&entry.address)
        .bind(i32::from(entry.port))
        .bind(&entry.motd)
        .bind(entry.fallback)
        .bind(Json(&entry.lockdown))
        .bind(Json(&entry.status))
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(NebulaError::AlreadyExists(entry.name.clone()));
        }
        Ok(())
    }

    async fn delete_server(&self, name: &str) -> Result<bool, NebulaError> {
        let result = sqlx::query("DELETE FROM servers WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_server(&self, name: &str) -> Result<Option<ServerEntry>, NebulaError> {
        let row = sqlx::query_as::<_, ServerRow>(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(ServerEntry::from))
    }

    async fn list_servers(&self) -> Result<Vec<ServerEntry>, NebulaError> {
        let rows = sqlx::query_as::<_, ServerRow>(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(ServerEntry::from).collect())
    }

    async fn update_server(
        &self,
        name: &str,
        update: &ServerUpdate,
    ) -> Result<Option<ServerEntry>, NebulaError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let row = sqlx::query_as::<_, ServerRow>(&format!(
            "SELECT {SERVER_COLUMNS} FROM servers WHERE name = $1 FOR UPDATE"
        ))
        .bind(name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut entry = ServerEntry::from(row);
        update.apply(&mut entry);
        sqlx::query(
            "UPDATE servers SET display_name = $2, address = $3, port = $4, motd = $5, \
             fallback = $6 WHERE name = $1",
        )
        .bind(&entry.name)
        .bind(&entry.display_name)
        .bind(&entry.address)
        .bind(i32::from(entry.port))
        .bind(&entry.motd)
        .bind(entry.fallback)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(Some(entry))
    }

    async fn set_lockdown(
        &self,
        name: &str,
        lockdown: &Lockdown,
    ) -> Result<Option<ServerEntry>, NebulaError> {
        let row = sqlx::query_as::<_, ServerRow>(&format!(
            "UPDATE servers SET lockdown = $2 WHERE name = $1 RETURNING {SERVER_COLUMNS}"
        ))
        .bind(name)
        .bind(Json(lockdown))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(ServerEntry::from))
    }

    async fn push_status(
        &self,
        name: &str,
        status: &PingStatus,
    ) -> Result<PushOutcome, NebulaError> {
        let result = sqlx::query(
            "UPDATE servers SET status = $2 WHERE name = $1 AND status IS DISTINCT FROM $2",
        )
        .bind(name)
        .bind(Json(status))
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        if result.rows_affected() > 0 {
            return Ok(PushOutcome::Changed);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM servers WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(storage)?;
        Ok(if exists {
            PushOutcome::Unchanged
        } else {
            PushOutcome::NotFound
        })
    }
}

/// Row lock held by an open transaction; dropping it rolls back.
struct PgRowLock {
    tx: Transaction<'static, Postgres>,
    current: Option<PlayerProfile>,
}

#[async_trait]
impl PlayerRowLock for PgRowLock {
    fn current(&self) -> Option<&PlayerProfile> {
        self.current.as_ref()
    }

    async fn commit(self: Box<Self>, profile: PlayerProfile) -> Result<(), NebulaError> {
        let mut tx = self.tx;
        upsert_player(&mut *tx, &profile).await?;
        tx.commit().await.map_err(storage)
    }
}

#[async_trait]
impl PlayerStore for PostgresStore {
    async fn lock_player(&self, uuid: &str) -> Result<Box<dyn PlayerRowLock>, NebulaError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let timeout = format!("{}ms", self.lock_timeout.as_millis());
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(timeout)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE uuid = $1 FOR UPDATE"
        ))
        .bind(uuid)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        Ok(Box::new(PgRowLock {
            tx,
            current: row.map(PlayerProfile::from),
        }))
    }

    async fn get_player(&self, uuid: &str) -> Result<Option<PlayerProfile>, NebulaError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE uuid = $1"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(PlayerProfile::from))
    }

    async fn list_online_players(&self) -> Result<Vec<PlayerProfile>, NebulaError> {
        let rows = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE current_server <> '' ORDER BY uuid"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(PlayerProfile::from).collect())
    }

    async fn upsert_players(&self, profiles: &[PlayerProfile]) -> Result<(), NebulaError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        for profile in profiles {
            upsert_player(&mut *tx, profile).await?;
        }
        tx.commit().await.map_err(storage)
    }
}

#[async_trait]
impl ConfigStore for PostgresStore {
    async fn get_bungee(&self) -> Result<BungeeConfig, NebulaError> {
        let row = sqlx::query_as::<_, BungeeRow>("SELECT motd, favicon FROM bungee WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(BungeeConfig::from).unwrap_or_default())
    }

    async fn set_motd(&self, motd: &str) -> Result<BungeeConfig, NebulaError> {
        let row = sqlx::query_as::<_, BungeeRow>(
            "INSERT INTO bungee (id, motd) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET motd = EXCLUDED.motd RETURNING motd, favicon",
        )
        .bind(motd)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.into())
    }

    async fn set_favicon(&self, favicon: &str) -> Result<BungeeConfig, NebulaError> {
        let row = sqlx::query_as::<_, BungeeRow>(
            "INSERT INTO bungee (id, favicon) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET favicon = EXCLUDED.favicon RETURNING motd, favicon",
        )
        .bind(favicon)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.into())
    }
}
