//! SQLite-backed user store: the only state that survives restarts.

use sqlx::FromRow;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Scoreboard rows returned to clients.
pub const SCOREBOARD_LIMIT: i64 = 10;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    wins INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)";

/// A persisted account row.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub wins: i64,
    pub created_at: String,
}

/// One scoreboard entry.
#[derive(Debug, Clone, FromRow)]
pub struct Leader {
    pub username: String,
    pub wins: i64,
}

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("username already taken")]
    UsernameTaken,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Handle over the users table. Cheap to clone; the pool is shared.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Open the pool and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        // An in-memory SQLite database exists per connection; more than one
        // pooled connection would each see their own empty schema.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Insert a fresh account; usernames are unique.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, UserStoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "invalid-timestamp".into());

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, password_hash, wins, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(&created_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(UserRecord {
                id,
                username: username.into(),
                password_hash: password_hash.into(),
                wins: 0,
                created_at,
            }),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(UserStoreError::UsernameTaken)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password_hash, wins, created_at \
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password_hash, wins, created_at \
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Top winners, ties broken by username.
    pub async fn top_winners(&self) -> Result<Vec<Leader>, sqlx::Error> {
        sqlx::query_as::<_, Leader>(
            "SELECT username, wins FROM users \
             ORDER BY wins DESC, username ASC LIMIT ?",
        )
        .bind(SCOREBOARD_LIMIT)
        .fetch_all(&self.pool)
        .await
    }

    /// Atomic `wins += 1`. Returns whether a row matched.
    pub async fn award_win(&self, username: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET wins = wins + 1 WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cheap reachability probe for the health check.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> UserStore {
        UserStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn signup_enforces_unique_usernames() {
        let store = memory_store().await;
        store.create("alice", "hash-a").await.unwrap();

        let err = store.create("alice", "hash-b").await.unwrap_err();
        assert!(matches!(err, UserStoreError::UsernameTaken));
    }

    #[tokio::test]
    async fn lookup_round_trips_by_name_and_id() {
        let store = memory_store().await;
        let created = store.create("alice", "hash").await.unwrap();

        let by_name = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.wins, 0);

        let by_id = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scoreboard_orders_by_wins_then_username() {
        let store = memory_store().await;
        for name in ["carol", "alice", "bob"] {
            store.create(name, "hash").await.unwrap();
        }
        for _ in 0..2 {
            assert!(store.award_win("bob").await.unwrap());
        }
        assert!(store.award_win("carol").await.unwrap());
        assert!(store.award_win("alice").await.unwrap());

        let leaders = store.top_winners().await.unwrap();
        let names: Vec<&str> = leaders.iter().map(|l| l.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice", "carol"]);
        assert_eq!(leaders[0].wins, 2);
    }

    #[tokio::test]
    async fn awarding_an_unknown_user_matches_no_row() {
        let store = memory_store().await;
        assert!(!store.award_win("ghost").await.unwrap());
    }
}
