//! Subject storage: the durable half of the Session Service.
//!
//! A token is stateless verification material; the `Subject` row is the
//! durable record of a session, and is what session GC acts on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use phylo_common::Error;

/// A server-minted session identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Subject {
    pub subject: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Look up a subject's session row.
    async fn find(&self, subject: &str) -> Result<Option<Subject>, Error>;

    /// Insert a freshly minted subject.
    async fn create(&self, subject: &str) -> Result<Subject, Error>;

    /// Bump `last_seen` to now. No-op (not an error) if the subject is gone.
    async fn touch(&self, subject: &str) -> Result<(), Error>;

    /// Delete a subject's session row. Callers are responsible for any
    /// cascading deletes of owned datasets/jobs in their own repositories.
    async fn delete(&self, subject: &str) -> Result<(), Error>;

    /// Delete and return every subject whose `last_seen` is older than
    /// `max_idle_secs`. Used by the session GC sweep.
    async fn gc_idle(&self, max_idle_secs: i64) -> Result<Vec<String>, Error>;
}

pub struct PgSessionRepository {
    pool: sqlx::PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find(&self, subject: &str) -> Result<Option<Subject>, Error> {
        let row: Option<Subject> = sqlx::query_as(
            "SELECT subject, created_at, last_seen FROM sessions WHERE subject = $1",
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create(&self, subject: &str) -> Result<Subject, Error> {
        let row: Subject = sqlx::query_as(
            r#"
            INSERT INTO sessions (subject, created_at, last_seen)
            VALUES ($1, NOW(), NOW())
            ON CONFLICT (subject) DO UPDATE SET last_seen = NOW()
            RETURNING subject, created_at, last_seen
            "#,
        )
        .bind(subject)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn touch(&self, subject: &str) -> Result<(), Error> {
        sqlx::query("UPDATE sessions SET last_seen = NOW() WHERE subject = $1")
            .bind(subject)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, subject: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM sessions WHERE subject = $1")
            .bind(subject)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn gc_idle(&self, max_idle_secs: i64) -> Result<Vec<String>, Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "DELETE FROM sessions WHERE last_seen < NOW() - make_interval(secs => $1) RETURNING subject",
        )
        .bind(max_idle_secs as f64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }
}

/// In-memory `SessionRepository`, used for tests and for exercising the
/// core without a live Postgres instance.
pub struct InMemorySessionRepository {
    sessions: tokio::sync::RwLock<std::collections::HashMap<String, Subject>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self {
            sessions: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find(&self, subject: &str) -> Result<Option<Subject>, Error> {
        Ok(self.sessions.read().await.get(subject).cloned())
    }

    async fn create(&self, subject: &str) -> Result<Subject, Error> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let row = sessions
            .entry(subject.to_string())
            .and_modify(|s| s.last_seen = now)
            .or_insert_with(|| Subject {
                subject: subject.to_string(),
                created_at: now,
                last_seen: now,
            });
        Ok(row.clone())
    }

    async fn touch(&self, subject: &str) -> Result<(), Error> {
        if let Some(row) = self.sessions.write().await.get_mut(subject) {
            row.last_seen = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, subject: &str) -> Result<(), Error> {
        self.sessions.write().await.remove(subject);
        Ok(())
    }

    async fn gc_idle(&self, max_idle_secs: i64) -> Result<Vec<String>, Error> {
        let cutoff = Utc::now() - chrono::Duration::seconds(max_idle_secs);
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .values()
            .filter(|s| s.last_seen < cutoff)
            .map(|s| s.subject.clone())
            .collect();
        for subject in &expired {
            sessions.remove(subject);
        }
        Ok(expired)
    }
}
