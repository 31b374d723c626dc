use super::{ChatSession, Message};
use crate::llm::Role;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;

/// Where chat sessions live between runs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Every session, most recently updated first
    async fn load_all(&self) -> Result<Vec<ChatSession>, sqlx::Error>;

    /// Insert or fully replace one session
    async fn save(&self, session: &ChatSession) -> Result<(), sqlx::Error>;

    async fn delete(&self, session_id: &str) -> Result<(), sqlx::Error>;
}

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let database_url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        let store = SqliteSessionStore { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_session
            ON chat_messages(session_id, position)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_messages(&self, session_id: &str) -> Result<Vec<Message>, sqlx::Error> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            "SELECT id, role, content, timestamp FROM chat_messages WHERE session_id = ? ORDER BY position",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, role, content, timestamp)| {
                Ok(Message {
                    id,
                    role: parse_role(&role)?,
                    content,
                    timestamp,
                })
            })
            .collect()
    }
}

fn parse_role(role: &str) -> Result<Role, sqlx::Error> {
    match role {
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        other => Err(sqlx::Error::Decode(
            format!("unknown message role: {}", other).into(),
        )),
    }
}

#[async_trait::async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load_all(&self) -> Result<Vec<ChatSession>, sqlx::Error> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            "SELECT id, title, created_at, updated_at FROM chat_sessions ORDER BY updated_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for (id, title, created_at, updated_at) in rows {
            let messages = self.load_messages(&id).await?;
            sessions.push(ChatSession {
                id,
                title,
                messages,
                created_at,
                updated_at,
            });
        }

        Ok(sessions)
    }

    async fn save(&self, session: &ChatSession) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&session.id)
        .bind(&session.title)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM chat_messages WHERE session_id = ?")
            .bind(&session.id)
            .execute(&mut *tx)
            .await?;

        for (position, message) in session.messages.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chat_messages (id, session_id, position, role, content, timestamp)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&message.id)
            .bind(&session.id)
            .bind(position as i64)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    async fn delete(&self, session_id: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chat_messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM chat_sessions WHERE id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }
}
