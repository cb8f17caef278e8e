// ABOUTME: SQLite record store for conversations, messages, image metadata and preferences
// ABOUTME: Enforces conversation ownership on the message stub and maps constraint failures to typed errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wingman_core::models::{
    ImageRecord, MessageRecord, Sender, SimpPreference, UserPreferences,
};

use crate::errors::{AppError, AppResult};
use crate::storage::{PreferencesStore, RecordStore, RecordStoreError};

/// Pool size for file-backed databases
const FILE_POOL_SIZE: u32 = 5;

// ============================================================================
// Database Record Types
// ============================================================================

/// Database representation of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Unique conversation ID
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Title, usually the generated nickname
    pub title: Option<String>,
    /// When the conversation was created (RFC 3339)
    pub created_at: String,
    /// Last activity (RFC 3339)
    pub updated_at: String,
}

// ============================================================================
// Store
// ============================================================================

/// `SQLite`-backed record and preferences store
#[derive(Debug, Clone)]
pub struct SqliteChatStore {
    pool: SqlitePool,
}

fn store_error(context: &str, e: &sqlx::Error) -> RecordStoreError {
    if let sqlx::Error::Database(db_error) = e {
        if db_error.is_foreign_key_violation() {
            return RecordStoreError::ForeignKeyViolation;
        }
    }
    RecordStoreError::Other(format!("{context}: {e}"))
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> MessageRecord {
    let sender: String = row.get("sender");
    MessageRecord {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender: if sender == Sender::Ai.as_str() {
            Sender::Ai
        } else {
            Sender::User
        },
        content: row.get("content"),
        image_description: row.get("image_description"),
        created_at: row.get("created_at"),
    }
}

impl SqliteChatStore {
    /// Connect to `database_url` and create the schema
    ///
    /// In-memory databases get a single connection so every query sees the
    /// same database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection fails or the
    /// schema cannot be created
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid DATABASE_URL {database_url}: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = database_url.contains(":memory:");
        if !in_memory {
            let parent = options
                .get_filename()
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty());
            if let Some(parent) = parent {
                create_parent_dir(parent).await?;
            }
        }

        let pool_options = if in_memory {
            // The database lives only as long as its single connection
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(FILE_POOL_SIZE)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::persistence(format!("Failed to connect to database: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        info!(in_memory, "Database ready");
        Ok(store)
    }

    /// Wrap an existing pool; the caller is responsible for [`Self::migrate`]
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_conversations_user
                ON conversations(user_id, updated_at DESC)
            ",
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                sender TEXT NOT NULL CHECK (sender IN ('user', 'ai')),
                content TEXT,
                image_description TEXT,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_conversation
                ON messages(conversation_id, created_at)
            ",
            r"
            CREATE TABLE IF NOT EXISTS images (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                storage_path TEXT NOT NULL,
                filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                filesize INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS user_preferences (
                user_id TEXT PRIMARY KEY,
                preferences_text TEXT NOT NULL DEFAULT '',
                preferred_country TEXT NOT NULL DEFAULT 'auto',
                simp_preference TEXT NOT NULL DEFAULT 'auto',
                updated_at TEXT NOT NULL
            )
            ",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::persistence(format!("Failed to run migration: {e}")))?;
        }
        Ok(())
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    /// Create a conversation owned by `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    pub async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> AppResult<ConversationRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO conversations (id, user_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to create conversation: {e}")))?;

        Ok(ConversationRecord {
            id,
            user_id: user_id.to_owned(),
            title: title.map(ToOwned::to_owned),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a conversation owned by `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, created_at, updated_at
            FROM conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to get conversation: {e}")))?;

        Ok(row.map(|r| ConversationRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }

    /// Messages of a conversation in creation order
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_messages(&self, conversation_id: &str) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, sender, content, image_description, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to list messages: {e}")))?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    /// Image metadata attached to a message
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn list_images(&self, message_id: &str) -> AppResult<Vec<ImageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT message_id, storage_path, filename, content_type, filesize
            FROM images
            WHERE message_id = $1
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to list images: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| ImageRecord {
                message_id: r.get("message_id"),
                storage_path: r.get("storage_path"),
                filename: r.get("filename"),
                content_type: r.get("content_type"),
                filesize: u64::try_from(r.get::<i64, _>("filesize")).unwrap_or(0),
            })
            .collect())
    }

    /// Insert or replace a user's preferences
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails
    pub async fn save_preferences(
        &self,
        user_id: &str,
        preferences: &UserPreferences,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_preferences (user_id, preferences_text, preferred_country, simp_preference, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT(user_id) DO UPDATE SET
                preferences_text = excluded.preferences_text,
                preferred_country = excluded.preferred_country,
                simp_preference = excluded.simp_preference,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id)
        .bind(&preferences.text)
        .bind(&preferences.preferred_country)
        .bind(preferences.simp_preference.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to save preferences: {e}")))?;

        Ok(())
    }

    async fn insert_message(
        &self,
        conversation_id: &str,
        sender: Sender,
        content: Option<&str>,
    ) -> Result<MessageRecord, RecordStoreError> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO messages (id, conversation_id, sender, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(sender.as_str())
        .bind(content)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to insert message", &e))?;

        Ok(MessageRecord {
            id,
            conversation_id: conversation_id.to_owned(),
            sender,
            content: content.map(ToOwned::to_owned),
            image_description: None,
            created_at: now,
        })
    }
}

async fn create_parent_dir(parent: &Path) -> AppResult<()> {
    tokio::fs::create_dir_all(parent).await.map_err(|e| {
        AppError::persistence(format!(
            "Failed to create database directory {}: {e}",
            parent.display()
        ))
    })
}

#[async_trait]
impl RecordStore for SqliteChatStore {
    async fn insert_message_stub(
        &self,
        user_id: &str,
        conversation_id: &str,
        content: Option<&str>,
    ) -> Result<MessageRecord, RecordStoreError> {
        let owner: Option<String> =
            sqlx::query_scalar(r"SELECT user_id FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to look up conversation", &e))?;

        match owner {
            Some(owner) if owner == user_id => {}
            Some(_) => {
                warn!(conversation_id, "Conversation belongs to another user");
                return Err(RecordStoreError::ForeignKeyViolation);
            }
            None => return Err(RecordStoreError::ForeignKeyViolation),
        }

        self.insert_message(conversation_id, Sender::User, content).await
    }

    async fn touch_conversation(&self, conversation_id: &str) -> Result<(), RecordStoreError> {
        sqlx::query(r"UPDATE conversations SET updated_at = $1 WHERE id = $2")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(conversation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to touch conversation", &e))?;
        Ok(())
    }

    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), RecordStoreError> {
        let result =
            sqlx::query(r"UPDATE conversations SET title = $1, updated_at = $2 WHERE id = $3")
                .bind(title)
                .bind(chrono::Utc::now().to_rfc3339())
                .bind(conversation_id)
                .execute(&self.pool)
                .await
                .map_err(|e| store_error("Failed to update conversation title", &e))?;

        if result.rows_affected() == 0 {
            return Err(RecordStoreError::Other(format!(
                "Conversation {conversation_id} not found"
            )));
        }
        Ok(())
    }

    async fn update_message_image_description(&self, message_id: &str, description: &str) -> bool {
        let result = sqlx::query(r"UPDATE messages SET image_description = $1 WHERE id = $2")
            .bind(description)
            .bind(message_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => done.rows_affected() > 0,
            Err(e) => {
                warn!(message_id, error = %e, "Failed to update image description");
                false
            }
        }
    }

    async fn insert_image_records(&self, records: &[ImageRecord]) -> Result<(), RecordStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", &e))?;
        let now = chrono::Utc::now().to_rfc3339();

        for record in records {
            sqlx::query(
                r"
                INSERT INTO images (id, message_id, storage_path, filename, content_type, filesize, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&record.message_id)
            .bind(&record.storage_path)
            .bind(&record.filename)
            .bind(&record.content_type)
            .bind(i64::try_from(record.filesize).unwrap_or(i64::MAX))
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| store_error("Failed to insert image record", &e))?;
        }

        tx.commit()
            .await
            .map_err(|e| store_error("Failed to commit image records", &e))?;
        debug!(count = records.len(), "Inserted image records");
        Ok(())
    }

    async fn insert_ai_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<MessageRecord, RecordStoreError> {
        self.insert_message(conversation_id, Sender::Ai, Some(content))
            .await
    }
}

#[async_trait]
impl PreferencesStore for SqliteChatStore {
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences, RecordStoreError> {
        let row = sqlx::query(
            r"
            SELECT preferences_text, preferred_country, simp_preference
            FROM user_preferences
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load preferences", &e))?;

        Ok(row.map_or_else(UserPreferences::default, |r| {
            let simp: String = r.get("simp_preference");
            UserPreferences {
                text: r.get("preferences_text"),
                preferred_country: r.get("preferred_country"),
                simp_preference: SimpPreference::from_str_or_default(&simp),
            }
        }))
    }
}
