/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for the pronoun table,
 * abstracting away the SQL details. Every call borrows one pooled connection
 * for its own duration only.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::connection::DatabaseConnection;
use super::models::PronounRecord;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Access the underlying connection pool
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Load a user's pronoun identifiers ordered by priority
    pub async fn load_pronouns(&self, user: Uuid) -> Result<Vec<String>> {
        self.db
            .execute_async(move |conn| Self::load_pronouns_sync(conn, &user))
            .await
    }

    fn load_pronouns_sync(conn: &Connection, user: &Uuid) -> Result<Vec<String>> {
        let mut stmt = conn.prepare_cached(
            "SELECT pronouns FROM pronouns_players WHERE playerUuid = ?1 ORDER BY priority, rowid",
        )?;
        let sets = stmt
            .query_map([user.to_string()], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        debug!("Loaded {} pronoun sets for {}", sets.len(), user);
        Ok(sets)
    }

    /// Replace all of a user's rows with `sets`, using the index as priority
    pub async fn replace_pronouns(&self, user: Uuid, sets: Vec<String>) -> Result<()> {
        self.db
            .transaction_async(move |tx| {
                let user = user.to_string();
                tx.execute("DELETE FROM pronouns_players WHERE playerUuid = ?1", [&user])?;

                let mut insert = tx.prepare_cached(
                    "INSERT INTO pronouns_players (playerUuid, pronouns, priority) VALUES (?1, ?2, ?3)",
                )?;
                for (priority, set) in sets.iter().enumerate() {
                    insert.execute(params![user, set, priority as i64])?;
                }

                debug!("Stored {} pronoun sets for {}", sets.len(), user);
                Ok(())
            })
            .await
    }

    /// Delete every row for a user, returning how many were removed
    pub async fn delete_pronouns(&self, user: Uuid) -> Result<usize> {
        self.db
            .execute_async(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM pronouns_players WHERE playerUuid = ?1",
                    [user.to_string()],
                )?;
                debug!("Deleted {} pronoun rows for {}", removed, user);
                Ok(removed)
            })
            .await
    }

    /// Scan the whole table ordered by priority
    pub async fn load_all(&self) -> Result<Vec<PronounRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT playerUuid, pronouns, COALESCE(priority, 0)
                    FROM pronouns_players
                    ORDER BY playerUuid, priority, rowid
                    "#,
                )?;
                let records = stmt
                    .query_map([], |row| {
                        Ok(PronounRecord {
                            player_uuid: row.get(0)?,
                            pronouns: row.get(1)?,
                            priority: row.get(2)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<PronounRecord>>>()?;

                Ok(records)
            })
            .await
    }
}
