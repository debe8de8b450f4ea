/*!
 * Database schema definitions and migrations.
 *
 * There is a single table. Migrations are additive: columns are added when
 * missing and nothing is ever dropped or renamed.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rusqlite::Connection;

/// Table holding one row per (user, pronoun set) selection
pub const PLAYERS_TABLE: &str = "pronouns_players";

/// Create the table if needed and bring it up to the current column set
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS pronouns_players (
            playerUuid VARCHAR(36),
            pronouns TEXT,
            priority INT
        );

        CREATE INDEX IF NOT EXISTS idx_pronouns_players_uuid ON pronouns_players(playerUuid);
        "#,
    )
    .context("Failed to create pronouns_players table")?;

    // Tables created before priorities existed lack the column
    if !has_column(conn, PLAYERS_TABLE, "priority")? {
        conn.execute_batch("ALTER TABLE pronouns_players ADD priority INT DEFAULT 0;")
            .context("Failed to add priority column")?;
        warn!("Migrated database schema (added priority column).");
    } else {
        debug!("Database schema is up to date");
    }

    info!("Pronoun storage schema ready");
    Ok(())
}

/// Check whether `table` has a column called `column`
fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .with_context(|| format!("Failed to inspect table {}", table))?;

    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(names.iter().any(|name| name.eq_ignore_ascii_case(column)))
}
