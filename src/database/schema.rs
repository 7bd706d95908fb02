/*!
 * Database schema definitions and migrations.
 *
 * This module contains the SQL schema for all catalog tables
 * and handles schema migrations for version upgrades.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Per-connection pragma; must be re-enabled on every open, not just
    // when the tables are first created
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        // Fresh database - create all tables
        info!("Initializing catalog schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating catalog schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Catalog schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all catalog tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL for better concurrency and crash recovery
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    // Enrolled clients
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY,
            gender TEXT NOT NULL CHECK (gender IN ('f', 'm')),
            sgroup TEXT NOT NULL CHECK (sgroup IN ('g1', 'g2', 'world')),
            language TEXT NOT NULL CHECK (language IN ('en'))
        );

        CREATE INDEX IF NOT EXISTS idx_clients_group ON clients(sgroup);
        "#,
    )?;

    // World splits and their memberships
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS subworlds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS subworld_clients (
            subworld_id INTEGER NOT NULL REFERENCES subworlds(id) ON DELETE CASCADE,
            client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
            UNIQUE(subworld_id, client_id)
        );

        CREATE INDEX IF NOT EXISTS idx_subworld_clients_client ON subworld_clients(client_id);
        "#,
    )?;

    // Recordings. claimed_id is not a foreign key on purpose: the claimed
    // identity of an impostor attack need not be a cataloged client.
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
            path TEXT NOT NULL UNIQUE,
            claimed_id INTEGER NOT NULL,
            shot_id INTEGER NOT NULL,
            session_id INTEGER NOT NULL,
            UNIQUE(client_id, session_id, claimed_id, shot_id)
        );

        CREATE INDEX IF NOT EXISTS idx_files_client ON files(client_id);
        CREATE INDEX IF NOT EXISTS idx_files_claimed ON files(claimed_id);
        CREATE INDEX IF NOT EXISTS idx_files_path ON files(path);
        "#,
    )?;

    // Protocols and their (group, purpose) file sets
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS protocols (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS protocol_purposes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            protocol_id INTEGER NOT NULL REFERENCES protocols(id) ON DELETE CASCADE,
            sgroup TEXT NOT NULL CHECK (sgroup IN ('world', 'dev', 'eval')),
            purpose TEXT NOT NULL CHECK (purpose IN ('train', 'enrol', 'probe')),
            UNIQUE(protocol_id, sgroup, purpose)
        );

        CREATE TABLE IF NOT EXISTS protocol_purpose_files (
            protocol_purpose_id INTEGER NOT NULL REFERENCES protocol_purposes(id) ON DELETE CASCADE,
            file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            UNIQUE(protocol_purpose_id, file_id)
        );

        CREATE INDEX IF NOT EXISTS idx_ppf_purpose ON protocol_purpose_files(protocol_purpose_id);
        CREATE INDEX IF NOT EXISTS idx_ppf_file ON protocol_purpose_files(file_id);
        "#,
    )?;

    info!("Catalog schema created successfully");
    Ok(())
}

/// Migrate the schema from one version to another
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < SCHEMA_VERSION {
        match current {
            // Add migration steps here as the schema evolves
            // Example:
            // 1 => {
            //     migrate_v1_to_v2(conn)?;
            //     current = 2;
            // }
            _ => {
                return Err(anyhow::anyhow!(
                    "Unknown schema version: {}. Cannot migrate.",
                    current
                ));
            }
        }
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    info!("Schema migration completed to v{}", SCHEMA_VERSION);
    Ok(())
}

/// Remove all cataloged rows, keeping the schema in place
pub fn clear_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM protocol_purpose_files;
        DELETE FROM protocol_purposes;
        DELETE FROM protocols;
        DELETE FROM subworld_clients;
        DELETE FROM subworlds;
        DELETE FROM files;
        DELETE FROM clients;
        "#,
    )?;
    Ok(())
}
