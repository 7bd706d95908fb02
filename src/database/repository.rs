/*!
 * Repository layer for catalog operations.
 *
 * This module provides a typed API for all database operations,
 * abstracting away the SQL details. Higher-level query semantics
 * (group aliases, cohort swapping) live in the catalog module.
 */

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};

use super::connection::DatabaseConnection;
use super::models::{
    ClientGroup, ClientRecord, FileRecord, Gender, Group, ProbeClass, ProtocolPurposeRecord,
    ProtocolRecord, Purpose, Subworld, SubworldRecord,
};
use crate::protocols::Protocol;

/// Filter for client queries. Empty vectors select every valid value.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Enrollment groups to select
    pub groups: Vec<ClientGroup>,
    /// Genders to select
    pub genders: Vec<Gender>,
    /// Restrict the world portion to one split
    pub subworld: Option<Subworld>,
}

/// Filter for protocol-purpose file queries. Empty vectors select every
/// valid value; `groups` must name the purpose groups to search.
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// Protocols to select (empty selects all)
    pub protocols: Vec<Protocol>,
    /// Purpose groups to search
    pub groups: Vec<Group>,
    /// Purpose of the file sets
    pub purpose: Purpose,
    /// Restrict probes to one access class
    pub class_constraint: Option<ProbeClass>,
    /// Restrict to the given model identifiers
    pub model_ids: Vec<i64>,
    /// Match `model_ids` against the claimed identity instead of the
    /// real one (impostor probe semantics)
    pub model_on_claimed: bool,
    /// Restrict world data to one split
    pub subworld: Option<Subworld>,
}

/// Repository for catalog operations
#[derive(Clone)]
pub struct Repository {
    /// Catalog connection
    db: DatabaseConnection,
}

fn sql_in(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Parse a TEXT column into one of the vocabulary enums
fn text_col<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    let s: String = row.get(idx)?;
    s.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

fn map_client_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientRecord> {
    Ok(ClientRecord {
        id: row.get(0)?,
        gender: text_col(row, 1)?,
        group: text_col(row, 2)?,
        language: text_col(row, 3)?,
    })
}

fn map_file_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        client_id: row.get(1)?,
        path: row.get(2)?,
        claimed_id: row.get(3)?,
        shot_id: row.get(4)?,
        session_id: row.get(5)?,
    })
}

const FILE_COLUMNS: &str = "f.id, f.client_id, f.path, f.claimed_id, f.shot_id, f.session_id";

impl Repository {
    /// Create a new repository with the given catalog connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory catalog (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// The underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Whether the catalog holds any file rows
    pub async fn has_data(&self) -> Result<bool> {
        self.db
            .execute_async(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
                Ok(count > 0)
            })
            .await
    }

    // =========================================================================
    // Insert operations (used during catalog population, inside a transaction)
    // =========================================================================

    /// Insert a client row
    pub(crate) fn insert_client(conn: &Connection, client: &ClientRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO clients (id, gender, sgroup, language) VALUES (?1, ?2, ?3, ?4)",
            params![
                client.id,
                client.gender.to_string(),
                client.group.to_string(),
                client.language.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Insert a subworld row, returning its identifier
    pub(crate) fn insert_subworld(conn: &Connection, name: Subworld) -> Result<i64> {
        conn.execute(
            "INSERT INTO subworlds (name) VALUES (?1)",
            params![name.to_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Register a world client as member of a subworld
    pub(crate) fn add_subworld_member(
        conn: &Connection,
        subworld_id: i64,
        client_id: i64,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO subworld_clients (subworld_id, client_id) VALUES (?1, ?2)",
            params![subworld_id, client_id],
        )?;
        Ok(())
    }

    /// Insert a file row, returning its identifier
    pub(crate) fn insert_file(
        conn: &Connection,
        client_id: i64,
        path: &str,
        claimed_id: i64,
        shot_id: i64,
        session_id: i64,
    ) -> Result<i64> {
        conn.execute(
            "INSERT INTO files (client_id, path, claimed_id, shot_id, session_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![client_id, path, claimed_id, shot_id, session_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a protocol row, returning its identifier
    pub(crate) fn insert_protocol(conn: &Connection, protocol: Protocol) -> Result<i64> {
        conn.execute(
            "INSERT INTO protocols (name) VALUES (?1)",
            params![protocol.to_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a (protocol, group, purpose) row, returning its identifier
    pub(crate) fn insert_protocol_purpose(
        conn: &Connection,
        protocol_id: i64,
        group: Group,
        purpose: Purpose,
    ) -> Result<i64> {
        conn.execute(
            "INSERT INTO protocol_purposes (protocol_id, sgroup, purpose) VALUES (?1, ?2, ?3)",
            params![protocol_id, group.to_string(), purpose.to_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Associate a file with a protocol purpose
    pub(crate) fn associate_file(
        conn: &Connection,
        protocol_purpose_id: i64,
        file_id: i64,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO protocol_purpose_files (protocol_purpose_id, file_id) VALUES (?1, ?2)",
            params![protocol_purpose_id, file_id],
        )?;
        Ok(())
    }

    // =========================================================================
    // Client queries
    // =========================================================================

    /// Clients matching the given filter, ordered by identifier.
    ///
    /// The subworld restriction only applies to the world portion of the
    /// result; trial-group clients are unaffected by it.
    pub async fn clients(&self, filter: &ClientFilter) -> Result<Vec<ClientRecord>> {
        let filter = filter.clone();
        self.db
            .execute_async(move |conn| Self::clients_sync(conn, &filter))
            .await
    }

    fn clients_sync(conn: &Connection, filter: &ClientFilter) -> Result<Vec<ClientRecord>> {
        let groups: Vec<ClientGroup> = if filter.groups.is_empty() {
            vec![ClientGroup::G1, ClientGroup::G2, ClientGroup::World]
        } else {
            filter.groups.clone()
        };

        let mut out = Vec::new();

        if groups.contains(&ClientGroup::World) {
            let mut sql =
                String::from("SELECT c.id, c.gender, c.sgroup, c.language FROM clients c");
            let mut values: Vec<Value> = Vec::new();

            if let Some(sw) = filter.subworld {
                sql.push_str(
                    " JOIN subworld_clients sc ON sc.client_id = c.id \
                      JOIN subworlds s ON s.id = sc.subworld_id AND s.name = ?",
                );
                values.push(Value::from(sw.to_string()));
            }

            sql.push_str(" WHERE c.sgroup = 'world'");
            if !filter.genders.is_empty() {
                sql.push_str(&format!(" AND c.gender IN ({})", sql_in(filter.genders.len())));
                values.extend(filter.genders.iter().map(|g| Value::from(g.to_string())));
            }
            sql.push_str(" ORDER BY c.id");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), map_client_row)?;
            for row in rows {
                out.push(row?);
            }
        }

        let trial: Vec<ClientGroup> = groups
            .iter()
            .copied()
            .filter(|g| *g != ClientGroup::World)
            .collect();

        if !trial.is_empty() {
            let mut sql = format!(
                "SELECT c.id, c.gender, c.sgroup, c.language FROM clients c \
                 WHERE c.sgroup IN ({})",
                sql_in(trial.len())
            );
            let mut values: Vec<Value> =
                trial.iter().map(|g| Value::from(g.to_string())).collect();

            if !filter.genders.is_empty() {
                sql.push_str(&format!(" AND c.gender IN ({})", sql_in(filter.genders.len())));
                values.extend(filter.genders.iter().map(|g| Value::from(g.to_string())));
            }
            sql.push_str(" ORDER BY c.id");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), map_client_row)?;
            for row in rows {
                out.push(row?);
            }
        }

        Ok(out)
    }

    /// Look up a single client by identifier
    pub async fn client_by_id(&self, id: i64) -> Result<Option<ClientRecord>> {
        self.db
            .execute_async(move |conn| {
                use rusqlite::OptionalExtension;
                let result = conn
                    .query_row(
                        "SELECT c.id, c.gender, c.sgroup, c.language FROM clients c WHERE c.id = ?1",
                        params![id],
                        map_client_row,
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    // =========================================================================
    // File queries
    // =========================================================================

    /// Files attached to protocol purposes matching the given filter,
    /// ordered by (client, session, claimed, shot).
    pub async fn files_for_purpose(&self, filter: &FileFilter) -> Result<Vec<FileRecord>> {
        let filter = filter.clone();
        self.db
            .execute_async(move |conn| Self::files_for_purpose_sync(conn, &filter))
            .await
    }

    fn files_for_purpose_sync(conn: &Connection, filter: &FileFilter) -> Result<Vec<FileRecord>> {
        if filter.groups.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT DISTINCT {} FROM files f \
             JOIN clients c ON c.id = f.client_id \
             JOIN protocol_purpose_files ppf ON ppf.file_id = f.id \
             JOIN protocol_purposes pp ON pp.id = ppf.protocol_purpose_id \
             JOIN protocols p ON p.id = pp.protocol_id",
            FILE_COLUMNS
        );
        let mut values: Vec<Value> = Vec::new();

        if filter.subworld.is_some() {
            sql.push_str(
                " JOIN subworld_clients sc ON sc.client_id = c.id \
                  JOIN subworlds s ON s.id = sc.subworld_id",
            );
        }

        sql.push_str(" WHERE pp.purpose = ?");
        values.push(Value::from(filter.purpose.to_string()));

        if let Some(sw) = filter.subworld {
            sql.push_str(" AND s.name = ?");
            values.push(Value::from(sw.to_string()));
        }

        if !filter.protocols.is_empty() {
            sql.push_str(&format!(" AND p.name IN ({})", sql_in(filter.protocols.len())));
            values.extend(filter.protocols.iter().map(|p| Value::from(p.to_string())));
        }

        sql.push_str(&format!(" AND pp.sgroup IN ({})", sql_in(filter.groups.len())));
        values.extend(filter.groups.iter().map(|g| Value::from(g.to_string())));

        match filter.class_constraint {
            Some(ProbeClass::Client) => sql.push_str(" AND f.claimed_id = f.client_id"),
            Some(ProbeClass::Impostor) => sql.push_str(" AND f.claimed_id != f.client_id"),
            None => {}
        }

        if !filter.model_ids.is_empty() {
            let column = if filter.model_on_claimed {
                "f.claimed_id"
            } else {
                "c.id"
            };
            sql.push_str(&format!(" AND {} IN ({})", column, sql_in(filter.model_ids.len())));
            values.extend(filter.model_ids.iter().map(|id| Value::from(*id)));
        }

        sql.push_str(" ORDER BY f.client_id, f.session_id, f.claimed_id, f.shot_id");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), map_file_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Files with the given identifiers, in catalog order
    pub async fn files_by_ids(&self, ids: &[i64]) -> Result<Vec<FileRecord>> {
        let ids = ids.to_vec();
        self.db
            .execute_async(move |conn| {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let sql = format!(
                    "SELECT {} FROM files f WHERE f.id IN ({}) ORDER BY f.id",
                    FILE_COLUMNS,
                    sql_in(ids.len())
                );
                let values: Vec<Value> = ids.iter().map(|id| Value::from(*id)).collect();
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(values), map_file_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
    }

    /// Files with the given path stems
    pub async fn files_by_paths(&self, paths: &[String]) -> Result<Vec<FileRecord>> {
        let paths = paths.to_vec();
        self.db
            .execute_async(move |conn| {
                if paths.is_empty() {
                    return Ok(Vec::new());
                }
                let sql = format!(
                    "SELECT {} FROM files f WHERE f.path IN ({}) ORDER BY f.id",
                    FILE_COLUMNS,
                    sql_in(paths.len())
                );
                let values: Vec<Value> = paths.iter().map(|p| Value::from(p.clone())).collect();
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(values), map_file_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
    }

    // =========================================================================
    // Protocol queries
    // =========================================================================

    /// All registered protocols
    pub async fn protocols(&self) -> Result<Vec<ProtocolRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, name FROM protocols ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok(ProtocolRecord {
                        id: row.get(0)?,
                        name: text_col(row, 1)?,
                    })
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
    }

    /// Look up a protocol by name
    pub async fn protocol_by_name(&self, protocol: Protocol) -> Result<Option<ProtocolRecord>> {
        self.db
            .execute_async(move |conn| {
                use rusqlite::OptionalExtension;
                let result = conn
                    .query_row(
                        "SELECT id, name FROM protocols WHERE name = ?1",
                        params![protocol.to_string()],
                        |row| {
                            Ok(ProtocolRecord {
                                id: row.get(0)?,
                                name: text_col(row, 1)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// All registered (protocol, group, purpose) triples
    pub async fn protocol_purposes(&self) -> Result<Vec<ProtocolPurposeRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT pp.id, p.name, pp.sgroup, pp.purpose \
                     FROM protocol_purposes pp \
                     JOIN protocols p ON p.id = pp.protocol_id \
                     ORDER BY pp.id",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(ProtocolPurposeRecord {
                        id: row.get(0)?,
                        protocol: text_col(row, 1)?,
                        group: text_col(row, 2)?,
                        purpose: text_col(row, 3)?,
                    })
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
    }

    /// All registered subworld splits
    pub async fn subworlds(&self) -> Result<Vec<SubworldRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM subworlds ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok(SubworldRecord {
                        id: row.get(0)?,
                        name: text_col(row, 1)?,
                    })
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await
    }
}
