/*!
 * Database module backing the BANCA metadata catalog.
 *
 * This module provides SQLite-based storage for:
 * - Enrolled clients and world splits
 * - Recording metadata (path stems, sessions, claimed identities)
 * - Protocol definitions and their purpose-file associations
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use repository::{ClientFilter, FileFilter, Repository};
