/*!
 * # banca-db - BANCA verification database access API
 *
 * A Rust library exposing the metadata of the BANCA face verification
 * database: clients, recordings and the seven fixed evaluation protocols
 * (Mc, Md, Ma, Ud, Ua, P, G).
 *
 * The raw biometric data is distributed separately by its owners; this
 * crate only catalogs path stems and ground-truth labels so that
 * evaluation code can enumerate training, enrollment and probe sets
 * reproducibly.
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `catalog`: high-level query interface (clients, models, file sets,
 *   T-norm and Z-norm cohorts, path lookups)
 * - `database`: SQLite-backed storage:
 *   - `database::connection`: connection management
 *   - `database::schema`: versioned schema
 *   - `database::models`: records and vocabulary enums
 *   - `database::repository`: typed SQL queries
 * - `protocols`: static protocol session tables
 * - `create`: deterministic catalog population
 * - `file_utils`: stem parsing and data distribution audits
 * - `app_config`: configuration management
 * - `errors`: custom error types
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod catalog;
pub mod create;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod protocols;

// Re-export main types for easier usage
pub use app_config::Config;
pub use catalog::{Catalog, ClientQuery, ObjectQuery};
pub use database::models::{
    ClientGroup, ClientRecord, FileRecord, Gender, Group, Language, ProbeClass, Purpose, Subworld,
};
pub use database::{DatabaseConnection, Repository};
pub use errors::{AppError, CatalogError};
pub use protocols::{Condition, Protocol};
