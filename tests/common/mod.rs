/*!
 * Common test utilities shared across the test suite
 */

use banca_db::catalog::Catalog;
use banca_db::create;
use banca_db::database::DatabaseConnection;

/// Build a fully populated in-memory catalog
pub async fn populated_catalog() -> Catalog {
    let db = DatabaseConnection::new_in_memory().expect("Failed to create in-memory catalog");
    create::populate(&db, false)
        .await
        .expect("Failed to populate catalog");
    Catalog::new(db)
}
