/*!
 * Integration tests for the on-disk catalog lifecycle
 */

use banca_db::catalog::{Catalog, ClientQuery, ObjectQuery};
use banca_db::create;
use banca_db::database::DatabaseConnection;
use banca_db::database::models::{Group, Purpose};
use banca_db::protocols::Protocol;

#[tokio::test]
async fn test_createAndReopen_shouldServeSameCatalog() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("banca.db");

    let db = DatabaseConnection::new(&db_path).expect("Failed to create catalog file");
    let summary = create::populate(&db, false)
        .await
        .expect("Failed to populate catalog");
    assert_eq!(summary.clients, 82);
    assert_eq!(summary.files, 8040);
    assert_eq!(summary.protocols, 7);
    drop(db);

    let catalog = Catalog::open(&db_path).expect("Failed to reopen catalog");
    let clients = catalog
        .clients(&ClientQuery::new())
        .await
        .expect("Failed to query clients");
    assert_eq!(clients.len(), 82);

    let stats = catalog.stats().expect("Failed to read stats");
    assert_eq!(stats.client_count, 82);
    assert_eq!(stats.file_count, 8040);
    assert_eq!(stats.protocol_count, 7);
    assert!(stats.file_size_bytes > 0);
}

#[tokio::test]
async fn test_open_beforeCreate_shouldReportNotCreated() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("banca.db");

    let result = Catalog::open(&db_path);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_forcedRebuild_shouldLeaveConsistentCatalog() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("banca.db");

    let db = DatabaseConnection::new(&db_path).expect("Failed to create catalog file");
    create::populate(&db, false)
        .await
        .expect("Failed to populate catalog");

    // Second run without force is rejected, the catalog is untouched
    assert!(create::populate(&db, false).await.is_err());

    let summary = create::populate(&db, true)
        .await
        .expect("Forced rebuild failed");
    assert_eq!(summary.files, 8040);

    let catalog = Catalog::new(db);
    let probes = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Md)
                .group(Group::Eval)
                .purpose(Purpose::Probe),
        )
        .await
        .expect("Failed to query probes");
    assert_eq!(probes.len(), 910);
}

#[tokio::test]
async fn test_dumpStyleListing_shouldRenderUniqueDecoratedPaths() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("banca.db");

    let db = DatabaseConnection::new(&db_path).expect("Failed to create catalog file");
    create::populate(&db, false)
        .await
        .expect("Failed to populate catalog");
    let catalog = Catalog::new(db);

    let files = catalog
        .objects(
            &ObjectQuery::new()
                .protocol(Protocol::Ud)
                .group(Group::Dev)
                .purpose(Purpose::Enrol),
        )
        .await
        .expect("Failed to query files");
    assert_eq!(files.len(), 130);

    let rendered: Vec<String> = files
        .iter()
        .map(|f| {
            f.make_path(Some(std::path::Path::new("/data/banca")), Some(".jpg"))
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    let mut unique = rendered.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), rendered.len());
    assert!(rendered.iter().all(|p| p.starts_with("/data/banca/g1/")));
    assert!(rendered.iter().all(|p| p.ends_with(".jpg")));
}
