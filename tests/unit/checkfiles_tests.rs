/*!
 * Unit tests for the data distribution audit
 */

use banca_db::file_utils::check_files;
use banca_db::protocols::Protocol;

use crate::common::populated_catalog;

#[tokio::test]
async fn test_checkFiles_withMissingDirectory_shouldFail() {
    let catalog = populated_catalog().await;

    let result = check_files(
        &catalog,
        std::path::Path::new("/nonexistent/banca-data"),
        ".jpg",
        &[],
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_checkFiles_withEmptyDirectory_shouldReportAllMissing() {
    let catalog = populated_catalog().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let report = check_files(&catalog, dir.path(), ".jpg", &[])
        .await
        .expect("Audit failed");
    assert_eq!(report.total, 8040);
    assert_eq!(report.missing.len(), 8040);
    assert!(report.extra.is_empty());
    assert!(!report.is_complete());
}

#[tokio::test]
async fn test_checkFiles_shouldAccountForPresentAndExtraFiles() {
    let catalog = populated_catalog().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    // One cataloged recording present on disk
    let present = dir.path().join("g1/1001");
    std::fs::create_dir_all(&present).expect("Failed to create data layout");
    std::fs::write(present.join("1001_f_g1_s01_1001_en_1.jpg"), b"")
        .expect("Failed to write data file");

    // One file the catalog knows nothing about
    std::fs::write(present.join("1001_f_g1_s99_1001_en_1.jpg"), b"")
        .expect("Failed to write stray file");

    let report = check_files(&catalog, dir.path(), ".jpg", &[])
        .await
        .expect("Audit failed");
    assert_eq!(report.total, 8040);
    assert_eq!(report.missing.len(), 8039);
    assert_eq!(report.extra.len(), 1);
}

#[tokio::test]
async fn test_checkFiles_withProtocolRestriction_shouldShrinkExpectedSet() {
    let catalog = populated_catalog().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let report = check_files(&catalog, dir.path(), ".jpg", &[Protocol::Mc])
        .await
        .expect("Audit failed");
    // World training (1800) plus, per trial group, enrollment (130),
    // client probes (390) and impostor probes (520)
    assert_eq!(report.total, 1800 + 2 * (130 + 390 + 520));
}

#[tokio::test]
async fn test_checkFiles_shouldIgnoreOtherExtensions() {
    let catalog = populated_catalog().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    std::fs::write(dir.path().join("notes.txt"), b"").expect("Failed to write file");

    let report = check_files(&catalog, dir.path(), ".jpg", &[])
        .await
        .expect("Audit failed");
    assert!(report.extra.is_empty());
}
