mod common;

use common::test_helpers::{TestFixtures, sample_identify};
use oai_pmh::{Identify, ListRecords, OaiError, OaiResponse, Verb, files};
use tempfile::TempDir;

#[tokio::test]
async fn test_save_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("identify.xml");

    let identify = sample_identify();
    files::save(&identify, &path).await.unwrap();

    let loaded: Identify = files::load(&path).await.unwrap();
    assert_eq!(loaded, identify);

    let any = files::load_any(&path).await.unwrap();
    assert_eq!(any.verb(), Some(Verb::Identify));
}

#[tokio::test]
async fn test_failed_encode_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.xml");

    let empty = ListRecords::new("http://example.org/oai");
    assert!(files::save(&empty, &path).await.is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_load_fixture_with_wrong_type() {
    let fixtures = TestFixtures::new();
    let result = files::load::<ListRecords>(&fixtures.identify_xml()).await;

    assert!(matches!(result, Err(OaiError::MalformedDocument(_))));
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = files::read_document(&temp_dir.path().join("absent.xml")).await;

    assert!(matches!(result, Err(OaiError::Io(_))));
}

#[tokio::test]
async fn test_write_document_round_trips_text() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("raw.xml");
    let xml = sample_identify().encode().unwrap();

    files::write_document(&path, &xml).await.unwrap();
    assert_eq!(files::read_document(&path).await.unwrap(), xml);
}
