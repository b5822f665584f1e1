mod common;

use std::sync::Arc;

use common::test_helpers::{BASE_URL, TestFixtures, sample_identify, sample_record};
use oai_pmh::{
    GetRecord, ListRecords, OaiError, OaiResponse, ResumptionToken, SchemaValidator,
    ValidationResult, VerbResponse,
};
use rayon::prelude::*;

#[test]
fn test_fixtures_are_schema_valid() {
    let fixtures = TestFixtures::new();
    let validator = SchemaValidator::shared().unwrap();

    for path in [
        fixtures.identify_xml(),
        fixtures.list_records_xml(),
        fixtures.bad_verb_xml(),
    ] {
        let xml = fixtures.read(path.clone());
        assert!(
            validator.validate_str(&xml).is_ok(),
            "{} should be valid",
            path.display()
        );
    }
}

#[test]
fn test_missing_repository_name_fails_then_passes() {
    let fixtures = TestFixtures::new();
    let validator = SchemaValidator::shared().unwrap();
    let xml = fixtures.read(fixtures.identify_missing_name_xml());

    match validator.validate_str(&xml) {
        Err(OaiError::SchemaViolation { message, errors }) => {
            assert!(!errors.is_empty());
            assert!(errors.iter().any(|e| e.contains("repositoryName") || e.contains("baseURL")));
            assert!(message.starts_with(&format!("{} violation(s) of", errors.len())));
        }
        other => panic!("Expected SchemaViolation, got {:?}", other),
    }

    let fixed = xml.replacen(
        "<baseURL>",
        "<repositoryName>Library of Congress</repositoryName>\n    <baseURL>",
        1,
    );
    assert!(validator.validate_str(&fixed).is_ok());
}

#[test]
fn test_encoded_responses_pass_schema() {
    let validator = SchemaValidator::shared().unwrap();

    let identify = sample_identify();
    identify.validate_against_schema(&validator).unwrap();

    let get_record = GetRecord::new(BASE_URL, sample_record("oai:example.org:1", "2001-01-01"));
    get_record.validate_against_schema(&validator).unwrap();

    let mut list = ListRecords::new(BASE_URL);
    list.append_record(sample_record("oai:example.org:1", "2001-01-01"));
    list.append_record(sample_record("oai:example.org:2", "2001-01-02"));
    list.set_resumption_token(
        ResumptionToken::new("page-2")
            .with_complete_list_size(10)
            .with_cursor(0),
    );
    let xml = list.encode_validated(&validator).unwrap();
    assert!(xml.contains("completeListSize=\"10\""));

    VerbResponse::from(list)
        .validate_against_schema(&validator)
        .unwrap();
}

#[test]
fn test_check_reports_raw_outcome() {
    let fixtures = TestFixtures::new();
    let validator = SchemaValidator::shared().unwrap();
    let xml = fixtures.read(fixtures.identify_missing_name_xml());

    let result = validator
        .check(xml.as_bytes(), Some("identify_missing_name.xml"))
        .unwrap();
    match &result {
        ValidationResult::Invalid { code, errors } => {
            assert!(*code > 0);
            assert!(!errors.is_empty());
            assert_eq!(result.error_count(), errors.len());
        }
        other => panic!("Expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_shared_validator_across_threads() {
    let fixtures = TestFixtures::new();
    let validator = SchemaValidator::shared().unwrap();
    let valid = fixtures.read(fixtures.identify_xml());
    let invalid = fixtures.read(fixtures.identify_missing_name_xml());

    let outcomes: Vec<bool> = (0..64)
        .into_par_iter()
        .map(|i| {
            let validator = Arc::clone(&validator);
            let xml = if i % 2 == 0 { &valid } else { &invalid };
            validator.validate_str(xml).is_ok()
        })
        .collect();

    for (i, ok) in outcomes.iter().enumerate() {
        assert_eq!(*ok, i % 2 == 0, "document {}", i);
    }
}
