//! Schema validation of produced documents
//!
//! [`SchemaValidator`] owns one parsed XSD and is shared read-only across
//! threads. The OAI-PMH schema ships embedded in the crate;
//! [`SchemaValidator::shared`] parses it at most once per process.
//! [`SchemaRegistry`] memoizes parsed schemas by source (embedded or a local
//! file), so concurrent callers asking for the same source wait for a single
//! parse.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use log::{debug, warn};
use moka::future::Cache;

use crate::error::{OaiError, Result};
use crate::libxml2::{LibXml2Wrapper, ValidationResult, XmlSchemaPtr};

/// The OAI-PMH 2.0 response schema
pub const OAI_PMH_XSD: &str = include_str!("../schemas/OAI-PMH.xsd");

/// Source name reported for the embedded schema
pub const EMBEDDED_SOURCE: &str = "embedded:OAI-PMH.xsd";

static SHARED: OnceLock<std::result::Result<Arc<SchemaValidator>, String>> = OnceLock::new();

/// A parsed XSD ready for concurrent validation
#[derive(Debug)]
pub struct SchemaValidator {
    source_name: String,
    wrapper: LibXml2Wrapper,
    schema: XmlSchemaPtr,
}

impl SchemaValidator {
    /// Parses an XSD held in memory
    pub fn from_bytes(source_name: impl Into<String>, xsd: &[u8]) -> Result<Self> {
        let source_name = source_name.into();
        let wrapper = LibXml2Wrapper::new();
        let schema = wrapper
            .parse_schema_from_memory(xsd)
            .map_err(|e| OaiError::SchemaLoad {
                source_name: source_name.clone(),
                details: e.to_string(),
            })?;

        debug!("Parsed schema {}", source_name);
        Ok(Self {
            source_name,
            wrapper,
            schema,
        })
    }

    /// Parses the embedded OAI-PMH schema
    pub fn embedded() -> Result<Self> {
        Self::from_bytes(EMBEDDED_SOURCE, OAI_PMH_XSD.as_bytes())
    }

    /// Reads and parses a local XSD file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let source_name = path.display().to_string();
        let xsd = tokio::fs::read(path)
            .await
            .map_err(|e| OaiError::SchemaLoad {
                source_name: source_name.clone(),
                details: e.to_string(),
            })?;
        Self::from_bytes(source_name, &xsd)
    }

    /// The embedded schema, parsed on first use and shared afterwards
    pub fn shared() -> Result<Arc<Self>> {
        let parsed = SHARED.get_or_init(|| {
            Self::embedded()
                .map(Arc::new)
                .map_err(|e| e.to_string())
        });

        match parsed {
            Ok(validator) => Ok(Arc::clone(validator)),
            Err(details) => Err(OaiError::SchemaLoad {
                source_name: EMBEDDED_SOURCE.to_string(),
                details: details.clone(),
            }),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Runs validation and returns the raw outcome, violations included
    pub fn check(&self, xml: &[u8], name: Option<&str>) -> Result<ValidationResult> {
        Ok(self.wrapper.validate_memory(&self.schema, xml, name)?)
    }

    /// Validates a document, turning violations into [`OaiError::SchemaViolation`]
    pub fn validate(&self, xml: &[u8]) -> Result<()> {
        match self.check(xml, None)? {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid { errors, .. } => {
                warn!(
                    "Document violates {} ({} error(s))",
                    self.source_name,
                    errors.len()
                );
                Err(OaiError::SchemaViolation {
                    message: format!(
                        "{} violation(s) of {}: {}",
                        errors.len(),
                        self.source_name,
                        errors.join("; ")
                    ),
                    errors,
                })
            }
            ValidationResult::InternalError { code } => Err(OaiError::LibXml2Internal {
                details: format!("validation returned internal error code {code}"),
            }),
        }
    }

    pub fn validate_str(&self, xml: &str) -> Result<()> {
        self.validate(xml.as_bytes())
    }
}

/// Memoizes parsed schemas by source
pub struct SchemaRegistry {
    cache: Cache<String, Arc<SchemaValidator>>,
}

impl SchemaRegistry {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();
        Self { cache }
    }

    /// The embedded OAI-PMH schema
    pub async fn embedded(&self) -> Result<Arc<SchemaValidator>> {
        self.get_or_load(EMBEDDED_SOURCE.to_string(), async { SchemaValidator::shared() })
            .await
    }

    /// A local XSD file, parsed on first request
    pub async fn load(&self, path: &Path) -> Result<Arc<SchemaValidator>> {
        let key = path.display().to_string();
        self.get_or_load(key, async move { SchemaValidator::from_file(path).await.map(Arc::new) })
            .await
    }

    /// `path` when given, else the embedded schema
    pub async fn resolve(&self, path: Option<&Path>) -> Result<Arc<SchemaValidator>> {
        match path {
            Some(path) => self.load(path).await,
            None => self.embedded().await,
        }
    }

    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    async fn get_or_load<F>(&self, key: String, loader: F) -> Result<Arc<SchemaValidator>>
    where
        F: std::future::Future<Output = Result<Arc<SchemaValidator>>>,
    {
        self.cache
            .try_get_with(key.clone(), loader)
            .await
            .map_err(|shared| match Arc::try_unwrap(shared) {
                Ok(err) => err,
                Err(shared) => OaiError::SchemaLoad {
                    source_name: key,
                    details: shared.to_string(),
                },
            })
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="note" type="xs:string"/>
</xs:schema>"#;

    #[test]
    fn test_embedded_schema_parses() {
        let validator = SchemaValidator::embedded().unwrap();
        assert_eq!(validator.source_name(), EMBEDDED_SOURCE);
    }

    #[test]
    fn test_shared_is_parsed_once() {
        let first = SchemaValidator::shared().unwrap();
        let second = SchemaValidator::shared().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_from_bytes_rejects_non_schema() {
        assert!(matches!(
            SchemaValidator::from_bytes("bogus", b"<not-a-schema/>"),
            Err(OaiError::SchemaLoad { .. })
        ));
    }

    #[test]
    fn test_validate_reports_violations() {
        let validator = SchemaValidator::from_bytes("note.xsd", NOTE_XSD.as_bytes()).unwrap();
        assert!(validator.validate_str("<note>hello</note>").is_ok());

        match validator.validate_str("<memo>hello</memo>") {
            Err(OaiError::SchemaViolation { errors, .. }) => assert!(!errors.is_empty()),
            other => panic!("Expected SchemaViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_malformed_input() {
        let validator = SchemaValidator::from_bytes("note.xsd", NOTE_XSD.as_bytes()).unwrap();
        assert!(matches!(
            validator.validate_str("<note>"),
            Err(OaiError::MalformedDocument(_))
        ));
    }

    #[tokio::test]
    async fn test_registry_memoizes_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.xsd");
        tokio::fs::write(&path, NOTE_XSD).await.unwrap();

        let registry = SchemaRegistry::new(8);
        let first = registry.load(&path).await.unwrap();
        let second = registry.load(&path).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        registry.embedded().await.unwrap();
        assert_eq!(registry.entry_count().await, 2);
    }

    #[tokio::test]
    async fn test_registry_missing_file() {
        let registry = SchemaRegistry::default();
        let result = registry.load(Path::new("/nonexistent/oai.xsd")).await;

        match result {
            Err(OaiError::SchemaLoad { source_name, .. }) => {
                assert!(source_name.contains("nonexistent"))
            }
            other => panic!("Expected SchemaLoad, got {:?}", other.map(|_| ())),
        }
    }
}
