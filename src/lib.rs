//! # oai-pmh Library
//!
//! Typed model of the OAI-PMH 2.0 protocol: verb responses with declared
//! field multiplicities, a canonical XML codec for the `OAI-PMH` envelope,
//! request argument validation and XSD validation of produced documents
//! through libxml2.

pub mod cli;
pub mod codec;
pub mod config;
pub mod datestamp;
pub mod document;
pub mod envelope;
pub mod error;
pub mod fields;
pub mod files;
pub mod libxml2;
pub mod output;
pub mod provider;
pub mod request;
pub mod schema;
pub mod verbs;

pub use cli::{Cli, Command, OutputFormat, VerbosityLevel};
pub use codec::{FieldSet, OAI_NAMESPACE, OAI_SCHEMA_LOCATION, WriteElement, check_cardinality};
pub use config::{Config, ConfigError, ConfigManager};
pub use datestamp::Granularity;
pub use document::{XmlDocument, XmlElement, XmlFragment};
pub use envelope::{Envelope, RequestEcho};
pub use error::{ErrorCode, OaiError, RequestError, Result};
pub use fields::{FieldDescriptor, FieldValue, Multiplicity, OptionalPlural, RequiredPlural};
pub use libxml2::{LibXml2Wrapper, ValidationResult};
pub use output::Output;
pub use provider::{HandlerError, HandlerResult, ListPage, ListQuery, Provider, Repository};
pub use request::{RequestParams, Verb, is_legal_argument, validate_request};
pub use schema::{OAI_PMH_XSD, SchemaRegistry, SchemaValidator};
pub use verbs::{
    DeletedRecord, ErrorResponse, GetRecord, Header, Identify, ListIdentifiers,
    ListMetadataFormats, ListRecords, ListSets, MetadataFormat, OaiResponse, PROTOCOL_VERSION,
    ProtocolError, Record, ResumptionToken, Set, VerbResponse,
};
