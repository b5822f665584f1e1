//! Verb responses
//!
//! Every response type implements [`OaiResponse`], which adds the envelope
//! and the encode / decode / validate operations on top of the element
//! writer. [`VerbResponse`] wraps any of them when the verb is only known at
//! run time.

mod error_response;
mod get_record;
mod identify;
mod list_identifiers;
mod list_metadata_formats;
mod list_records;
mod list_sets;
mod records;

pub use error_response::{ErrorResponse, ProtocolError};
pub use get_record::GetRecord;
pub use identify::{DeletedRecord, Identify, PROTOCOL_VERSION};
pub use list_identifiers::ListIdentifiers;
pub use list_metadata_formats::ListMetadataFormats;
pub use list_records::ListRecords;
pub use list_sets::ListSets;
pub use records::{Header, MetadataFormat, Record, ResumptionToken, Set};

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::codec::{OAI_NAMESPACE, WriteElement, encode_document};
use crate::document::XmlDocument;
use crate::envelope::{Envelope, RequestEcho};
use crate::error::{OaiError, Result};
use crate::request::Verb;
use crate::schema::SchemaValidator;

/// Uniform capability of every response document
pub trait OaiResponse: WriteElement + Sized {
    fn envelope(&self) -> &Envelope;

    fn envelope_mut(&mut self) -> &mut Envelope;

    /// Builds the response from a parsed `OAI-PMH` document
    fn from_document(doc: &XmlDocument) -> Result<Self>;

    fn set_response_date(&mut self, response_date: DateTime<Utc>) {
        self.envelope_mut().set_response_date(response_date);
    }

    fn set_request(&mut self, request: RequestEcho) {
        self.envelope_mut().set_request(request);
    }

    /// Serializes the full `OAI-PMH` document
    fn encode(&self) -> Result<String> {
        encode_document(self.envelope(), self)
    }

    fn decode(xml: &str) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        Self::from_document(&doc)
    }

    /// Encodes, then checks the result against `schema`
    fn validate_against_schema(&self, schema: &SchemaValidator) -> Result<()> {
        self.encode_validated(schema).map(|_| ())
    }

    /// Encodes and returns the document only if it passes `schema`
    fn encode_validated(&self, schema: &SchemaValidator) -> Result<String> {
        let xml = self.encode()?;
        schema.validate_str(&xml)?;
        Ok(xml)
    }
}

/// Rejects empty (or all-whitespace) values for required text fields
pub(crate) fn required_value(
    element: &'static str,
    field: &'static str,
    value: impl Into<String>,
) -> Result<String> {
    let value = value.into();
    if value.trim().is_empty() {
        return Err(OaiError::MissingRequiredField { element, field });
    }
    Ok(value)
}

/// Any response, tagged by its verb
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "verb")]
pub enum VerbResponse {
    GetRecord(GetRecord),
    Identify(Identify),
    ListIdentifiers(ListIdentifiers),
    ListMetadataFormats(ListMetadataFormats),
    ListRecords(ListRecords),
    ListSets(ListSets),
    #[serde(rename = "error")]
    Error(ErrorResponse),
}

impl VerbResponse {
    /// Decodes any response, choosing the type from the body element
    pub fn decode(xml: &str) -> Result<Self> {
        let doc = XmlDocument::parse(xml)?;
        let root = doc.root();
        Envelope::decode(root)?;

        let body = root
            .children()
            .iter()
            .find(|child| {
                child.namespace() == Some(OAI_NAMESPACE)
                    && !matches!(child.local_name(), "responseDate" | "request")
            })
            .ok_or_else(|| OaiError::malformed("OAI-PMH document has no body"))?;

        if body.local_name() == "error" {
            return ErrorResponse::from_document(&doc).map(VerbResponse::Error);
        }

        let verb: Verb = body.local_name().parse().map_err(|_| {
            OaiError::malformed(format!("unknown response body <{}>", body.local_name()))
        })?;

        Ok(match verb {
            Verb::GetRecord => VerbResponse::GetRecord(GetRecord::from_document(&doc)?),
            Verb::Identify => VerbResponse::Identify(Identify::from_document(&doc)?),
            Verb::ListIdentifiers => {
                VerbResponse::ListIdentifiers(ListIdentifiers::from_document(&doc)?)
            }
            Verb::ListMetadataFormats => {
                VerbResponse::ListMetadataFormats(ListMetadataFormats::from_document(&doc)?)
            }
            Verb::ListRecords => VerbResponse::ListRecords(ListRecords::from_document(&doc)?),
            Verb::ListSets => VerbResponse::ListSets(ListSets::from_document(&doc)?),
        })
    }

    /// The verb answered, or `None` for an error response
    pub fn verb(&self) -> Option<Verb> {
        match self {
            VerbResponse::GetRecord(_) => Some(Verb::GetRecord),
            VerbResponse::Identify(_) => Some(Verb::Identify),
            VerbResponse::ListIdentifiers(_) => Some(Verb::ListIdentifiers),
            VerbResponse::ListMetadataFormats(_) => Some(Verb::ListMetadataFormats),
            VerbResponse::ListRecords(_) => Some(Verb::ListRecords),
            VerbResponse::ListSets(_) => Some(Verb::ListSets),
            VerbResponse::Error(_) => None,
        }
    }

    fn as_response(&self) -> (&Envelope, &dyn WriteElement) {
        match self {
            VerbResponse::GetRecord(r) => (r.envelope(), r),
            VerbResponse::Identify(r) => (r.envelope(), r),
            VerbResponse::ListIdentifiers(r) => (r.envelope(), r),
            VerbResponse::ListMetadataFormats(r) => (r.envelope(), r),
            VerbResponse::ListRecords(r) => (r.envelope(), r),
            VerbResponse::ListSets(r) => (r.envelope(), r),
            VerbResponse::Error(r) => (r.envelope(), r),
        }
    }

    pub fn envelope(&self) -> &Envelope {
        self.as_response().0
    }

    pub fn encode(&self) -> Result<String> {
        let (envelope, body) = self.as_response();
        encode_document(envelope, body)
    }

    pub fn validate_against_schema(&self, schema: &SchemaValidator) -> Result<()> {
        let xml = self.encode()?;
        schema.validate_str(&xml).inspect_err(|e| {
            warn!("{} response failed schema validation: {}", self.label(), e);
        })
    }

    fn label(&self) -> &'static str {
        self.verb().map(Verb::as_str).unwrap_or("error")
    }
}

macro_rules! impl_from_response {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for VerbResponse {
                fn from(response: $variant) -> Self {
                    VerbResponse::$variant(response)
                }
            }
        )*
    };
}

impl_from_response!(
    GetRecord,
    Identify,
    ListIdentifiers,
    ListMetadataFormats,
    ListRecords,
    ListSets
);

impl From<ErrorResponse> for VerbResponse {
    fn from(response: ErrorResponse) -> Self {
        VerbResponse::Error(response)
    }
}
