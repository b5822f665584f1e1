use serde::Serialize;

use super::{OaiResponse, Record};
use crate::codec::{FieldSet, OAI_NAMESPACE};
use crate::document::XmlDocument;
use crate::envelope::{Envelope, RequestEcho, decode_envelope};
use crate::error::Result;
use crate::fields::{FieldDescriptor, FieldValue, Multiplicity};
use crate::request::Verb;

/// A single record, in the requested metadata format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetRecord {
    envelope: Envelope,
    record: Record,
}

impl GetRecord {
    pub fn new(base_url: impl Into<String>, record: Record) -> Self {
        Self {
            envelope: Envelope::new(RequestEcho::for_verb(base_url, Verb::GetRecord)),
            record,
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }
}

fn record(r: &GetRecord) -> FieldValue<'_> {
    FieldValue::element(Some(&r.record))
}

static GET_RECORD_FIELDS: [FieldDescriptor<GetRecord>; 1] = [FieldDescriptor::new(
    "record",
    Multiplicity::RequiredSingular,
    record,
)];

impl FieldSet for GetRecord {
    const TAG: &'static str = "GetRecord";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &GET_RECORD_FIELDS
    }
}

impl OaiResponse for GetRecord {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn from_document(doc: &XmlDocument) -> Result<Self> {
        let (envelope, body) = decode_envelope(doc, "GetRecord")?;
        let record = Record::from_element(doc, body.exactly_one(OAI_NAMESPACE, "record")?)?;
        Ok(Self { envelope, record })
    }
}
