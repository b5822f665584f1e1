use serde::Serialize;

use super::{OaiResponse, Record, ResumptionToken};
use crate::codec::{FieldSet, OAI_NAMESPACE};
use crate::document::XmlDocument;
use crate::envelope::{Envelope, RequestEcho, decode_envelope};
use crate::error::Result;
use crate::fields::{FieldDescriptor, FieldValue, Multiplicity, RequiredPlural};
use crate::request::Verb;

/// Records matching a selective harvest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRecords {
    envelope: Envelope,
    records: RequiredPlural<Record>,
    resumption_token: Option<ResumptionToken>,
}

impl ListRecords {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::new(RequestEcho::for_verb(base_url, Verb::ListRecords)),
            records: RequiredPlural::new(),
            resumption_token: None,
        }
    }

    pub fn records(&self) -> &[Record] {
        self.records.as_slice()
    }

    pub fn resumption_token(&self) -> Option<&ResumptionToken> {
        self.resumption_token.as_ref()
    }

    pub fn append_record(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn set_resumption_token(&mut self, token: ResumptionToken) {
        self.resumption_token = Some(token);
    }
}

fn records(l: &ListRecords) -> FieldValue<'_> {
    FieldValue::elements(l.records.as_slice())
}

fn resumption_token(l: &ListRecords) -> FieldValue<'_> {
    FieldValue::element(l.resumption_token.as_ref())
}

static LIST_RECORDS_FIELDS: [FieldDescriptor<ListRecords>; 2] = [
    FieldDescriptor::new("record", Multiplicity::RequiredPlural, records),
    FieldDescriptor::new("resumptionToken", Multiplicity::OptionalSingular, resumption_token),
];

impl FieldSet for ListRecords {
    const TAG: &'static str = "ListRecords";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &LIST_RECORDS_FIELDS
    }
}

impl OaiResponse for ListRecords {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn from_document(doc: &XmlDocument) -> Result<Self> {
        let (envelope, body) = decode_envelope(doc, "ListRecords")?;
        let records = body
            .children_named(OAI_NAMESPACE, "record")
            .map(|element| Record::from_element(doc, element))
            .collect::<Result<_>>()?;

        Ok(Self {
            envelope,
            records,
            resumption_token: ResumptionToken::optional_in(body)?,
        })
    }
}
