use serde::Serialize;

use super::{Header, OaiResponse, ResumptionToken};
use crate::codec::{FieldSet, OAI_NAMESPACE};
use crate::document::XmlDocument;
use crate::envelope::{Envelope, RequestEcho, decode_envelope};
use crate::error::Result;
use crate::fields::{FieldDescriptor, FieldValue, Multiplicity, RequiredPlural};
use crate::request::Verb;

/// Headers of the records matching a selective harvest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListIdentifiers {
    envelope: Envelope,
    headers: RequiredPlural<Header>,
    resumption_token: Option<ResumptionToken>,
}

impl ListIdentifiers {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::new(RequestEcho::for_verb(base_url, Verb::ListIdentifiers)),
            headers: RequiredPlural::new(),
            resumption_token: None,
        }
    }

    pub fn headers(&self) -> &[Header] {
        self.headers.as_slice()
    }

    pub fn resumption_token(&self) -> Option<&ResumptionToken> {
        self.resumption_token.as_ref()
    }

    pub fn append_header(&mut self, header: Header) {
        self.headers.push(header);
    }

    pub fn set_resumption_token(&mut self, token: ResumptionToken) {
        self.resumption_token = Some(token);
    }
}

fn headers(l: &ListIdentifiers) -> FieldValue<'_> {
    FieldValue::elements(l.headers.as_slice())
}

fn resumption_token(l: &ListIdentifiers) -> FieldValue<'_> {
    FieldValue::element(l.resumption_token.as_ref())
}

static LIST_IDENTIFIERS_FIELDS: [FieldDescriptor<ListIdentifiers>; 2] = [
    FieldDescriptor::new("header", Multiplicity::RequiredPlural, headers),
    FieldDescriptor::new("resumptionToken", Multiplicity::OptionalSingular, resumption_token),
];

impl FieldSet for ListIdentifiers {
    const TAG: &'static str = "ListIdentifiers";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &LIST_IDENTIFIERS_FIELDS
    }
}

impl OaiResponse for ListIdentifiers {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn from_document(doc: &XmlDocument) -> Result<Self> {
        let (envelope, body) = decode_envelope(doc, "ListIdentifiers")?;
        let headers = body
            .children_named(OAI_NAMESPACE, "header")
            .map(Header::from_element)
            .collect::<Result<_>>()?;

        Ok(Self {
            envelope,
            headers,
            resumption_token: ResumptionToken::optional_in(body)?,
        })
    }
}
