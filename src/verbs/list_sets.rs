use serde::Serialize;

use super::{OaiResponse, ResumptionToken, Set};
use crate::codec::{FieldSet, OAI_NAMESPACE};
use crate::document::XmlDocument;
use crate::envelope::{Envelope, RequestEcho, decode_envelope};
use crate::error::Result;
use crate::fields::{FieldDescriptor, FieldValue, Multiplicity, RequiredPlural};
use crate::request::Verb;

/// The repository's set structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSets {
    envelope: Envelope,
    sets: RequiredPlural<Set>,
    resumption_token: Option<ResumptionToken>,
}

impl ListSets {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::new(RequestEcho::for_verb(base_url, Verb::ListSets)),
            sets: RequiredPlural::new(),
            resumption_token: None,
        }
    }

    pub fn sets(&self) -> &[Set] {
        self.sets.as_slice()
    }

    pub fn resumption_token(&self) -> Option<&ResumptionToken> {
        self.resumption_token.as_ref()
    }

    pub fn append_set(&mut self, set: Set) {
        self.sets.push(set);
    }

    pub fn set_resumption_token(&mut self, token: ResumptionToken) {
        self.resumption_token = Some(token);
    }
}

fn sets(l: &ListSets) -> FieldValue<'_> {
    FieldValue::elements(l.sets.as_slice())
}

fn resumption_token(l: &ListSets) -> FieldValue<'_> {
    FieldValue::element(l.resumption_token.as_ref())
}

static LIST_SETS_FIELDS: [FieldDescriptor<ListSets>; 2] = [
    FieldDescriptor::new("set", Multiplicity::RequiredPlural, sets),
    FieldDescriptor::new("resumptionToken", Multiplicity::OptionalSingular, resumption_token),
];

impl FieldSet for ListSets {
    const TAG: &'static str = "ListSets";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &LIST_SETS_FIELDS
    }
}

impl OaiResponse for ListSets {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn from_document(doc: &XmlDocument) -> Result<Self> {
        let (envelope, body) = decode_envelope(doc, "ListSets")?;
        let sets = body
            .children_named(OAI_NAMESPACE, "set")
            .map(|element| Set::from_element(doc, element))
            .collect::<Result<_>>()?;

        Ok(Self {
            envelope,
            sets,
            resumption_token: ResumptionToken::optional_in(body)?,
        })
    }
}
