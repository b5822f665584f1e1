use serde::Serialize;

use super::{MetadataFormat, OaiResponse};
use crate::codec::{FieldSet, OAI_NAMESPACE};
use crate::document::XmlDocument;
use crate::envelope::{Envelope, RequestEcho, decode_envelope};
use crate::error::Result;
use crate::fields::{FieldDescriptor, FieldValue, Multiplicity, RequiredPlural};
use crate::request::Verb;

/// Metadata formats available from the repository, or for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListMetadataFormats {
    envelope: Envelope,
    formats: RequiredPlural<MetadataFormat>,
}

impl ListMetadataFormats {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::new(RequestEcho::for_verb(base_url, Verb::ListMetadataFormats)),
            formats: RequiredPlural::new(),
        }
    }

    pub fn formats(&self) -> &[MetadataFormat] {
        self.formats.as_slice()
    }

    pub fn append_format(&mut self, format: MetadataFormat) {
        self.formats.push(format);
    }
}

fn formats(l: &ListMetadataFormats) -> FieldValue<'_> {
    FieldValue::elements(l.formats.as_slice())
}

static LIST_METADATA_FORMATS_FIELDS: [FieldDescriptor<ListMetadataFormats>; 1] = [
    FieldDescriptor::new("metadataFormat", Multiplicity::RequiredPlural, formats),
];

impl FieldSet for ListMetadataFormats {
    const TAG: &'static str = "ListMetadataFormats";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &LIST_METADATA_FORMATS_FIELDS
    }
}

impl OaiResponse for ListMetadataFormats {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn from_document(doc: &XmlDocument) -> Result<Self> {
        let (envelope, body) = decode_envelope(doc, "ListMetadataFormats")?;
        let formats = body
            .children_named(OAI_NAMESPACE, "metadataFormat")
            .map(MetadataFormat::from_element)
            .collect::<Result<_>>()?;

        Ok(Self { envelope, formats })
    }
}
