//! Items nested inside the list and record verbs

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;

use super::required_value;
use crate::codec::{
    FieldSet, OAI_NAMESPACE, WriteElement, XmlWriter, all_fragments, all_texts, required_text,
};
use crate::document::{XmlDocument, XmlElement, XmlFragment};
use crate::error::{OaiError, Result};
use crate::fields::{FieldDescriptor, FieldValue, Multiplicity, OptionalPlural};

/// Record header: identifier, datestamp and set membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    identifier: String,
    datestamp: String,
    set_specs: OptionalPlural<String>,
    deleted: bool,
}

impl Header {
    pub fn new(identifier: impl Into<String>, datestamp: impl Into<String>) -> Result<Self> {
        Ok(Self {
            identifier: required_value("header", "identifier", identifier)?,
            datestamp: required_value("header", "datestamp", datestamp)?,
            set_specs: OptionalPlural::new(),
            deleted: false,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn datestamp(&self) -> &str {
        &self.datestamp
    }

    pub fn set_specs(&self) -> &[String] {
        self.set_specs.as_slice()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn append_set_spec(&mut self, set_spec: impl Into<String>) {
        self.set_specs.push(set_spec.into());
    }

    pub fn with_set_spec(mut self, set_spec: impl Into<String>) -> Self {
        self.append_set_spec(set_spec);
        self
    }

    /// Marks the item as deleted (`status="deleted"`)
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub(crate) fn from_element(element: &XmlElement) -> Result<Self> {
        let deleted = match element.attribute("status") {
            None => false,
            Some("deleted") => true,
            Some(other) => {
                return Err(OaiError::malformed(format!(
                    "unknown header status '{other}'"
                )));
            }
        };

        Ok(Self {
            identifier: required_text(element, "identifier")?,
            datestamp: required_text(element, "datestamp")?,
            set_specs: all_texts(element, "setSpec").into_iter().collect(),
            deleted,
        })
    }
}

fn header_identifier(h: &Header) -> FieldValue<'_> {
    FieldValue::Text(Some(&h.identifier))
}

fn header_datestamp(h: &Header) -> FieldValue<'_> {
    FieldValue::Text(Some(&h.datestamp))
}

fn header_set_specs(h: &Header) -> FieldValue<'_> {
    FieldValue::Texts(h.set_specs.as_slice())
}

static HEADER_FIELDS: [FieldDescriptor<Header>; 3] = [
    FieldDescriptor::new("identifier", Multiplicity::RequiredSingular, header_identifier),
    FieldDescriptor::new("datestamp", Multiplicity::RequiredSingular, header_datestamp),
    FieldDescriptor::new("setSpec", Multiplicity::OptionalPlural, header_set_specs),
];

impl FieldSet for Header {
    const TAG: &'static str = "header";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &HEADER_FIELDS
    }

    fn attributes(&self) -> Vec<(&'static str, String)> {
        if self.deleted {
            vec![("status", "deleted".to_string())]
        } else {
            Vec::new()
        }
    }
}

/// A metadata record. A live record carries exactly one metadata payload; a
/// deleted one carries none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    header: Header,
    metadata: Option<XmlFragment>,
    about: OptionalPlural<XmlFragment>,
}

impl Record {
    pub fn new(header: Header, metadata: XmlFragment) -> Result<Self> {
        let record = Self {
            header,
            metadata: Some(metadata),
            about: OptionalPlural::new(),
        };
        record.check()?;
        Ok(record)
    }

    /// Record for a deleted item: the header is marked deleted and there is no metadata
    pub fn deleted(mut header: Header) -> Self {
        header.mark_deleted();
        Self {
            header,
            metadata: None,
            about: OptionalPlural::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn metadata(&self) -> Option<&XmlFragment> {
        self.metadata.as_ref()
    }

    pub fn about(&self) -> &[XmlFragment] {
        self.about.as_slice()
    }

    pub fn append_about(&mut self, about: XmlFragment) {
        self.about.push(about);
    }

    pub(crate) fn from_element(doc: &XmlDocument, element: &XmlElement) -> Result<Self> {
        let header = Header::from_element(element.exactly_one(OAI_NAMESPACE, "header")?)?;
        let metadata = element
            .at_most_one(OAI_NAMESPACE, "metadata")?
            .map(|wrapper| doc.fragment_of(wrapper))
            .transpose()?;

        let record = Self {
            header,
            metadata,
            about: all_fragments(doc, element, "about")?.into_iter().collect(),
        };
        record
            .check()
            .map_err(|e| OaiError::malformed(e.to_string()))?;
        Ok(record)
    }
}

fn record_header(r: &Record) -> FieldValue<'_> {
    FieldValue::element(Some(&r.header))
}

fn record_metadata(r: &Record) -> FieldValue<'_> {
    FieldValue::Fragments(r.metadata.as_slice())
}

fn record_about(r: &Record) -> FieldValue<'_> {
    FieldValue::Fragments(r.about.as_slice())
}

static RECORD_FIELDS: [FieldDescriptor<Record>; 3] = [
    FieldDescriptor::new("header", Multiplicity::RequiredSingular, record_header),
    FieldDescriptor::new("metadata", Multiplicity::OptionalSingular, record_metadata),
    FieldDescriptor::new("about", Multiplicity::OptionalPlural, record_about),
];

impl FieldSet for Record {
    const TAG: &'static str = "record";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &RECORD_FIELDS
    }

    fn check(&self) -> Result<()> {
        match (self.header.deleted, self.metadata.is_some()) {
            (false, false) => Err(OaiError::MissingRequiredField {
                element: "record",
                field: "metadata",
            }),
            (true, true) => Err(OaiError::Inconsistent {
                element: "record",
                details: format!(
                    "deleted record '{}' must not carry metadata",
                    self.header.identifier
                ),
            }),
            _ => Ok(()),
        }
    }
}

/// Flow-control token for incomplete lists. An empty token marks the last page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResumptionToken {
    token: String,
    expiration_date: Option<DateTime<Utc>>,
    complete_list_size: Option<u64>,
    cursor: Option<u64>,
}

impl ResumptionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// The empty token sent with the final page of a list
    pub fn last_page() -> Self {
        Self::default()
    }

    pub fn with_expiration_date(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    pub fn with_complete_list_size(mut self, size: u64) -> Self {
        self.complete_list_size = Some(size);
        self
    }

    pub fn with_cursor(mut self, cursor: u64) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_last_page(&self) -> bool {
        self.token.is_empty()
    }

    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.expiration_date
    }

    pub fn complete_list_size(&self) -> Option<u64> {
        self.complete_list_size
    }

    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    pub(crate) fn from_element(element: &XmlElement) -> Result<Self> {
        let number = |name: &str| -> Result<Option<u64>> {
            element
                .attribute(name)
                .map(|value| {
                    value.parse::<u64>().map_err(|_| {
                        OaiError::malformed(format!("resumptionToken {name} '{value}' is not a number"))
                    })
                })
                .transpose()
        };

        let expiration_date = element
            .attribute("expirationDate")
            .map(|value| {
                DateTime::parse_from_rfc3339(value)
                    .map(|date| date.with_timezone(&Utc))
                    .map_err(|e| {
                        OaiError::malformed(format!("invalid expirationDate '{value}': {e}"))
                    })
            })
            .transpose()?;

        Ok(Self {
            token: element.text().to_string(),
            expiration_date,
            complete_list_size: number("completeListSize")?,
            cursor: number("cursor")?,
        })
    }

    pub(crate) fn optional_in(parent: &XmlElement) -> Result<Option<Self>> {
        parent
            .at_most_one(OAI_NAMESPACE, "resumptionToken")?
            .map(Self::from_element)
            .transpose()
    }
}

impl WriteElement for ResumptionToken {
    fn write_element(&self, writer: &mut XmlWriter) -> Result<()> {
        let mut start = BytesStart::new("resumptionToken");
        if let Some(date) = self.expiration_date {
            let date = date.to_rfc3339_opts(SecondsFormat::Secs, true);
            start.push_attribute(("expirationDate", date.as_str()));
        }
        if let Some(size) = self.complete_list_size {
            start.push_attribute(("completeListSize", size.to_string().as_str()));
        }
        if let Some(cursor) = self.cursor {
            start.push_attribute(("cursor", cursor.to_string().as_str()));
        }

        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&self.token)))?;
        writer.write_event(Event::End(BytesEnd::new("resumptionToken")))?;
        Ok(())
    }
}

/// A metadata format a repository can disseminate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataFormat {
    metadata_prefix: String,
    schema: String,
    metadata_namespace: String,
}

impl MetadataFormat {
    pub fn new(
        metadata_prefix: impl Into<String>,
        schema: impl Into<String>,
        metadata_namespace: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            metadata_prefix: required_value("metadataFormat", "metadataPrefix", metadata_prefix)?,
            schema: required_value("metadataFormat", "schema", schema)?,
            metadata_namespace: required_value(
                "metadataFormat",
                "metadataNamespace",
                metadata_namespace,
            )?,
        })
    }

    /// The Dublin Core format every repository must support
    pub fn oai_dc() -> Self {
        Self {
            metadata_prefix: "oai_dc".to_string(),
            schema: "http://www.openarchives.org/OAI/2.0/oai_dc.xsd".to_string(),
            metadata_namespace: "http://www.openarchives.org/OAI/2.0/oai_dc/".to_string(),
        }
    }

    pub fn metadata_prefix(&self) -> &str {
        &self.metadata_prefix
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn metadata_namespace(&self) -> &str {
        &self.metadata_namespace
    }

    pub(crate) fn from_element(element: &XmlElement) -> Result<Self> {
        Ok(Self {
            metadata_prefix: required_text(element, "metadataPrefix")?,
            schema: required_text(element, "schema")?,
            metadata_namespace: required_text(element, "metadataNamespace")?,
        })
    }
}

fn format_prefix(f: &MetadataFormat) -> FieldValue<'_> {
    FieldValue::Text(Some(&f.metadata_prefix))
}

fn format_schema(f: &MetadataFormat) -> FieldValue<'_> {
    FieldValue::Text(Some(&f.schema))
}

fn format_namespace(f: &MetadataFormat) -> FieldValue<'_> {
    FieldValue::Text(Some(&f.metadata_namespace))
}

static METADATA_FORMAT_FIELDS: [FieldDescriptor<MetadataFormat>; 3] = [
    FieldDescriptor::new("metadataPrefix", Multiplicity::RequiredSingular, format_prefix),
    FieldDescriptor::new("schema", Multiplicity::RequiredSingular, format_schema),
    FieldDescriptor::new("metadataNamespace", Multiplicity::RequiredSingular, format_namespace),
];

impl FieldSet for MetadataFormat {
    const TAG: &'static str = "metadataFormat";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &METADATA_FORMAT_FIELDS
    }
}

/// A set in the repository's set hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Set {
    set_spec: String,
    set_name: String,
    set_descriptions: OptionalPlural<XmlFragment>,
}

impl Set {
    pub fn new(set_spec: impl Into<String>, set_name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            set_spec: required_value("set", "setSpec", set_spec)?,
            set_name: required_value("set", "setName", set_name)?,
            set_descriptions: OptionalPlural::new(),
        })
    }

    pub fn set_spec(&self) -> &str {
        &self.set_spec
    }

    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    pub fn set_descriptions(&self) -> &[XmlFragment] {
        self.set_descriptions.as_slice()
    }

    pub fn append_set_description(&mut self, description: XmlFragment) {
        self.set_descriptions.push(description);
    }

    pub(crate) fn from_element(doc: &XmlDocument, element: &XmlElement) -> Result<Self> {
        Ok(Self {
            set_spec: required_text(element, "setSpec")?,
            set_name: required_text(element, "setName")?,
            set_descriptions: all_fragments(doc, element, "setDescription")?
                .into_iter()
                .collect(),
        })
    }
}

fn set_spec(s: &Set) -> FieldValue<'_> {
    FieldValue::Text(Some(&s.set_spec))
}

fn set_name(s: &Set) -> FieldValue<'_> {
    FieldValue::Text(Some(&s.set_name))
}

fn set_descriptions(s: &Set) -> FieldValue<'_> {
    FieldValue::Fragments(s.set_descriptions.as_slice())
}

static SET_FIELDS: [FieldDescriptor<Set>; 3] = [
    FieldDescriptor::new("setSpec", Multiplicity::RequiredSingular, set_spec),
    FieldDescriptor::new("setName", Multiplicity::RequiredSingular, set_name),
    FieldDescriptor::new("setDescription", Multiplicity::OptionalPlural, set_descriptions),
];

impl FieldSet for Set {
    const TAG: &'static str = "set";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &SET_FIELDS
    }
}
