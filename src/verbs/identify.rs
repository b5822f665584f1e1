use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{OaiResponse, required_value};
use crate::codec::{FieldSet, all_fragments, all_texts, required_text};
use crate::datestamp::Granularity;
use crate::document::{XmlDocument, XmlFragment};
use crate::envelope::{Envelope, RequestEcho, decode_envelope};
use crate::error::{OaiError, Result};
use crate::fields::{FieldDescriptor, FieldValue, Multiplicity, OptionalPlural, RequiredPlural};
use crate::request::Verb;

pub const PROTOCOL_VERSION: &str = "2.0";

/// How a repository keeps track of deletions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletedRecord {
    No,
    Persistent,
    #[default]
    Transient,
}

impl DeletedRecord {
    pub fn as_str(self) -> &'static str {
        match self {
            DeletedRecord::No => "no",
            DeletedRecord::Persistent => "persistent",
            DeletedRecord::Transient => "transient",
        }
    }
}

impl fmt::Display for DeletedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletedRecord {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "no" => Ok(DeletedRecord::No),
            "persistent" => Ok(DeletedRecord::Persistent),
            "transient" => Ok(DeletedRecord::Transient),
            other => Err(format!("unknown deletedRecord policy '{other}'")),
        }
    }
}

/// The Identify response: repository identity and capabilities.
///
/// Everything except `earliestDatestamp` is fixed at construction; plural
/// fields grow only through the `append_*` methods. `earliestDatestamp`
/// starts unknown and must be set before the response can be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identify {
    envelope: Envelope,
    repository_name: String,
    base_url: String,
    protocol_version: String,
    admin_emails: RequiredPlural<String>,
    earliest_datestamp: Option<String>,
    deleted_record: DeletedRecord,
    granularity: Granularity,
    compression: OptionalPlural<String>,
    descriptions: OptionalPlural<XmlFragment>,
}

impl Identify {
    /// Identify with protocol defaults: version 2.0, transient deletions, seconds granularity
    pub fn new(base_url: impl Into<String>, repository_name: impl Into<String>) -> Result<Self> {
        Self::with_settings(
            base_url,
            repository_name,
            DeletedRecord::default(),
            Granularity::default(),
        )
    }

    pub fn with_settings(
        base_url: impl Into<String>,
        repository_name: impl Into<String>,
        deleted_record: DeletedRecord,
        granularity: Granularity,
    ) -> Result<Self> {
        let base_url = required_value("Identify", "baseURL", base_url)?;
        let repository_name = required_value("Identify", "repositoryName", repository_name)?;

        Ok(Self {
            envelope: Envelope::new(RequestEcho::for_verb(base_url.as_str(), Verb::Identify)),
            repository_name,
            base_url,
            protocol_version: PROTOCOL_VERSION.to_string(),
            admin_emails: RequiredPlural::new(),
            earliest_datestamp: None,
            deleted_record,
            granularity,
            compression: OptionalPlural::new(),
            descriptions: OptionalPlural::new(),
        })
    }

    /// Only [`PROTOCOL_VERSION`] is accepted; it is also the default
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        if version != PROTOCOL_VERSION {
            return Err(OaiError::UnsupportedProtocolVersion(version));
        }
        self.protocol_version = version;
        Ok(self)
    }

    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn admin_emails(&self) -> &[String] {
        self.admin_emails.as_slice()
    }

    /// `None` until the repository reports its earliest datestamp
    pub fn earliest_datestamp(&self) -> Option<&str> {
        self.earliest_datestamp.as_deref()
    }

    pub fn deleted_record(&self) -> DeletedRecord {
        self.deleted_record
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn compression(&self) -> &[String] {
        self.compression.as_slice()
    }

    pub fn descriptions(&self) -> &[XmlFragment] {
        self.descriptions.as_slice()
    }

    pub fn set_earliest_datestamp(&mut self, datestamp: impl Into<String>) {
        self.earliest_datestamp = Some(datestamp.into());
    }

    pub fn append_admin_email(&mut self, email: impl Into<String>) {
        self.admin_emails.push(email.into());
    }

    pub fn append_compression(&mut self, compression: impl Into<String>) {
        self.compression.push(compression.into());
    }

    pub fn append_description(&mut self, description: XmlFragment) {
        self.descriptions.push(description);
    }
}

fn repository_name(i: &Identify) -> FieldValue<'_> {
    FieldValue::Text(Some(&i.repository_name))
}

fn base_url(i: &Identify) -> FieldValue<'_> {
    FieldValue::Text(Some(&i.base_url))
}

fn protocol_version(i: &Identify) -> FieldValue<'_> {
    FieldValue::Text(Some(&i.protocol_version))
}

fn admin_emails(i: &Identify) -> FieldValue<'_> {
    FieldValue::Texts(i.admin_emails.as_slice())
}

fn earliest_datestamp(i: &Identify) -> FieldValue<'_> {
    FieldValue::Text(i.earliest_datestamp.as_deref())
}

fn deleted_record(i: &Identify) -> FieldValue<'_> {
    FieldValue::Text(Some(i.deleted_record.as_str()))
}

fn granularity(i: &Identify) -> FieldValue<'_> {
    FieldValue::Text(Some(i.granularity.as_str()))
}

fn compression(i: &Identify) -> FieldValue<'_> {
    FieldValue::Texts(i.compression.as_slice())
}

fn descriptions(i: &Identify) -> FieldValue<'_> {
    FieldValue::Fragments(i.descriptions.as_slice())
}

static IDENTIFY_FIELDS: [FieldDescriptor<Identify>; 9] = [
    FieldDescriptor::new("repositoryName", Multiplicity::RequiredSingular, repository_name),
    FieldDescriptor::new("baseURL", Multiplicity::RequiredSingular, base_url),
    FieldDescriptor::new("protocolVersion", Multiplicity::RequiredSingular, protocol_version),
    FieldDescriptor::new("adminEmail", Multiplicity::RequiredPlural, admin_emails),
    FieldDescriptor::new("earliestDatestamp", Multiplicity::RequiredSingular, earliest_datestamp),
    FieldDescriptor::new("deletedRecord", Multiplicity::RequiredSingular, deleted_record),
    FieldDescriptor::new("granularity", Multiplicity::RequiredSingular, granularity),
    FieldDescriptor::new("compression", Multiplicity::OptionalPlural, compression),
    FieldDescriptor::new("description", Multiplicity::OptionalPlural, descriptions),
];

impl FieldSet for Identify {
    const TAG: &'static str = "Identify";

    fn descriptors() -> &'static [FieldDescriptor<Self>] {
        &IDENTIFY_FIELDS
    }
}

impl OaiResponse for Identify {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn from_document(doc: &XmlDocument) -> Result<Self> {
        let (envelope, body) = decode_envelope(doc, "Identify")?;

        let deleted_record = required_text(body, "deletedRecord")?
            .parse()
            .map_err(OaiError::MalformedDocument)?;
        let granularity = required_text(body, "granularity")?
            .parse()
            .map_err(OaiError::MalformedDocument)?;

        Ok(Self {
            envelope,
            repository_name: required_text(body, "repositoryName")?,
            base_url: required_text(body, "baseURL")?,
            protocol_version: required_text(body, "protocolVersion")?,
            admin_emails: all_texts(body, "adminEmail").into_iter().collect(),
            earliest_datestamp: Some(required_text(body, "earliestDatestamp")?),
            deleted_record,
            granularity,
            compression: all_texts(body, "compression").into_iter().collect(),
            descriptions: all_fragments(doc, body, "description")?
                .into_iter()
                .collect(),
        })
    }
}
