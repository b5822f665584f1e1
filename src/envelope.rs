//! The `responseDate` / `request` header shared by every response

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;

use crate::codec::{OAI_NAMESPACE, XmlWriter, required_text, write_text_element};
use crate::document::{XmlDocument, XmlElement};
use crate::error::{OaiError, Result};
use crate::request::{RequestParams, Verb, is_legal_argument};

/// Echo of the request a response answers: the base URL plus the accepted arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestEcho {
    base_url: String,
    arguments: BTreeMap<String, String>,
}

impl RequestEcho {
    /// Echo without arguments, as used for badVerb and badArgument responses
    pub fn bare(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn for_verb(base_url: impl Into<String>, verb: Verb) -> Self {
        Self::bare(base_url).with_argument("verb", verb.as_str())
    }

    /// Echo of the arguments that belong to the request's verb and have legal
    /// values; anything else stays out of the `request` element
    pub fn accepted(base_url: impl Into<String>, params: &RequestParams) -> Self {
        let Some(verb) = params.get("verb").and_then(|name| name.parse::<Verb>().ok()) else {
            return Self::bare(base_url);
        };
        Self {
            base_url: base_url.into(),
            arguments: params
                .iter()
                .filter(|(name, value)| {
                    (*name == "verb" || verb.rule(name).is_some()) && is_legal_argument(name, value)
                })
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn arguments(&self) -> &BTreeMap<String, String> {
        &self.arguments
    }

    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    response_date: DateTime<Utc>,
    request: RequestEcho,
}

impl Envelope {
    /// Envelope stamped with the current time, truncated to whole seconds
    pub fn new(request: RequestEcho) -> Self {
        Self::at(Utc::now(), request)
    }

    pub fn at(response_date: DateTime<Utc>, request: RequestEcho) -> Self {
        let response_date = response_date
            .with_nanosecond(0)
            .unwrap_or(response_date);
        Self {
            response_date,
            request,
        }
    }

    pub fn response_date(&self) -> DateTime<Utc> {
        self.response_date
    }

    pub fn request(&self) -> &RequestEcho {
        &self.request
    }

    pub fn set_response_date(&mut self, response_date: DateTime<Utc>) {
        *self = Self::at(response_date, self.request.clone());
    }

    pub fn set_request(&mut self, request: RequestEcho) {
        self.request = request;
    }

    pub(crate) fn write(&self, writer: &mut XmlWriter) -> Result<()> {
        let date = self
            .response_date
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        write_text_element(writer, "responseDate", &date)?;

        let mut start = BytesStart::new("request");
        if let Some(verb) = self.request.argument("verb") {
            start.push_attribute(("verb", verb));
        }
        for (key, value) in &self.request.arguments {
            if key != "verb" {
                start.push_attribute((key.as_str(), value.as_str()));
            }
        }
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&self.request.base_url)))?;
        writer.write_event(Event::End(BytesEnd::new("request")))?;
        Ok(())
    }

    /// Reads the header from an `OAI-PMH` root element
    pub(crate) fn decode(root: &XmlElement) -> Result<Self> {
        if !root.is(OAI_NAMESPACE, "OAI-PMH") {
            return Err(OaiError::malformed(format!(
                "expected OAI-PMH root element, found <{}>",
                root.local_name()
            )));
        }

        let date_text = required_text(root, "responseDate")?;
        let response_date = DateTime::parse_from_rfc3339(&date_text)
            .map_err(|e| OaiError::malformed(format!("invalid responseDate '{date_text}': {e}")))?
            .with_timezone(&Utc);

        let request = root.exactly_one(OAI_NAMESPACE, "request")?;
        let echo = RequestEcho {
            base_url: request.text().to_string(),
            arguments: request.attributes().iter().cloned().collect(),
        };

        Ok(Self::at(response_date, echo))
    }
}

/// Decodes the envelope of `doc` and returns it with the single body element `body_name`
pub(crate) fn decode_envelope<'d>(
    doc: &'d XmlDocument,
    body_name: &str,
) -> Result<(Envelope, &'d XmlElement)> {
    let root = doc.root();
    let envelope = Envelope::decode(root)?;
    let body = root.exactly_one(OAI_NAMESPACE, body_name)?;
    Ok((envelope, body))
}
