use std::fmt;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;

use super::OaiResponse;
use crate::codec::{OAI_NAMESPACE, WriteElement, XmlWriter};
use crate::document::XmlDocument;
use crate::envelope::{Envelope, RequestEcho};
use crate::error::{ErrorCode, OaiError, RequestError, Result};
use crate::fields::{Multiplicity, RequiredPlural};
use crate::request::RequestParams;

/// One `<error code="...">` element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolError {
    code: ErrorCode,
    message: String,
}

impl ProtocolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<&RequestError> for ProtocolError {
    fn from(err: &RequestError) -> Self {
        Self::new(err.code(), err.message())
    }
}

impl WriteElement for ProtocolError {
    fn write_element(&self, writer: &mut XmlWriter) -> Result<()> {
        let mut start = BytesStart::new("error");
        start.push_attribute(("code", self.code.as_str()));
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&self.message)))?;
        writer.write_event(Event::End(BytesEnd::new("error")))?;
        Ok(())
    }
}

/// A response reporting one or more protocol errors in place of a verb body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    envelope: Envelope,
    errors: RequiredPlural<ProtocolError>,
}

impl ErrorResponse {
    pub fn new(request: RequestEcho, error: ProtocolError) -> Self {
        let mut errors = RequiredPlural::new();
        errors.push(error);
        Self {
            envelope: Envelope::new(request),
            errors,
        }
    }

    /// Error response for a rejected request. badVerb and badArgument
    /// responses echo only the base URL; badResumptionToken echoes the verb
    /// and the token. Only legal arguments of the verb are ever echoed.
    pub fn from_request_error(
        base_url: impl Into<String>,
        params: &RequestParams,
        err: &RequestError,
    ) -> Self {
        let request = match err.code() {
            ErrorCode::BadVerb | ErrorCode::BadArgument => RequestEcho::bare(base_url),
            ErrorCode::BadResumptionToken => {
                let echoed: RequestParams = params
                    .iter()
                    .filter(|(name, _)| matches!(*name, "verb" | "resumptionToken"))
                    .collect();
                RequestEcho::accepted(base_url, &echoed)
            }
            _ => RequestEcho::accepted(base_url, params),
        };
        Self::new(request, err.into())
    }

    pub fn errors(&self) -> &[ProtocolError] {
        self.errors.as_slice()
    }

    pub fn append_error(&mut self, error: ProtocolError) {
        self.errors.push(error);
    }
}

impl WriteElement for ErrorResponse {
    fn write_element(&self, writer: &mut XmlWriter) -> Result<()> {
        if self.errors.is_empty() {
            return Err(OaiError::CardinalityViolation {
                element: "OAI-PMH",
                field: "error",
                expected: Multiplicity::RequiredPlural,
                found: 0,
            });
        }
        for error in &self.errors {
            error.write_element(writer)?;
        }
        Ok(())
    }
}

impl OaiResponse for ErrorResponse {
    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn from_document(doc: &XmlDocument) -> Result<Self> {
        let root = doc.root();
        let envelope = Envelope::decode(root)?;

        let errors: RequiredPlural<ProtocolError> = root
            .children_named(OAI_NAMESPACE, "error")
            .map(|element| {
                let code = element.attribute("code").unwrap_or_default();
                let code = ErrorCode::parse(code)
                    .ok_or_else(|| OaiError::malformed(format!("unknown error code '{code}'")))?;
                Ok(ProtocolError::new(code, element.text()))
            })
            .collect::<Result<_>>()?;

        if errors.is_empty() {
            return Err(OaiError::malformed("OAI-PMH document has no error elements"));
        }
        Ok(Self { envelope, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_verb_echoes_no_arguments() {
        let params = RequestParams::new().with("verb", "Frobnicate");
        let err = RequestError::BadVerb("Illegal verb specified".to_string());
        let response = ErrorResponse::from_request_error("http://example.org/oai", &params, &err);

        let xml = response.encode().unwrap();
        assert!(xml.contains("<request>http://example.org/oai</request>"));
        assert!(xml.contains("<error code=\"badVerb\">Illegal verb specified</error>"));
    }

    #[test]
    fn test_bad_resumption_token_echoes_arguments() {
        let params = RequestParams::new()
            .with("verb", "ListSets")
            .with("resumptionToken", "stale");
        let err = RequestError::BadResumptionToken("expired".to_string());
        let response = ErrorResponse::from_request_error("http://example.org/oai", &params, &err);

        assert_eq!(
            response.envelope().request().argument("resumptionToken"),
            Some("stale")
        );
    }

    #[test]
    fn test_bad_resumption_token_echoes_only_verb_and_token() {
        let params = RequestParams::new()
            .with("verb", "ListRecords")
            .with("resumptionToken", "abc")
            .with("from", "last tuesday");
        let err = RequestError::BadResumptionToken(
            "resumptionToken with too many other params".to_string(),
        );
        let response = ErrorResponse::from_request_error("http://example.org/oai", &params, &err);

        let request = response.envelope().request();
        assert_eq!(request.argument("verb"), Some("ListRecords"));
        assert_eq!(request.argument("resumptionToken"), Some("abc"));
        assert_eq!(request.argument("from"), None);
    }

    #[test]
    fn test_multiple_errors_round_trip() {
        let mut response = ErrorResponse::new(
            RequestEcho::bare("http://example.org/oai"),
            ProtocolError::new(ErrorCode::BadArgument, "illegal parameter"),
        );
        response.append_error(ProtocolError::new(
            ErrorCode::BadArgument,
            "required parameter missing",
        ));

        let decoded = ErrorResponse::decode(&response.encode().unwrap()).unwrap();
        assert_eq!(decoded, response);
        assert_eq!(decoded.errors().len(), 2);
    }

    #[test]
    fn test_unknown_code_is_malformed() {
        let xml = r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2002-05-01T19:20:30Z</responseDate>
  <request>http://example.org/oai</request>
  <error code="teapot">short and stout</error>
</OAI-PMH>"#;
        assert!(matches!(
            ErrorResponse::decode(xml),
            Err(OaiError::MalformedDocument(_))
        ));
    }
}
