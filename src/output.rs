//! Output and Reporting
//!
//! Formats command outcomes for the terminal, either as human-readable text
//! or as JSON.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::path::Path;

use chrono::SecondsFormat;
use serde_json::json;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::envelope::Envelope;
use crate::error::RequestError;
use crate::libxml2::ValidationResult;
use crate::request::{RequestParams, Verb};
use crate::verbs::{ResumptionToken, VerbResponse};

pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: format == OutputFormat::Human && std::io::stdout().is_terminal(),
        }
    }

    /// Disables ANSI colors regardless of the terminal
    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// A request that passed the verb grammar
    pub fn format_accepted(&self, verb: Verb, params: &RequestParams) -> String {
        match self.format {
            OutputFormat::Json => {
                let arguments: serde_json::Map<String, serde_json::Value> = params
                    .iter()
                    .map(|(k, v)| (k.to_string(), json!(v)))
                    .collect();
                json!({ "status": "accepted", "verb": verb, "arguments": arguments }).to_string()
            }
            OutputFormat::Human => {
                if self.verbosity == VerbosityLevel::Quiet {
                    return verb.to_string();
                }
                let mut output = format!("{}  {}", self.colorize("✓ ACCEPTED", "32"), verb);
                if self.verbosity >= VerbosityLevel::Verbose {
                    for (key, value) in params.iter() {
                        let _ = write!(output, "\n    {}={}", key, value);
                    }
                }
                output
            }
        }
    }

    /// A rejected request together with the error response it produces
    pub fn format_rejected(&self, err: &RequestError, document: &str) -> String {
        match self.format {
            OutputFormat::Json => json!({
                "status": "rejected",
                "code": err.code().as_str(),
                "message": err.message(),
                "document": document,
            })
            .to_string(),
            OutputFormat::Human => document.to_string(),
        }
    }

    pub fn format_validation(&self, path: &Path, result: &ValidationResult) -> String {
        let path_display = path.display();

        if self.format == OutputFormat::Json {
            let value = match result {
                ValidationResult::Valid => json!({ "path": path_display.to_string(), "status": "valid" }),
                ValidationResult::Invalid { code, errors } => json!({
                    "path": path_display.to_string(),
                    "status": "invalid",
                    "code": code,
                    "error_count": errors.len(),
                    "errors": errors,
                }),
                ValidationResult::InternalError { code } => json!({
                    "path": path_display.to_string(),
                    "status": "error",
                    "code": code,
                }),
            };
            return value.to_string();
        }

        match result {
            ValidationResult::Valid => {
                format!("{}  {}", self.colorize("✓ VALID", "32"), path_display)
            }
            ValidationResult::Invalid { errors, .. } => {
                let mut output = format!(
                    "{}  {} - {} error{}",
                    self.colorize("✗ INVALID", "31"),
                    path_display,
                    errors.len(),
                    if errors.len() == 1 { "" } else { "s" }
                );

                if self.verbosity >= VerbosityLevel::Normal {
                    for error_detail in errors {
                        let _ = write!(output, "\n    {}", error_detail);
                    }
                }
                output
            }
            ValidationResult::InternalError { code } => {
                format!(
                    "{}  {} - libxml2 internal error {}",
                    self.colorize("⚠ ERROR", "33"),
                    path_display,
                    code
                )
            }
        }
    }

    pub fn format_decoded(&self, response: &VerbResponse) -> serde_json::Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(response);
        }

        let mut output = String::new();
        let label = response.verb().map(Verb::as_str).unwrap_or("Error");
        let _ = writeln!(output, "{} response", self.colorize(label, "1"));
        self.format_envelope(&mut output, response.envelope());

        match response {
            VerbResponse::Identify(identify) => {
                let _ = writeln!(output, "  Repository: {}", identify.repository_name());
                let _ = writeln!(output, "  Base URL: {}", identify.base_url());
                let _ = writeln!(output, "  Protocol version: {}", identify.protocol_version());
                for email in identify.admin_emails() {
                    let _ = writeln!(output, "  Admin email: {}", email);
                }
                let _ = writeln!(
                    output,
                    "  Earliest datestamp: {}",
                    identify.earliest_datestamp().unwrap_or("unknown")
                );
                let _ = writeln!(output, "  Deleted records: {}", identify.deleted_record());
                let _ = writeln!(output, "  Granularity: {}", identify.granularity());
                if !identify.compression().is_empty() {
                    let _ = writeln!(output, "  Compression: {}", identify.compression().join(", "));
                }
                if !identify.descriptions().is_empty() {
                    let _ = writeln!(output, "  Descriptions: {}", identify.descriptions().len());
                }
            }
            VerbResponse::GetRecord(get_record) => {
                let header = get_record.record().header();
                let _ = writeln!(output, "  Record: {} ({})", header.identifier(), header.datestamp());
                if header.is_deleted() {
                    let _ = writeln!(output, "  Status: deleted");
                }
            }
            VerbResponse::ListIdentifiers(list) => {
                let _ = writeln!(output, "  Headers: {}", list.headers().len());
                if self.verbosity >= VerbosityLevel::Verbose {
                    for header in list.headers() {
                        let _ = writeln!(output, "    {} ({})", header.identifier(), header.datestamp());
                    }
                }
                self.format_resumption_token(&mut output, list.resumption_token());
            }
            VerbResponse::ListRecords(list) => {
                let _ = writeln!(output, "  Records: {}", list.records().len());
                if self.verbosity >= VerbosityLevel::Verbose {
                    for record in list.records() {
                        let header = record.header();
                        let _ = writeln!(output, "    {} ({})", header.identifier(), header.datestamp());
                    }
                }
                self.format_resumption_token(&mut output, list.resumption_token());
            }
            VerbResponse::ListMetadataFormats(list) => {
                for format in list.formats() {
                    let _ = writeln!(
                        output,
                        "  Metadata format: {} ({})",
                        format.metadata_prefix(),
                        format.metadata_namespace()
                    );
                }
            }
            VerbResponse::ListSets(list) => {
                for set in list.sets() {
                    let _ = writeln!(output, "  Set: {} ({})", set.set_spec(), set.set_name());
                }
                self.format_resumption_token(&mut output, list.resumption_token());
            }
            VerbResponse::Error(errors) => {
                for error in errors.errors() {
                    let _ = writeln!(output, "  {}", self.colorize(&error.to_string(), "31"));
                }
            }
        }

        Ok(output)
    }

    fn format_envelope(&self, output: &mut String, envelope: &Envelope) {
        let _ = writeln!(
            output,
            "  Response date: {}",
            envelope
                .response_date()
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let request = envelope.request();
        let _ = write!(output, "  Request: {}", request.base_url());
        for (key, value) in request.arguments() {
            let _ = write!(output, " {}={}", key, value);
        }
        output.push('\n');
    }

    fn format_resumption_token(&self, output: &mut String, token: Option<&ResumptionToken>) {
        let Some(token) = token else {
            return;
        };
        if token.is_last_page() {
            let _ = writeln!(output, "  Last page");
        } else {
            let _ = writeln!(output, "  Resumption token: {}", token.token());
        }
        if let Some(size) = token.complete_list_size() {
            let _ = writeln!(output, "  Complete list size: {}", size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verbs::{ErrorResponse, Identify, OaiResponse};

    fn human(verbosity: VerbosityLevel) -> Output {
        Output::new(verbosity, OutputFormat::Human).without_colors()
    }

    #[test]
    fn test_accepted_request() {
        let params = RequestParams::new()
            .with("verb", "ListRecords")
            .with("metadataPrefix", "oai_dc");

        let quiet = human(VerbosityLevel::Quiet).format_accepted(Verb::ListRecords, &params);
        assert_eq!(quiet, "ListRecords");

        let verbose = human(VerbosityLevel::Verbose).format_accepted(Verb::ListRecords, &params);
        assert!(verbose.contains("✓ ACCEPTED  ListRecords"));
        assert!(verbose.contains("metadataPrefix=oai_dc"));

        let json = Output::new(VerbosityLevel::Normal, OutputFormat::Json)
            .format_accepted(Verb::ListRecords, &params);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["verb"], "ListRecords");
        assert_eq!(value["arguments"]["metadataPrefix"], "oai_dc");
    }

    #[test]
    fn test_rejected_request_json() {
        let err = RequestError::BadVerb("No verb specified".to_string());
        let json = Output::new(VerbosityLevel::Normal, OutputFormat::Json)
            .format_rejected(&err, "<OAI-PMH/>");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["code"], "badVerb");
        assert_eq!(value["message"], "No verb specified");
        assert_eq!(value["document"], "<OAI-PMH/>");
    }

    #[test]
    fn test_validation_outcomes() {
        let output = human(VerbosityLevel::Normal);
        let path = Path::new("identify.xml");

        assert_eq!(
            output.format_validation(path, &ValidationResult::Valid),
            "✓ VALID  identify.xml"
        );

        let invalid = ValidationResult::Invalid {
            code: 1871,
            errors: vec!["line 3: missing repositoryName".to_string()],
        };
        let formatted = output.format_validation(path, &invalid);
        assert!(formatted.starts_with("✗ INVALID  identify.xml - 1 error"));
        assert!(formatted.contains("line 3: missing repositoryName"));
    }

    #[test]
    fn test_decoded_identify() {
        let mut identify = Identify::new("http://example.org/oai", "Example").unwrap();
        identify.append_admin_email("admin@example.org");
        identify.set_earliest_datestamp("2001-01-01T00:00:00Z");
        let response = VerbResponse::from(identify);

        let formatted = human(VerbosityLevel::Normal).format_decoded(&response).unwrap();
        assert!(formatted.starts_with("Identify response"));
        assert!(formatted.contains("Repository: Example"));
        assert!(formatted.contains("Request: http://example.org/oai verb=Identify"));
        assert!(formatted.contains("Admin email: admin@example.org"));

        let json = Output::new(VerbosityLevel::Normal, OutputFormat::Json)
            .format_decoded(&response)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["verb"], "Identify");
    }

    #[test]
    fn test_decoded_error_response() {
        let err = RequestError::BadArgument("required parameter missing".to_string());
        let response =
            ErrorResponse::from_request_error("http://example.org/oai", &RequestParams::new(), &err);
        let decoded = VerbResponse::decode(&response.encode().unwrap()).unwrap();

        let formatted = human(VerbosityLevel::Normal).format_decoded(&decoded).unwrap();
        assert!(formatted.starts_with("Error response"));
        assert!(formatted.contains("badArgument: required parameter missing"));
    }
}
