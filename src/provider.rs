//! Request dispatch
//!
//! A [`Provider`] turns raw request parameters into a response document:
//! it validates the request, calls the matching [`Repository`] handler,
//! converts protocol errors raised by the backend into error responses and
//! optionally checks the result against the schema before returning it.

use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use crate::envelope::RequestEcho;
use crate::error::{ErrorCode, OaiError, Result};
use crate::request::{RequestParams, Verb, validate_request};
use crate::schema::SchemaValidator;
use crate::verbs::{
    ErrorResponse, GetRecord, Header, Identify, ListIdentifiers, ListMetadataFormats, ListRecords,
    ListSets, MetadataFormat, OaiResponse, ProtocolError, Record, ResumptionToken, Set,
    VerbResponse,
};

/// Why a repository handler could not produce a response
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Reported to the harvester as an `error` element
    #[error("{0}")]
    Protocol(ProtocolError),

    /// Fails the request
    #[error(transparent)]
    Internal(#[from] OaiError),
}

impl From<ProtocolError> for HandlerError {
    fn from(err: ProtocolError) -> Self {
        HandlerError::Protocol(err)
    }
}

pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Arguments of a list request: either a fresh selective harvest or the
/// continuation of an earlier one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListQuery<'a> {
    Fresh {
        metadata_prefix: &'a str,
        from: Option<&'a str>,
        until: Option<&'a str>,
        set: Option<&'a str>,
    },
    Resume {
        resumption_token: &'a str,
    },
}

impl<'a> ListQuery<'a> {
    fn from_params(params: &'a RequestParams) -> HandlerResult<Self> {
        if let Some(resumption_token) = params.get("resumptionToken") {
            return Ok(ListQuery::Resume { resumption_token });
        }
        Ok(ListQuery::Fresh {
            metadata_prefix: required(params, "metadataPrefix")?,
            from: params.get("from"),
            until: params.get("until"),
            set: params.get("set"),
        })
    }
}

/// One page of a list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub resumption_token: Option<ResumptionToken>,
}

impl<T> ListPage<T> {
    /// A complete list with no further pages
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            resumption_token: None,
        }
    }

    pub fn with_resumption_token(mut self, token: ResumptionToken) -> Self {
        self.resumption_token = Some(token);
        self
    }
}

/// Storage backend answering the six verbs. Handlers supply content only;
/// the provider takes care of envelopes and encoding.
pub trait Repository {
    fn identify(&self) -> HandlerResult<Identify>;

    fn get_record(&self, identifier: &str, metadata_prefix: &str) -> HandlerResult<Record>;

    fn list_identifiers(&self, query: ListQuery<'_>) -> HandlerResult<ListPage<Header>>;

    fn list_records(&self, query: ListQuery<'_>) -> HandlerResult<ListPage<Record>>;

    fn list_metadata_formats(
        &self,
        identifier: Option<&str>,
    ) -> HandlerResult<Vec<MetadataFormat>>;

    /// Repositories without sets keep the default
    fn list_sets(&self, _resumption_token: Option<&str>) -> HandlerResult<ListPage<Set>> {
        Err(ProtocolError::new(
            ErrorCode::NoSetHierarchy,
            "This repository does not support sets",
        )
        .into())
    }
}

fn required<'a>(params: &'a RequestParams, key: &str) -> HandlerResult<&'a str> {
    params.get(key).ok_or_else(|| {
        ProtocolError::new(ErrorCode::BadArgument, "required parameter missing").into()
    })
}

fn empty_list(code: ErrorCode, message: &str) -> HandlerError {
    ProtocolError::new(code, message).into()
}

pub struct Provider<R> {
    repository: R,
    base_url: String,
    schema: Option<Arc<SchemaValidator>>,
}

impl<R: Repository> Provider<R> {
    pub fn new(base_url: impl Into<String>, repository: R) -> Self {
        Self {
            repository,
            base_url: base_url.into(),
            schema: None,
        }
    }

    /// Checks every outgoing document against `schema`
    pub fn with_schema_validation(mut self, schema: Arc<SchemaValidator>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Answers a request given as raw pairs, rejecting repeated keys
    pub fn handle_pairs<K, V, I>(&self, pairs: I) -> Result<String>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        match RequestParams::from_pairs(pairs) {
            Ok(params) => self.handle(&params),
            Err(err) => {
                warn!("Rejected request: {}", err);
                let response = ErrorResponse::from_request_error(
                    self.base_url.as_str(),
                    &RequestParams::new(),
                    &err,
                );
                self.finish(response.into())
            }
        }
    }

    /// Answers a request with a response document, which may be an error
    /// response. `Err` is reserved for failures of the provider itself.
    pub fn handle(&self, params: &RequestParams) -> Result<String> {
        let verb = match validate_request(params) {
            Ok(verb) => verb,
            Err(err) => {
                warn!("Rejected request: {}", err);
                let response =
                    ErrorResponse::from_request_error(self.base_url.as_str(), params, &err);
                return self.finish(response.into());
            }
        };

        let echo = RequestEcho::accepted(self.base_url.as_str(), params);
        let response = match self.dispatch(verb, params, echo.clone()) {
            Ok(response) => response,
            Err(HandlerError::Protocol(err)) => {
                debug!("{} answered with {}", verb, err.code());
                ErrorResponse::new(echo, err).into()
            }
            Err(HandlerError::Internal(err)) => return Err(err),
        };
        self.finish(response)
    }

    fn dispatch(
        &self,
        verb: Verb,
        params: &RequestParams,
        echo: RequestEcho,
    ) -> HandlerResult<VerbResponse> {
        let response: VerbResponse = match verb {
            Verb::Identify => {
                let mut response = self.repository.identify()?;
                response.set_request(echo);
                response.into()
            }
            Verb::GetRecord => {
                let record = self.repository.get_record(
                    required(params, "identifier")?,
                    required(params, "metadataPrefix")?,
                )?;
                let mut response = GetRecord::new(self.base_url.as_str(), record);
                response.set_request(echo);
                response.into()
            }
            Verb::ListIdentifiers => {
                let page = self
                    .repository
                    .list_identifiers(ListQuery::from_params(params)?)?;
                if page.items.is_empty() {
                    return Err(empty_list(
                        ErrorCode::NoRecordsMatch,
                        "No records match the request",
                    ));
                }
                let mut response = ListIdentifiers::new(self.base_url.as_str());
                page.items
                    .into_iter()
                    .for_each(|header| response.append_header(header));
                if let Some(token) = page.resumption_token {
                    response.set_resumption_token(token);
                }
                response.set_request(echo);
                response.into()
            }
            Verb::ListRecords => {
                let page = self
                    .repository
                    .list_records(ListQuery::from_params(params)?)?;
                if page.items.is_empty() {
                    return Err(empty_list(
                        ErrorCode::NoRecordsMatch,
                        "No records match the request",
                    ));
                }
                let mut response = ListRecords::new(self.base_url.as_str());
                page.items
                    .into_iter()
                    .for_each(|record| response.append_record(record));
                if let Some(token) = page.resumption_token {
                    response.set_resumption_token(token);
                }
                response.set_request(echo);
                response.into()
            }
            Verb::ListMetadataFormats => {
                let formats = self
                    .repository
                    .list_metadata_formats(params.get("identifier"))?;
                if formats.is_empty() {
                    return Err(empty_list(
                        ErrorCode::NoMetadataFormats,
                        "No metadata formats are available",
                    ));
                }
                let mut response = ListMetadataFormats::new(self.base_url.as_str());
                formats
                    .into_iter()
                    .for_each(|format| response.append_format(format));
                response.set_request(echo);
                response.into()
            }
            Verb::ListSets => {
                let page = self.repository.list_sets(params.get("resumptionToken"))?;
                if page.items.is_empty() {
                    return Err(empty_list(
                        ErrorCode::NoSetHierarchy,
                        "This repository does not support sets",
                    ));
                }
                let mut response = ListSets::new(self.base_url.as_str());
                page.items
                    .into_iter()
                    .for_each(|set| response.append_set(set));
                if let Some(token) = page.resumption_token {
                    response.set_resumption_token(token);
                }
                response.set_request(echo);
                response.into()
            }
        };

        debug!("Answered {} request", verb);
        Ok(response)
    }

    fn finish(&self, response: VerbResponse) -> Result<String> {
        let xml = response.encode()?;
        if let Some(schema) = &self.schema {
            schema.validate_str(&xml)?;
        }
        Ok(xml)
    }
}
