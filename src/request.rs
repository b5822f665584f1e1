//! Request grammar and validation
//!
//! Inbound parameters are checked against a static per-verb table before any
//! response entity is built. Rejections are plain [`RequestError`] values that
//! the caller turns into an error response.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::datestamp::Granularity;
use crate::error::RequestError;

/// The six protocol verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    GetRecord,
    Identify,
    ListIdentifiers,
    ListMetadataFormats,
    ListRecords,
    ListSets,
}

/// How a verb treats one of its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamRule {
    Required,
    Optional,
    /// Must be the only argument besides `verb`
    Exclusive,
}

use ParamRule::{Exclusive, Optional, Required};

const GET_RECORD: &[(&str, ParamRule)] = &[("identifier", Required), ("metadataPrefix", Required)];

const IDENTIFY: &[(&str, ParamRule)] = &[];

const LIST_IDENTIFIERS: &[(&str, ParamRule)] = &[
    ("from", Optional),
    ("until", Optional),
    ("set", Optional),
    ("metadataPrefix", Required),
    ("resumptionToken", Exclusive),
];

const LIST_METADATA_FORMATS: &[(&str, ParamRule)] = &[("identifier", Optional)];

const LIST_RECORDS: &[(&str, ParamRule)] = &[
    ("from", Optional),
    ("until", Optional),
    ("set", Optional),
    ("metadataPrefix", Required),
    ("resumptionToken", Exclusive),
];

const LIST_SETS: &[(&str, ParamRule)] = &[("resumptionToken", Exclusive)];

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::GetRecord,
        Verb::Identify,
        Verb::ListIdentifiers,
        Verb::ListMetadataFormats,
        Verb::ListRecords,
        Verb::ListSets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::GetRecord => "GetRecord",
            Verb::Identify => "Identify",
            Verb::ListIdentifiers => "ListIdentifiers",
            Verb::ListMetadataFormats => "ListMetadataFormats",
            Verb::ListRecords => "ListRecords",
            Verb::ListSets => "ListSets",
        }
    }

    /// Parameters this verb accepts besides `verb`
    pub fn grammar(self) -> &'static [(&'static str, ParamRule)] {
        match self {
            Verb::GetRecord => GET_RECORD,
            Verb::Identify => IDENTIFY,
            Verb::ListIdentifiers => LIST_IDENTIFIERS,
            Verb::ListMetadataFormats => LIST_METADATA_FORMATS,
            Verb::ListRecords => LIST_RECORDS,
            Verb::ListSets => LIST_SETS,
        }
    }

    pub fn rule(self, param: &str) -> Option<ParamRule> {
        self.grammar()
            .iter()
            .find(|(name, _)| *name == param)
            .map(|(_, rule)| *rule)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| RequestError::BadVerb("Illegal verb specified".to_string()))
    }
}

/// Flat key/value request parameters, including `verb`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestParams {
    params: BTreeMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds parameters from raw pairs; a key given twice is a bad argument
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self, RequestError>
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.into();
            if params.contains_key(&key) {
                return Err(RequestError::BadArgument("repeated parameter".to_string()));
            }
            params.insert(key, value.into());
        }
        Ok(Self { params })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for RequestParams {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            params: map.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for RequestParams {
    fn from(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Whether `value` is syntactically legal for the request argument `name`.
/// Arguments outside the protocol grammar are never legal.
pub fn is_legal_argument(name: &str, value: &str) -> bool {
    match name {
        "verb" => value.parse::<Verb>().is_ok(),
        "from" | "until" => Granularity::detect(value).is_some(),
        "metadataPrefix" => is_spec_segment(value),
        "set" => value.split(':').all(is_spec_segment),
        "identifier" | "resumptionToken" => true,
        _ => false,
    }
}

/// Unreserved URI characters, as allowed in metadata prefixes and set specs
fn is_spec_segment(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.!~*'()".contains(c))
}

fn bad_argument(message: &str) -> RequestError {
    RequestError::BadArgument(message.to_string())
}

/// Checks `params` against the grammar of the verb they name.
///
/// The checks run in a fixed order and the first failure wins: missing verb,
/// unknown verb, resumptionToken alongside other arguments, undeclared
/// parameters, missing required parameters, then datestamp syntax of
/// `from`/`until`.
pub fn validate_request(params: &RequestParams) -> Result<Verb, RequestError> {
    let verb_name = params
        .get("verb")
        .ok_or_else(|| RequestError::BadVerb("No verb specified".to_string()))?;
    let verb: Verb = verb_name.parse()?;

    if params.contains("resumptionToken") && params.len() > 2 {
        return Err(RequestError::BadResumptionToken(
            "resumptionToken with too many other params".to_string(),
        ));
    }

    let mut exclusive_present = false;
    for (name, _) in params.iter().filter(|(name, _)| *name != "verb") {
        match verb.rule(name) {
            None => return Err(bad_argument("illegal parameter")),
            Some(Exclusive) => exclusive_present = true,
            Some(_) => {}
        }
    }

    if !exclusive_present {
        let missing = verb
            .grammar()
            .iter()
            .any(|(name, rule)| *rule == Required && !params.contains(name));
        if missing {
            return Err(bad_argument("required parameter missing"));
        }
    }

    check_date_range(params)?;

    debug!("Accepted {} request with {} argument(s)", verb, params.len() - 1);
    Ok(verb)
}

fn check_date_range(params: &RequestParams) -> Result<(), RequestError> {
    let granularity = |key: &str| -> Result<Option<Granularity>, RequestError> {
        match params.get(key) {
            None => Ok(None),
            Some(value) => Granularity::detect(value)
                .map(Some)
                .ok_or_else(|| bad_argument("illegal datestamp syntax")),
        }
    };

    let from = granularity("from")?;
    let until = granularity("until")?;
    if let (Some(from), Some(until)) = (from, until) {
        if from != until {
            return Err(bad_argument("from and until granularity mismatch"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RequestParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_legal_argument_values() {
        assert!(is_legal_argument("verb", "ListSets"));
        assert!(!is_legal_argument("verb", "listsets"));
        assert!(is_legal_argument("from", "2002-01-01"));
        assert!(!is_legal_argument("from", "last tuesday"));
        assert!(is_legal_argument("metadataPrefix", "oai_dc"));
        assert!(!is_legal_argument("metadataPrefix", "oai dc"));
        assert!(is_legal_argument("set", "physics:hep"));
        assert!(!is_legal_argument("set", "physics:"));
        assert!(is_legal_argument("resumptionToken", "anything at all"));
        assert!(!is_legal_argument("frobnicate", "1"));
    }

    #[test]
    fn test_identify_is_valid() {
        assert_eq!(
            validate_request(&params(&[("verb", "Identify")])),
            Ok(Verb::Identify)
        );
    }

    #[test]
    fn test_missing_and_unknown_verb() {
        assert_eq!(
            validate_request(&params(&[])),
            Err(RequestError::BadVerb("No verb specified".to_string()))
        );
        assert_eq!(
            validate_request(&params(&[("verb", "Frobnicate")])),
            Err(RequestError::BadVerb("Illegal verb specified".to_string()))
        );
        assert_eq!(
            validate_request(&params(&[("verb", "identify")])),
            Err(RequestError::BadVerb("Illegal verb specified".to_string()))
        );
    }

    #[test]
    fn test_required_parameter_missing() {
        assert_eq!(
            validate_request(&params(&[("verb", "ListRecords")])),
            Err(RequestError::BadArgument(
                "required parameter missing".to_string()
            ))
        );
        assert_eq!(
            validate_request(&params(&[("verb", "GetRecord"), ("identifier", "oai:x:1")])),
            Err(RequestError::BadArgument(
                "required parameter missing".to_string()
            ))
        );
    }

    #[test]
    fn test_resumption_token_with_other_params() {
        assert_eq!(
            validate_request(&params(&[
                ("verb", "ListRecords"),
                ("resumptionToken", "abc"),
                ("metadataPrefix", "oai_dc"),
            ])),
            Err(RequestError::BadResumptionToken(
                "resumptionToken with too many other params".to_string()
            ))
        );
    }

    #[test]
    fn test_resumption_token_alone_skips_required_check() {
        assert_eq!(
            validate_request(&params(&[("verb", "ListRecords"), ("resumptionToken", "abc")])),
            Ok(Verb::ListRecords)
        );
        assert_eq!(
            validate_request(&params(&[("verb", "ListSets"), ("resumptionToken", "abc")])),
            Ok(Verb::ListSets)
        );
    }

    #[test]
    fn test_illegal_parameter() {
        assert_eq!(
            validate_request(&params(&[("verb", "Identify"), ("metadataPrefix", "oai_dc")])),
            Err(RequestError::BadArgument("illegal parameter".to_string()))
        );
        assert_eq!(
            validate_request(&params(&[("verb", "Identify"), ("resumptionToken", "x")])),
            Err(RequestError::BadArgument("illegal parameter".to_string()))
        );
    }

    #[test]
    fn test_illegal_parameter_checked_before_required() {
        assert_eq!(
            validate_request(&params(&[("verb", "GetRecord"), ("bogus", "1")])),
            Err(RequestError::BadArgument("illegal parameter".to_string()))
        );
    }

    #[test]
    fn test_optional_parameters() {
        let request = params(&[
            ("verb", "ListIdentifiers"),
            ("metadataPrefix", "oai_dc"),
            ("from", "2001-01-01"),
            ("until", "2002-01-01"),
            ("set", "physics"),
        ]);
        assert_eq!(validate_request(&request), Ok(Verb::ListIdentifiers));

        assert_eq!(
            validate_request(&params(&[("verb", "ListMetadataFormats")])),
            Ok(Verb::ListMetadataFormats)
        );
    }

    #[test]
    fn test_datestamp_arguments() {
        assert_eq!(
            validate_request(&params(&[
                ("verb", "ListRecords"),
                ("metadataPrefix", "oai_dc"),
                ("from", "last tuesday"),
            ])),
            Err(RequestError::BadArgument("illegal datestamp syntax".to_string()))
        );
        assert_eq!(
            validate_request(&params(&[
                ("verb", "ListRecords"),
                ("metadataPrefix", "oai_dc"),
                ("from", "2001-01-01"),
                ("until", "2002-01-01T00:00:00Z"),
            ])),
            Err(RequestError::BadArgument(
                "from and until granularity mismatch".to_string()
            ))
        );
    }

    #[test]
    fn test_from_pairs_rejects_repeats() {
        let repeated = RequestParams::from_pairs([("verb", "Identify"), ("verb", "Identify")]);
        assert_eq!(
            repeated,
            Err(RequestError::BadArgument("repeated parameter".to_string()))
        );

        let ok = RequestParams::from_pairs([("verb", "Identify")]).unwrap();
        assert_eq!(ok.get("verb"), Some("Identify"));
    }

    #[test]
    fn test_grammar_table() {
        assert_eq!(Verb::Identify.grammar().len(), 0);
        assert_eq!(Verb::GetRecord.rule("identifier"), Some(Required));
        assert_eq!(Verb::ListRecords.rule("resumptionToken"), Some(Exclusive));
        assert_eq!(Verb::ListSets.rule("set"), None);
    }
}
