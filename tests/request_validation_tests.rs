use std::collections::HashMap;

use oai_pmh::{
    ErrorCode, ErrorResponse, OaiResponse, RequestError, RequestParams, Verb, validate_request,
};

fn params(pairs: &[(&str, &str)]) -> RequestParams {
    pairs.iter().copied().collect()
}

#[test]
fn test_request_table() {
    let cases: Vec<(Vec<(&str, &str)>, Result<Verb, ErrorCode>)> = vec![
        (vec![("verb", "Identify")], Ok(Verb::Identify)),
        (vec![("verb", "ListRecords")], Err(ErrorCode::BadArgument)),
        (
            vec![("verb", "ListRecords"), ("metadataPrefix", "oai_dc")],
            Ok(Verb::ListRecords),
        ),
        (
            vec![("verb", "ListRecords"), ("resumptionToken", "abc")],
            Ok(Verb::ListRecords),
        ),
        (
            vec![
                ("verb", "ListRecords"),
                ("resumptionToken", "abc"),
                ("metadataPrefix", "oai_dc"),
            ],
            Err(ErrorCode::BadResumptionToken),
        ),
        (
            vec![
                ("verb", "ListIdentifiers"),
                ("metadataPrefix", "oai_dc"),
                ("from", "2001-01-01"),
                ("until", "2002-01-01"),
                ("set", "physics:hep"),
            ],
            Ok(Verb::ListIdentifiers),
        ),
        (
            vec![("verb", "GetRecord"), ("identifier", "oai:example.org:1")],
            Err(ErrorCode::BadArgument),
        ),
        (
            vec![
                ("verb", "GetRecord"),
                ("identifier", "oai:example.org:1"),
                ("metadataPrefix", "oai_dc"),
            ],
            Ok(Verb::GetRecord),
        ),
        (vec![("verb", "ListMetadataFormats")], Ok(Verb::ListMetadataFormats)),
        (vec![("verb", "ListSets")], Ok(Verb::ListSets)),
        (
            vec![("verb", "Identify"), ("metadataPrefix", "oai_dc")],
            Err(ErrorCode::BadArgument),
        ),
        (vec![], Err(ErrorCode::BadVerb)),
        (vec![("verb", "Frobnicate")], Err(ErrorCode::BadVerb)),
    ];

    for (pairs, expected) in cases {
        let result = validate_request(&params(&pairs)).map_err(|err| err.code());
        assert_eq!(result, expected, "request {:?}", pairs);
    }
}

#[test]
fn test_bad_verb_messages() {
    assert_eq!(
        validate_request(&params(&[])),
        Err(RequestError::BadVerb("No verb specified".to_string()))
    );
    assert_eq!(
        validate_request(&params(&[("verb", "Frobnicate")])),
        Err(RequestError::BadVerb("Illegal verb specified".to_string()))
    );
}

#[test]
fn test_datestamp_arguments() {
    let mismatched = params(&[
        ("verb", "ListRecords"),
        ("metadataPrefix", "oai_dc"),
        ("from", "2001-01-01"),
        ("until", "2002-01-01T00:00:00Z"),
    ]);
    assert_eq!(
        validate_request(&mismatched).map_err(|err| err.code()),
        Err(ErrorCode::BadArgument)
    );

    let garbled = params(&[
        ("verb", "ListRecords"),
        ("metadataPrefix", "oai_dc"),
        ("from", "yesterday"),
    ]);
    assert_eq!(
        validate_request(&garbled).map_err(|err| err.code()),
        Err(ErrorCode::BadArgument)
    );
}

#[test]
fn test_repeated_parameter_rejected() {
    let result = RequestParams::from_pairs([
        ("verb", "ListRecords"),
        ("metadataPrefix", "oai_dc"),
        ("metadataPrefix", "marc21"),
    ]);

    assert_eq!(result.map_err(|err| err.code()), Err(ErrorCode::BadArgument));
}

#[test]
fn test_params_from_hash_map() {
    let mut map = HashMap::new();
    map.insert("verb".to_string(), "ListSets".to_string());
    map.insert("resumptionToken".to_string(), "page-2".to_string());

    let params = RequestParams::from(map);
    assert_eq!(validate_request(&params), Ok(Verb::ListSets));
}

#[test]
fn test_rejection_becomes_error_document() {
    let request = params(&[("verb", "ListRecords")]);
    let err = validate_request(&request).unwrap_err();

    let response = ErrorResponse::from_request_error("http://example.org/oai", &request, &err);
    let xml = response.encode().unwrap();

    assert!(xml.contains("<request>http://example.org/oai</request>"));
    assert!(xml.contains(r#"<error code="badArgument">required parameter missing</error>"#));
    assert!(!xml.contains("<ListRecords"));
}
