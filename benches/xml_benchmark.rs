use divan::Bencher;
use oai_pmh::{
    Header, Identify, ListRecords, OaiResponse, Record, RequestParams, SchemaValidator,
    VerbResponse, XmlFragment, validate_request,
};

fn main() {
    divan::main();
}

const BASE_URL: &str = "http://memory.loc.gov/cgi-bin/oai";

fn identify() -> Identify {
    let mut identify = Identify::new(BASE_URL, "Benchmark Repository").unwrap();
    identify.append_admin_email("admin@example.org");
    identify.set_earliest_datestamp("1990-02-01T12:00:00Z");
    identify
}

fn list_records(size: usize) -> ListRecords {
    let mut list = ListRecords::new(BASE_URL);
    for i in 0..size {
        let header = Header::new(format!("oai:example.org:{i}"), "2001-01-01").unwrap();
        let metadata = XmlFragment::new(format!(
            r#"<oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Record {i}</dc:title></oai_dc:dc>"#
        ))
        .unwrap();
        list.append_record(Record::new(header, metadata).unwrap());
    }
    list
}

#[divan::bench]
fn parse_embedded_schema() {
    SchemaValidator::embedded().expect("Failed to parse schema");
}

#[divan::bench]
fn encode_identify(bencher: Bencher) {
    let identify = identify();
    bencher.bench_local(move || identify.encode().unwrap());
}

#[divan::bench(args = [10, 100, 1000])]
fn encode_list_records(bencher: Bencher, size: usize) {
    let list = list_records(size);
    bencher.bench_local(move || list.encode().unwrap());
}

#[divan::bench(args = [10, 100, 1000])]
fn decode_list_records(bencher: Bencher, size: usize) {
    let xml = list_records(size).encode().unwrap();
    bencher.bench_local(move || VerbResponse::decode(&xml).unwrap());
}

#[divan::bench]
fn validate_identify(bencher: Bencher) {
    let validator = SchemaValidator::shared().unwrap();
    let xml = identify().encode().unwrap();

    bencher.bench_local(move || validator.validate_str(&xml).expect("Validation failed"));
}

#[divan::bench]
fn validate_request_grammar(bencher: Bencher) {
    let params: RequestParams = [
        ("verb", "ListRecords"),
        ("metadataPrefix", "oai_dc"),
        ("from", "2001-01-01"),
        ("until", "2002-01-01"),
        ("set", "physics:hep"),
    ]
    .into_iter()
    .collect();

    bencher.bench_local(move || validate_request(&params).unwrap());
}
