use std::path::PathBuf;

use oai_pmh::{Header, Identify, Record, XmlFragment};

pub const BASE_URL: &str = "http://memory.loc.gov/cgi-bin/oai";

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn identify_xml(&self) -> PathBuf {
        self.fixtures_dir.join("identify.xml")
    }

    pub fn identify_missing_name_xml(&self) -> PathBuf {
        self.fixtures_dir.join("identify_missing_name.xml")
    }

    pub fn list_records_xml(&self) -> PathBuf {
        self.fixtures_dir.join("list_records.xml")
    }

    pub fn bad_verb_xml(&self) -> PathBuf {
        self.fixtures_dir.join("bad_verb.xml")
    }

    pub fn read(&self, path: PathBuf) -> String {
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
    }
}

/// An Identify that satisfies every cardinality and the schema
pub fn sample_identify() -> Identify {
    let mut identify = Identify::new(
        BASE_URL,
        "Library of Congress Open Archive Initiative Repository 1",
    )
    .unwrap();
    identify.append_admin_email("somebody@loc.gov");
    identify.set_earliest_datestamp("1990-02-01T12:00:00Z");
    identify
}

pub fn dublin_core(title: &str) -> XmlFragment {
    XmlFragment::new(format!(
        r#"<oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{}</dc:title></oai_dc:dc>"#,
        title
    ))
    .unwrap()
}

pub fn sample_record(identifier: &str, datestamp: &str) -> Record {
    let header = Header::new(identifier, datestamp).unwrap();
    Record::new(header, dublin_core(identifier)).unwrap()
}

pub fn deleted_record(identifier: &str, datestamp: &str) -> Record {
    let mut header = Header::new(identifier, datestamp).unwrap();
    header.mark_deleted();
    Record::deleted(header)
}
