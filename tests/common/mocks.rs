use oai_pmh::{
    ErrorCode, HandlerResult, Header, Identify, ListPage, ListQuery, MetadataFormat,
    ProtocolError, Record, Repository, ResumptionToken, Set,
};

use super::test_helpers::{deleted_record, sample_identify, sample_record};

/// In-memory repository serving a fixed set of records in pages of `page_size`
pub struct MockRepository {
    pub records: Vec<Record>,
    pub sets: Vec<Set>,
    pub page_size: usize,
}

impl MockRepository {
    pub fn new() -> Self {
        Self {
            records: vec![
                sample_record("oai:example.org:1", "2001-01-01T00:00:00Z"),
                sample_record("oai:example.org:2", "2001-02-01T00:00:00Z"),
                deleted_record("oai:example.org:3", "2001-03-01T00:00:00Z"),
            ],
            sets: vec![],
            page_size: 10,
        }
    }

    pub fn with_sets(mut self) -> Self {
        self.sets = vec![
            Set::new("physics", "Physics").unwrap(),
            Set::new("physics:hep", "High Energy Physics").unwrap(),
        ];
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn empty() -> Self {
        Self {
            records: vec![],
            sets: vec![],
            page_size: 10,
        }
    }

    fn page(&self, query: ListQuery<'_>) -> HandlerResult<(usize, usize)> {
        let start = match query {
            ListQuery::Fresh {
                metadata_prefix, ..
            } => {
                if metadata_prefix != "oai_dc" {
                    return Err(ProtocolError::new(
                        ErrorCode::CannotDisseminateFormat,
                        "Only oai_dc is supported",
                    )
                    .into());
                }
                0
            }
            ListQuery::Resume { resumption_token } => resumption_token.parse::<usize>().map_err(|_| {
                ProtocolError::new(ErrorCode::BadResumptionToken, "Unknown resumption token")
            })?,
        };
        let end = (start + self.page_size).min(self.records.len());
        Ok((start.min(end), end))
    }

    fn token_after(&self, start: usize, end: usize) -> Option<ResumptionToken> {
        if end < self.records.len() {
            Some(
                ResumptionToken::new(end.to_string())
                    .with_complete_list_size(self.records.len() as u64)
                    .with_cursor(start as u64),
            )
        } else if start > 0 {
            Some(ResumptionToken::last_page())
        } else {
            None
        }
    }
}

impl Repository for MockRepository {
    fn identify(&self) -> HandlerResult<Identify> {
        Ok(sample_identify())
    }

    fn get_record(&self, identifier: &str, metadata_prefix: &str) -> HandlerResult<Record> {
        if metadata_prefix != "oai_dc" {
            return Err(ProtocolError::new(
                ErrorCode::CannotDisseminateFormat,
                "Only oai_dc is supported",
            )
            .into());
        }
        self.records
            .iter()
            .find(|record| record.header().identifier() == identifier)
            .cloned()
            .ok_or_else(|| {
                ProtocolError::new(ErrorCode::IdDoesNotExist, "No matching identifier").into()
            })
    }

    fn list_identifiers(&self, query: ListQuery<'_>) -> HandlerResult<ListPage<Header>> {
        let (start, end) = self.page(query)?;
        let headers = self.records[start..end]
            .iter()
            .map(|record| record.header().clone())
            .collect();
        let mut page = ListPage::complete(headers);
        page.resumption_token = self.token_after(start, end);
        Ok(page)
    }

    fn list_records(&self, query: ListQuery<'_>) -> HandlerResult<ListPage<Record>> {
        let (start, end) = self.page(query)?;
        let mut page = ListPage::complete(self.records[start..end].to_vec());
        page.resumption_token = self.token_after(start, end);
        Ok(page)
    }

    fn list_metadata_formats(
        &self,
        identifier: Option<&str>,
    ) -> HandlerResult<Vec<MetadataFormat>> {
        if let Some(identifier) = identifier {
            if !self
                .records
                .iter()
                .any(|record| record.header().identifier() == identifier)
            {
                return Err(
                    ProtocolError::new(ErrorCode::IdDoesNotExist, "No matching identifier").into(),
                );
            }
        }
        Ok(vec![MetadataFormat::oai_dc()])
    }

    fn list_sets(&self, _resumption_token: Option<&str>) -> HandlerResult<ListPage<Set>> {
        if self.sets.is_empty() {
            return Err(ProtocolError::new(
                ErrorCode::NoSetHierarchy,
                "This repository does not support sets",
            )
            .into());
        }
        Ok(ListPage::complete(self.sets.clone()))
    }
}
