//! Reading and writing response documents on disk

use std::path::Path;

use log::debug;

use crate::error::Result;
use crate::verbs::{OaiResponse, VerbResponse};

pub async fn read_document(path: &Path) -> Result<String> {
    let xml = tokio::fs::read_to_string(path).await?;
    debug!("Read {} bytes from {}", xml.len(), path.display());
    Ok(xml)
}

pub async fn write_document(path: &Path, xml: &str) -> Result<()> {
    tokio::fs::write(path, xml).await?;
    debug!("Wrote {} bytes to {}", xml.len(), path.display());
    Ok(())
}

/// Decodes a response of a known type from `path`
pub async fn load<R: OaiResponse>(path: &Path) -> Result<R> {
    R::decode(&read_document(path).await?)
}

/// Decodes whatever response `path` holds
pub async fn load_any(path: &Path) -> Result<VerbResponse> {
    VerbResponse::decode(&read_document(path).await?)
}

/// Encodes `response` and writes it to `path`; nothing is written if encoding fails
pub async fn save<R: OaiResponse>(response: &R, path: &Path) -> Result<()> {
    let xml = response.encode()?;
    write_document(path, &xml).await
}
