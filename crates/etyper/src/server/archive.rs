//! `etyper_docs.zip`: every document, deflated.

use std::fs;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ServerError;
use crate::document::DocumentStore;

/// Zip every document in `store` into memory.
pub fn build_archive(store: &DocumentStore) -> Result<Vec<u8>, ServerError> {
    let docs = store.list()?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for path in docs {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let bytes = fs::read(&path).map_err(|source| ServerError::Read {
            path: path.clone(),
            source,
        })?;
        zip.start_file(name, options)?;
        zip.write_all(&bytes).map_err(|source| ServerError::Read {
            path: path.clone(),
            source,
        })?;
    }
    Ok(zip.finish()?.into_inner())
}
