use crate::domain::model::Artifact;
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Packs generated firmware sources into one ZIP archive.
pub fn bundle_artifacts(artifacts: &[Artifact]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for artifact in artifacts {
        zip.start_file(artifact.filename.as_str(), SimpleFileOptions::default())?;
        zip.write_all(artifact.contents.as_bytes())?;
    }

    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
