//! Zip export of a repository subtree.
//!
//! The whole archive is assembled in memory, which suits authoring-sized folders and
//! nothing much larger.

use crate::client::{Depth, WebDavClient};
use crate::{paths, GatewayResult};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds a deflate-compressed zip of every file below `root`.
///
/// Files are fetched one after another over a single session. A file that cannot be
/// fetched is left out of the archive rather than failing the export. Entry names are
/// relative to `root`.
///
/// # Errors
/// Fails if the recursive listing fails or the archive cannot be written.
pub async fn export_zip(client: &WebDavClient, root: &str) -> GatewayResult<Vec<u8>> {
    let session = client.session()?;
    let files: Vec<String> = session
        .list(root, Depth::Infinity)
        .await?
        .into_iter()
        .filter(|entry| !entry.is_dir)
        .map(|entry| entry.path)
        .collect();

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut archived = 0usize;

    for path in &files {
        let content = match session.fetch(path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("skipping {} in export of {:?}: {}", path, root, e);
                continue;
            }
        };

        writer.start_file(paths::relative_to(root, path), options)?;
        writer.write_all(&content.bytes)?;
        archived += 1;
    }

    let archive = writer.finish()?.into_inner();
    tracing::info!(
        "exported {:?}: {} of {} files, {} bytes",
        root,
        archived,
        files.len(),
        archive.len()
    );
    Ok(archive)
}

/// Attachment name for an export of `root`: its last segment or `export`, plus `.zip`.
pub fn archive_name(root: &str) -> String {
    format!("{}.zip", paths::file_name(root).unwrap_or("export"))
}
