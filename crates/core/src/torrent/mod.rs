//! Descriptor extraction path for crawl payloads.
//!
//! When a crawl fetch returns a torrent descriptor instead of an HTML
//! page, the bytes are parsed directly with librqbit-core and folded
//! into the enriched final result, bypassing the detail pattern.

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use thiserror::Error;
use tracing::debug;

use crate::performer::{SearchResult, TorrentFile};

/// Errors parsing a descriptor payload. All of them are per-item crawl
/// failures: the item is skipped, the batch proceeds.
#[derive(Debug, Error)]
pub enum TorrentParseError {
    #[error("failed to parse descriptor: {0}")]
    ParseError(String),

    #[error("empty descriptor (no files)")]
    EmptyTorrent,
}

/// Cheap sniff for a bencoded descriptor: a dictionary opener followed
/// by a key length. Keeps HTML detail pages off the descriptor path.
pub fn looks_like_descriptor(bytes: &[u8]) -> bool {
    bytes.first() == Some(&b'd') && bytes.get(1).is_some_and(|b| b.is_ascii_digit())
}

/// Parse a descriptor payload and build the enriched final result:
/// the preliminary entry plus name, info hash, file listing and total
/// size taken from the descriptor itself.
pub fn descriptor_results(
    base: &SearchResult,
    bytes: &[u8],
) -> Result<Vec<SearchResult>, TorrentParseError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| TorrentParseError::ParseError(e.to_string()))?;

    let info = &torrent.info;
    let root_name = info
        .name
        .as_ref()
        .map(|b| bytes_to_string(b.as_ref()))
        .unwrap_or_else(|| base.display_name.clone());

    let files = descriptor_files(&torrent, &root_name)?;
    let total_size: u64 = files.iter().map(|f| f.size_bytes).sum();
    let info_hash = torrent.info_hash.as_string();

    debug!(
        source = %base.source,
        info_hash = %info_hash,
        files = files.len(),
        "Descriptor parsed"
    );

    let mut result = base.clone();
    result.display_name = root_name;
    result.size_bytes = Some(total_size);
    result.info_hash = Some(info_hash);
    result.files = Some(files);
    result.crawl_target = None;
    Ok(vec![result])
}

fn descriptor_files(
    torrent: &TorrentMetaV1Owned,
    root_name: &str,
) -> Result<Vec<TorrentFile>, TorrentParseError> {
    let info = &torrent.info;

    if let Some(ref files) = info.files {
        // Multi-file descriptor: paths live under the root name.
        let mut result = Vec::with_capacity(files.len());
        for file in files {
            let mut path_parts = vec![root_name.to_string()];
            for part in &file.path {
                path_parts.push(bytes_to_string(part.as_ref()));
            }
            result.push(TorrentFile {
                path: path_parts.join("/"),
                size_bytes: file.length,
            });
        }
        if result.is_empty() {
            return Err(TorrentParseError::EmptyTorrent);
        }
        Ok(result)
    } else if let Some(length) = info.length {
        Ok(vec![TorrentFile {
            path: root_name.to_string(),
            size_bytes: length,
        }])
    } else {
        Err(TorrentParseError::EmptyTorrent)
    }
}

fn bytes_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
