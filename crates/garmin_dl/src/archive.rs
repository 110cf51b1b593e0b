//! Unwrapping of ZIP containers the service puts around exported files.

use garmin_connect_client::DownloadFormat;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};

use crate::naming::default_extension;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_SIZE_HINT: u64 = 64 << 20;

/// Bytes ready to be written together with the extension they should get.
#[derive(Debug, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub extension: String,
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Turn fetched bytes into what should land on disk for `format`.
///
/// - `Original`: a ZIP holding exactly one file is replaced by that file,
///   keeping its extension (`zip` if it has none); anything else is kept as
///   the raw archive.
/// - `Fit`: the first `.fit` entry of a ZIP; raw bytes otherwise.
/// - `Gpx`/`Tcx`: untouched.
pub fn prepare(format: DownloadFormat, raw: Vec<u8>) -> Payload {
    match format {
        DownloadFormat::Original => match single_entry(&raw) {
            Some((bytes, extension)) => Payload { bytes, extension },
            None => Payload {
                bytes: raw,
                extension: default_extension(format).to_string(),
            },
        },
        DownloadFormat::Fit => {
            let bytes = if is_zip(&raw) {
                match first_entry_with_extension(&raw, "fit") {
                    Some(bytes) => bytes,
                    None => {
                        warn!("no FIT file found in archive, saving as-is");
                        raw
                    }
                }
            } else {
                raw
            };
            Payload {
                bytes,
                extension: default_extension(format).to_string(),
            }
        }
        DownloadFormat::Gpx | DownloadFormat::Tcx => Payload {
            bytes: raw,
            extension: default_extension(format).to_string(),
        },
    }
}

fn entry_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Contents and lower-cased extension of the only file in a ZIP, if it holds
/// exactly one file.
pub fn single_entry(bytes: &[u8]) -> Option<(Vec<u8>, String)> {
    if !is_zip(bytes) {
        return None;
    }
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .inspect_err(|e| debug!(error = %e, "not a readable ZIP archive"))
        .ok()?;

    let mut files = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).ok()?;
        if !entry.is_dir() {
            files.push((i, entry.name().to_string()));
        }
    }
    let [(index, name)] = files.as_slice() else {
        debug!(entries = files.len(), "archive does not hold exactly one file");
        return None;
    };
    let extension = entry_extension(name)
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| default_extension(DownloadFormat::Original).to_string());

    let entry = archive.by_index(*index).ok()?;
    let declared = entry.size();
    let out = read_entry(entry, declared)?;
    Some((out, extension))
}

/// Contents of the first entry whose name ends in `.{extension}`.
pub fn first_entry_with_extension(bytes: &[u8], extension: &str) -> Option<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;
    for i in 0..archive.len() {
        let entry = archive.by_index(i).ok()?;
        if entry.is_dir() || entry_extension(entry.name()).as_deref() != Some(extension) {
            continue;
        }
        let declared = entry.size();
        return read_entry(entry, declared);
    }
    None
}

/// Read a whole entry. The declared size comes from the archive header and is
/// only trusted up to [`MAX_SIZE_HINT`].
fn read_entry(mut entry: impl Read, declared: u64) -> Option<Vec<u8>> {
    let hint = declared.min(MAX_SIZE_HINT) as usize;
    let mut out = Vec::with_capacity(hint);
    entry
        .read_to_end(&mut out)
        .inspect_err(|e| debug!(error = %e, "could not read archive entry"))
        .ok()?;
    Some(out)
}
