//! Source archive inspection
//!
//! Pulls `pyproject.toml` out of a downloaded source archive without
//! unpacking it to disk. The manifest is looked up at the archive root or
//! one directory below it (`name-1.0/pyproject.toml`).

use crate::error::ManifestError;
use crate::manifest::MANIFEST_FILE_NAME;
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    TarGz,
    Tar,
    Zip,
}

impl ArchiveFormat {
    fn detect(filename: &str) -> Option<Self> {
        let name = filename.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Whether `filename` has an archive extension we can read
pub fn is_supported(filename: &str) -> bool {
    ArchiveFormat::detect(filename).is_some()
}

/// Read the manifest of `package` `version` from an in-memory archive
pub fn extract_manifest(
    filename: &str,
    data: &[u8],
    package: &str,
    version: &str,
) -> Result<String, ManifestError> {
    let format = ArchiveFormat::detect(filename).ok_or_else(|| ManifestError::UnsupportedArchive {
        filename: filename.to_string(),
    })?;

    let found = match format {
        ArchiveFormat::TarGz => from_tar(GzDecoder::new(data), filename)?,
        ArchiveFormat::Tar => from_tar(data, filename)?,
        ArchiveFormat::Zip => from_zip(data, filename)?,
    };

    found.ok_or_else(|| ManifestError::NotInArchive {
        package: package.to_string(),
        version: version.to_string(),
    })
}

/// Depth of a manifest path, or `None` if the entry is not a candidate
fn manifest_depth(path: &Path) -> Option<usize> {
    if path.file_name()?.to_str()? != MANIFEST_FILE_NAME {
        return None;
    }
    let depth = path.components().count();
    (depth <= 2).then_some(depth)
}

fn from_tar<R: Read>(reader: R, filename: &str) -> Result<Option<String>, ManifestError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| ManifestError::archive_error(filename, e.to_string()))?;

    let mut best: Option<(usize, String)> = None;
    for entry in entries {
        let mut entry = entry.map_err(|e| ManifestError::archive_error(filename, e.to_string()))?;
        let depth = match entry.path().ok().as_deref().and_then(manifest_depth) {
            Some(depth) => depth,
            None => continue,
        };
        if best.as_ref().is_some_and(|(d, _)| *d <= depth) {
            continue;
        }
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| ManifestError::archive_error(filename, e.to_string()))?;
        best = Some((depth, content));
    }

    Ok(best.map(|(_, content)| content))
}

fn from_zip(data: &[u8], filename: &str) -> Result<Option<String>, ManifestError> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| ManifestError::archive_error(filename, e.to_string()))?;

    let mut best: Option<(usize, usize)> = None;
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| ManifestError::archive_error(filename, e.to_string()))?;
        let Some(depth) = entry.enclosed_name().as_deref().and_then(manifest_depth) else {
            continue;
        };
        if best.map_or(true, |(d, _)| depth < d) {
            best = Some((depth, index));
        }
    }

    let Some((_, index)) = best else {
        return Ok(None);
    };
    let mut entry = archive
        .by_index(index)
        .map_err(|e| ManifestError::archive_error(filename, e.to_string()))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| ManifestError::archive_error(filename, e.to_string()))?;
    Ok(Some(content))
}
