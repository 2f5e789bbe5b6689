use crate::storage::error::StorageError;
use flate2::read::GzDecoder;
use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use tracing::info;
use zip::ZipArchive;

/// Unpacks a downloaded archive into `dest_dir`, deleting the archive.
///
/// `.zip` archives yield every file entry. A `.gz` holds a single unnamed
/// stream, written as `gz_name` when given and as the archive stem otherwise.
/// Anything else is treated as already extracted and returned untouched.
pub fn extract(
    archive: &Path,
    dest_dir: &Path,
    gz_name: Option<&str>,
) -> Result<Vec<PathBuf>, StorageError> {
    let extension = archive
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let extracted = match extension.as_deref() {
        Some("zip") => extract_zip(archive, dest_dir)?,
        Some("gz") => vec![extract_gzip(archive, dest_dir, gz_name)?],
        _ => return Ok(vec![archive.to_path_buf()]),
    };

    fs::remove_file(archive)?;
    info!(archive = %archive.display(), "Deleted archive");
    Ok(extracted)
}

fn extract_zip(archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut extracted = Vec::with_capacity(zip.len());

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        // Entries that would escape the destination are skipped.
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            continue;
        };

        let target = dest_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        info!(file = %target.display(), "Unzipped");
        extracted.push(target);
    }

    Ok(extracted)
}

fn extract_gzip(
    archive: &Path,
    dest_dir: &Path,
    name: Option<&str>,
) -> Result<PathBuf, StorageError> {
    let target = match name {
        Some(name) => dest_dir.join(name),
        None => dest_dir.join(
            archive
                .file_stem()
                .ok_or_else(|| StorageError::InvalidArchive(archive.display().to_string()))?,
        ),
    };

    let mut decoder = GzDecoder::new(File::open(archive)?);
    let mut out = File::create(&target)?;
    io::copy(&mut decoder, &mut out)?;
    info!(file = %target.display(), "Decompressed");
    Ok(target)
}
