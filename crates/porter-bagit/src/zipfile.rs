//! Zip container serialization for bags.

use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use porter_core::error::AppError;
use porter_core::result::AppResult;

use crate::bag::{to_slash_path, walk_files};

/// Serialize the directory tree at `src_dir` into a zip file at `zip_path`.
///
/// Entry names are relative to `src_dir` with forward slashes.
pub fn zip_dir(src_dir: &Path, zip_path: &Path) -> AppResult<()> {
    if let Some(parent) = zip_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(zip_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for path in walk_files(src_dir)? {
        let relative = path
            .strip_prefix(src_dir)
            .map_err(|_| AppError::internal("Zip entry escaped the source directory"))?;
        writer
            .start_file(to_slash_path(relative), options)
            .map_err(|e| AppError::storage(format!("Zip write error: {e}")))?;
        let mut source = fs::File::open(&path)?;
        io::copy(&mut source, &mut writer)?;
    }

    writer
        .finish()
        .map_err(|e| AppError::storage(format!("Zip finalize error: {e}")))?;
    Ok(())
}

/// Extract the zip at `zip_path` into `target_dir`.
///
/// Rejects entries whose names would escape `target_dir`.
pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> AppResult<()> {
    let file = fs::File::open(zip_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| AppError::structural(format!("Unreadable zip: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| AppError::structural(format!("Unreadable zip entry: {e}")))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(AppError::structural(
                    "Zip entry path traversal detected",
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = fs::File::create(&entry_path)?;
        io::copy(&mut entry, &mut outfile)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::Bag;
    use crate::validate::validate;

    #[test]
    fn test_bag_survives_zip_round_trip() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let source = tmp.path().join("source");
        fs::create_dir_all(source.join("inner")).expect("mkdir");
        fs::write(source.join("a.txt"), b"alpha").expect("write");
        fs::write(source.join("inner/b.txt"), b"bravo").expect("write");

        let bag = Bag::pack(&source, &tmp.path().join("bag")).expect("pack");
        let zip_path = tmp.path().join("bag.zip");
        bag.into_zip(&zip_path).expect("zip");

        let extracted = tmp.path().join("extracted");
        extract_zip(&zip_path, &extracted).expect("extract");

        let reopened = Bag::open(&extracted).expect("open");
        let report = validate(&reopened).expect("validate");
        assert!(report.is_valid(), "issues: {:?}", report.issues);
    }
}
