use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::{bail, Context};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Zips the regular files directly inside `dir`, flat, deflate-compressed.
pub fn zip_directory(dir: &Path) -> anyhow::Result<Vec<u8>> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for path in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let mut contents = Vec::new();
        fs::File::open(&path)
            .and_then(|mut file| file.read_to_end(&mut contents))
            .with_context(|| format!("Failed to read {}", path.display()))?;
        writer.start_file(name, options)?;
        writer.write_all(&contents)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Unpacks `bytes` into `destination`, refusing entries that escape it.
pub fn extract_archive(bytes: &[u8], destination: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;
    let mut zip = ZipArchive::new(Cursor::new(bytes)).context("Not a zip archive")?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            bail!("Unsafe archive entry: {}", entry.name());
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = destination.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = fs::File::create(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            std::io::copy(&mut entry, &mut outfile)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zipped_directory_unpacks_to_same_files() {
        let source = tempfile::tempdir().unwrap();
        fs::write(source.path().join("manifest.json"), b"{}").unwrap();
        fs::write(source.path().join("vectors.bin"), [1u8, 2, 3, 4]).unwrap();
        fs::create_dir(source.path().join("nested")).unwrap();

        let bytes = zip_directory(source.path()).unwrap();
        let target = tempfile::tempdir().unwrap();
        extract_archive(&bytes, target.path()).unwrap();

        assert_eq!(fs::read(target.path().join("manifest.json")).unwrap(), b"{}");
        assert_eq!(
            fs::read(target.path().join("vectors.bin")).unwrap(),
            vec![1u8, 2, 3, 4]
        );
        assert!(!target.path().join("nested").exists());
    }

    #[test]
    fn rejects_entries_outside_destination() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("../escape.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"nope").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let target = tempfile::tempdir().unwrap();
        assert!(extract_archive(&bytes, target.path()).is_err());
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let target = tempfile::tempdir().unwrap();
        assert!(extract_archive(b"definitely not zip", target.path()).is_err());
    }
}
