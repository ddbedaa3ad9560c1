use std::{
    fs::File,
    io::{self, Cursor, Seek, Write},
    path::{Path, PathBuf, StripPrefixError},
};

use derive_more::{Display, Error, From};
use tokio::task::JoinError;
use tracing::warn;
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Highest Deflate compression level.
const MAX_COMPRESSION_LEVEL: i32 = 9;

/// Errors that may occur during the archive creation process.
#[derive(Debug, Display, From, Error)]
pub(crate) enum ArchiverError {
    /// Provided path does not exist or is not a directory.
    #[display(fmt = "{} is not a directory", "_0.display()")]
    NotADirectory(#[error(not(source))] PathBuf),

    /// [`zip`]-crate specific error.
    Zip(zip::result::ZipError),

    /// [`walkdir`]-crate specific error.
    WalkDir(walkdir::Error),

    /// IO error.
    Io(io::Error),

    /// Unable to strip the content directory prefix from path.
    StripPrefix(StripPrefixError),

    /// Archiving task panicked or was cancelled.
    #[display(fmt = "archiving task failed: {}", _0)]
    Join(JoinError),
}

/// Archive the contents of `dir` into an in-memory ZIP buffer.
///
/// Immediate children of `dir` become the top-level archive entries.
/// The buffer is returned only after the archive is finalized.
pub(crate) async fn package_directory(dir: &Path) -> Result<Vec<u8>, ArchiverError> {
    let is_dir = tokio::fs::metadata(dir)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);

    if !is_dir {
        return Err(ArchiverError::NotADirectory(dir.to_path_buf()));
    }

    let dir = dir.to_path_buf();

    tokio::task::spawn_blocking(move || {
        build_zip_archive(&dir, Cursor::new(Vec::new())).map(Cursor::into_inner)
    })
    .await?
}

/// Archive the directory `dir` into the provided `sink`.
///
/// Entries are visited in file name order, so that the same tree always
/// results in the same archive. Symbolic links are followed.
pub(crate) fn build_zip_archive<W: Write + Seek>(
    dir: &Path,
    sink: W,
) -> Result<W, ArchiverError> {
    let mut writer = ZipWriter::new(sink);

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(MAX_COMPRESSION_LEVEL));

    let mut entries = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next().transpose()? {
        let Some(path) = entry.path().strip_prefix(dir)?.to_str() else {
            warn!(path = %entry.path().display(), "skipping path with non-unicode symbols");
            continue;
        };

        if path.is_empty() {
            continue;
        }

        // ZIP entry names always use forward slashes.
        let name = path.replace(std::path::MAIN_SEPARATOR, "/");

        if entry.file_type().is_dir() {
            writer.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            io::copy(&mut File::open(entry.path())?, &mut writer)?;
        }
    }

    Ok(writer.finish()?)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        fs,
        io::{Cursor, Read},
        path::Path,
    };

    use zip::ZipArchive;

    use super::{package_directory, ArchiverError};

    /// Split archive entries into file contents and directory names.
    fn unpack(archive: Vec<u8>) -> (BTreeMap<String, Vec<u8>>, Vec<String>) {
        let mut archive = ZipArchive::new(Cursor::new(archive)).expect("invalid zip archive");
        let mut files = BTreeMap::new();
        let mut directories = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).expect("unable to read entry");

            if entry.is_dir() {
                directories.push(entry.name().to_string());
            } else {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf).expect("unable to decompress entry");
                files.insert(entry.name().to_string(), buf);
            }
        }

        (files, directories)
    }

    /// Populate `root` with nested files, a hidden file and an empty directory.
    fn create_tree(root: &Path) {
        fs::create_dir_all(root.join("assets/images")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("index.html"), b"<html></html>").unwrap();
        fs::write(root.join("assets/app.js"), b"console.log(1);").unwrap();
        fs::write(root.join("assets/images/logo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();
        fs::write(root.join(".manifest"), b"hidden").unwrap();
    }

    #[tokio::test]
    async fn archive_reproduces_directory() {
        let dir = tempfile::tempdir().unwrap();
        create_tree(dir.path());

        let archive = package_directory(dir.path()).await.unwrap();
        let (files, directories) = unpack(archive);

        assert_eq!(files.len(), 4);
        assert_eq!(files["index.html"], b"<html></html>");
        assert_eq!(files["assets/app.js"], b"console.log(1);");
        assert_eq!(files["assets/images/logo.png"], [0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(files[".manifest"], b"hidden");

        assert!(directories.contains(&String::from("assets/")));
        assert!(directories.contains(&String::from("assets/images/")));
        assert!(directories.contains(&String::from("empty/")));
    }

    #[tokio::test]
    async fn directory_name_is_not_nested() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("app");
        fs::create_dir(&content).unwrap();
        fs::write(content.join("main.js"), b"main").unwrap();

        let (files, directories) = unpack(package_directory(&content).await.unwrap());

        assert_eq!(files.keys().collect::<Vec<_>>(), ["main.js"]);
        assert!(directories.is_empty());
    }

    #[tokio::test]
    async fn empty_directory() {
        let dir = tempfile::tempdir().unwrap();

        let (files, directories) = unpack(package_directory(dir.path()).await.unwrap());

        assert!(files.is_empty());
        assert!(directories.is_empty());
    }

    #[tokio::test]
    async fn same_tree_same_archive() {
        let dir = tempfile::tempdir().unwrap();
        create_tree(dir.path());

        let first = package_directory(dir.path()).await.unwrap();
        let second = package_directory(dir.path()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn regular_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.zip");
        fs::write(&file, b"not a directory").unwrap();

        let error = package_directory(&file).await.unwrap_err();

        assert!(matches!(error, ArchiverError::NotADirectory(path) if path == file));
    }

    #[tokio::test]
    async fn missing_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let error = package_directory(&missing).await.unwrap_err();

        assert_eq!(
            error.to_string(),
            format!("{} is not a directory", missing.display())
        );
    }
}
