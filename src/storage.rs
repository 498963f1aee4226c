//! Root-confined filesystem access: path resolution, listing, deletion.

use chrono::{DateTime, Local};
use std::cmp::Ordering;
use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::ErrorKind;

/// Handle to the single directory tree the server is allowed to touch.
///
/// Every filesystem operation goes through [`Storage::resolve`] first, so no
/// client-supplied path can name anything outside the root.
#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Creates the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Resolves a client-supplied relative path to an absolute path that is
    /// guaranteed to be the root or a descendant of it.
    ///
    /// Resolution is purely lexical: leading separators are stripped so an
    /// absolute-looking input is treated as root-relative, `.` segments are
    /// dropped, and `..` pops the previous segment. A `..` with nothing left
    /// to pop would climb above the root and fails with
    /// [`StorageError::PathEscape`]. The result is built by pushing the
    /// surviving segments onto the root, so containment holds component-wise
    /// and a sibling directory sharing a string prefix with the root can
    /// never be misclassified. The filesystem is never consulted.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let trimmed = relative.trim().trim_start_matches(['/', '\\']);
        let mut segments: Vec<&OsStr> = Vec::new();

        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(segment) => segments.push(segment),
                Component::CurDir => continue,
                Component::ParentDir => {
                    if segments.pop().is_none() {
                        return Err(StorageError::PathEscape);
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::PathEscape);
                }
            }
        }

        let mut resolved = self.root.clone();
        for segment in segments {
            resolved.push(segment);
        }
        Ok(resolved)
    }

    /// Lists the direct children of a directory under the root.
    ///
    /// Directories sort before files; within each group names compare
    /// case-insensitively. Sizes and modification times are read per entry at
    /// call time, nothing is cached. Directory sizes are reported as 0.
    pub async fn list_dir(&self, relative: &str) -> Result<Vec<FileEntry>, StorageError> {
        let target = self.resolve(relative)?;
        let mut dir = fs::read_dir(&target).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().to_string();
            let relative_path = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| StorageError::PathEscape)?
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            let is_dir = metadata.is_dir();
            let modified = metadata.modified().ok().map(DateTime::<Local>::from);

            entries.push(FileEntry {
                name,
                path: relative_path,
                is_dir,
                size: if is_dir { 0 } else { metadata.len() },
                modified,
            });
        }

        entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });

        Ok(entries)
    }

    /// Deletes a file or an empty directory and reports the outcome as a
    /// human-readable status message.
    ///
    /// Directories are removed with a non-recursive `remove_dir`, so a
    /// non-empty directory survives and yields a failure message instead.
    /// Only a path escaping the root is an `Err`; every other outcome,
    /// including "not found", is a normal message for the caller to relay.
    pub async fn delete(&self, relative: &str) -> Result<String, StorageError> {
        let target = self.resolve(relative)?;
        let name = relative.trim().trim_start_matches(['/', '\\']);

        let metadata = match fs::metadata(&target).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(format!("{name} not found"));
            }
            Err(err) => return Err(StorageError::Io(err)),
        };

        let removed = if metadata.is_dir() {
            fs::remove_dir(&target).await
        } else {
            fs::remove_file(&target).await
        };

        Ok(match removed {
            Ok(()) if metadata.is_dir() => format!("{name} folder deleted"),
            Ok(()) => format!("{name} deleted successfully"),
            Err(_) => format!("Cannot delete '{name}': folder not empty or in use"),
        })
    }
}

#[derive(Debug)]
pub enum StorageError {
    PathEscape,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

/// One listed filesystem object with its display-relevant metadata.
#[derive(Debug)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

#[cfg(test)]
mod tests {
    use super::{Storage, StorageError};
    use tempfile::tempdir;
    use tokio::io::ErrorKind;

    fn make_storage() -> (tempfile::TempDir, Storage) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("root");
        std::fs::create_dir_all(&root).expect("create root");
        (temp, Storage::new(root))
    }

    #[test]
    fn resolve_rejects_traversal() {
        let (_temp, storage) = make_storage();
        for input in ["..", "../secret", "../../etc/passwd", "a/../../b", "a/b/../../../c"] {
            assert!(
                matches!(storage.resolve(input), Err(StorageError::PathEscape)),
                "expected escape for {input:?}"
            );
        }
    }

    #[test]
    fn resolve_treats_absolute_input_as_root_relative() {
        let (_temp, storage) = make_storage();
        let resolved = storage.resolve("/etc/passwd").expect("resolve");
        assert_eq!(resolved, storage.root_path().join("etc").join("passwd"));
    }

    #[test]
    fn resolve_collapses_dot_segments() {
        let (_temp, storage) = make_storage();
        let resolved = storage.resolve("a/./b/../c").expect("resolve");
        assert_eq!(resolved, storage.root_path().join("a").join("c"));
    }

    #[test]
    fn resolve_never_leaves_root() {
        let (_temp, storage) = make_storage();
        let inputs = [
            "",
            "  notes.txt  ",
            "deep/nested/dir",
            "//double/slash",
            "\\windows\\style",
            "dir/..",
            "dir/../other",
            "./",
        ];
        for input in inputs {
            if let Ok(resolved) = storage.resolve(input) {
                assert!(
                    resolved.starts_with(storage.root_path()),
                    "{input:?} resolved outside root: {resolved:?}"
                );
            }
        }
    }

    #[test]
    fn resolve_is_idempotent() {
        let (_temp, storage) = make_storage();
        let first = storage.resolve("docs/a/../b.txt").expect("resolve");
        let second = storage.resolve("docs/a/../b.txt").expect("resolve");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn list_dir_orders_directories_first_then_names() {
        let (_temp, storage) = make_storage();
        std::fs::write(storage.root_path().join("b.txt"), b"bb").expect("write");
        std::fs::create_dir(storage.root_path().join("A")).expect("mkdir");
        std::fs::write(storage.root_path().join("a.txt"), b"a").expect("write");

        let entries = storage.list_dir("").await.expect("list");
        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["A", "a.txt", "b.txt"]);
        assert!(entries[0].is_dir);
        assert_eq!(entries[0].size, 0);
        assert_eq!(entries[1].size, 1);
    }

    #[tokio::test]
    async fn list_dir_missing_folder_is_not_found() {
        let (_temp, storage) = make_storage();
        let result = storage.list_dir("missing").await;
        match result {
            Err(StorageError::Io(err)) => assert_eq!(err.kind(), ErrorKind::NotFound),
            other => panic!("expected not-found io error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_empty_directory_succeeds() {
        let (_temp, storage) = make_storage();
        std::fs::create_dir(storage.root_path().join("drafts")).expect("mkdir");

        let message = storage.delete("drafts").await.expect("delete");
        assert_eq!(message, "drafts folder deleted");
        assert!(!storage.root_path().join("drafts").exists());
    }

    #[tokio::test]
    async fn delete_non_empty_directory_is_refused() {
        let (_temp, storage) = make_storage();
        let dir = storage.root_path().join("keep");
        std::fs::create_dir(&dir).expect("mkdir");
        std::fs::write(dir.join("inner.txt"), b"data").expect("write");

        let message = storage.delete("keep").await.expect("delete");
        assert_eq!(message, "Cannot delete 'keep': folder not empty or in use");
        assert!(dir.join("inner.txt").exists());
    }

    #[tokio::test]
    async fn delete_file_succeeds() {
        let (_temp, storage) = make_storage();
        std::fs::write(storage.root_path().join("notes.txt"), b"0123456789").expect("write");

        let message = storage.delete("notes.txt").await.expect("delete");
        assert_eq!(message, "notes.txt deleted successfully");
        assert!(!storage.root_path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn delete_missing_target_reports_not_found() {
        let (_temp, storage) = make_storage();
        let message = storage.delete("ghost.txt").await.expect("delete");
        assert_eq!(message, "ghost.txt not found");
    }

    #[tokio::test]
    async fn delete_escaping_path_is_rejected() {
        let (temp, storage) = make_storage();
        let outside = temp.path().join("outside.txt");
        std::fs::write(&outside, b"secret").expect("write");

        let result = storage.delete("../outside.txt").await;
        assert!(matches!(result, Err(StorageError::PathEscape)));
        assert!(outside.exists());
    }
}
