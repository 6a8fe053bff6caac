//! Read-only filesystem store for generated result PDFs.
//!
//! Layout: `{storage_root}/resumes_pdf/{openid}/{unix_ts}.pdf`. The store is
//! the single authority for which PDFs exist for a user; it never creates or
//! deletes them. Every call re-reads the filesystem, so there is no cached
//! staleness to invalidate.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::results::identifier::sanitize_openid;

/// Subdirectory of the storage root holding per-owner PDF directories.
pub const PDF_PREFIX: &str = "resumes_pdf";

/// A materialized artifact record, built fresh from a `stat` on every call.
#[derive(Debug, Clone)]
pub struct StoredResult {
    pub openid: String,
    pub filename: String,
    /// Canonical absolute path of the PDF.
    pub path: PathBuf,
    pub size: u64,
    /// File modification time, UTC.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    pdf_root: PathBuf,
}

impl ResultStore {
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        ResultStore {
            pdf_root: storage_root.as_ref().join(PDF_PREFIX),
        }
    }

    /// Lists up to `limit` PDFs for an owner, most recent first.
    ///
    /// A missing owner directory yields an empty list, not an error. Files
    /// that vanish between scan and stat are skipped: the listing is a
    /// best-effort snapshot, not a transaction.
    pub fn list(&self, openid: &str, limit: usize) -> Result<Vec<StoredResult>, AppError> {
        let openid = sanitize_openid(openid)?;
        let base_dir = self.pdf_root.join(&openid);
        let entries = match fs::read_dir(&base_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };

        let mut items = Vec::new();
        for entry in entries.flatten() {
            if !is_pdf(&entry.path()) {
                continue;
            }
            let Ok(path) = fs::canonicalize(entry.path()) else {
                continue;
            };
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Ok(modified) = meta.modified() else {
                continue;
            };
            let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            items.push(StoredResult {
                openid: openid.clone(),
                filename: filename.to_string(),
                size: meta.len(),
                created_at: DateTime::<Utc>::from(modified),
                path,
            });
        }

        // Newest first; filename as a stable tie-breaker for equal mtimes.
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        items.truncate(limit);
        Ok(items)
    }

    /// Resolves one artifact by owner and filename.
    ///
    /// The candidate path is canonicalized and must remain a descendant of
    /// the canonical owner directory. Traversal attempts, missing files,
    /// non-regular files and non-PDF targets all map to `NotFound` so the
    /// response never reveals directory structure.
    pub fn resolve(&self, openid: &str, filename: &str) -> Result<StoredResult, AppError> {
        let openid = sanitize_openid(openid)?;
        let base_dir =
            fs::canonicalize(self.pdf_root.join(&openid)).map_err(|_| AppError::NotFound)?;
        let target = fs::canonicalize(base_dir.join(filename)).map_err(|_| AppError::NotFound)?;
        if !target.starts_with(&base_dir) {
            return Err(AppError::NotFound);
        }
        if !is_pdf(&target) {
            return Err(AppError::NotFound);
        }
        let meta = fs::metadata(&target).map_err(|_| AppError::NotFound)?;
        if !meta.is_file() {
            return Err(AppError::NotFound);
        }
        let modified = meta
            .modified()
            .map_err(|e| AppError::Internal(anyhow::Error::from(e)))?;
        let filename = target
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(AppError::NotFound)?
            .to_string();

        Ok(StoredResult {
            openid,
            filename,
            size: meta.len(),
            created_at: DateTime::<Utc>::from(modified),
            path: target,
        })
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes};
    use std::time::{Duration, SystemTime};

    fn write_pdf(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"%PDF-1.4\n").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_times(FileTimes::new().set_modified(mtime))
            .unwrap();
        path
    }

    fn store_with_owner(openid: &str) -> (tempfile::TempDir, ResultStore, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let owner_dir = root.path().join(PDF_PREFIX).join(openid);
        fs::create_dir_all(&owner_dir).unwrap();
        let store = ResultStore::new(root.path());
        (root, store, owner_dir)
    }

    #[test]
    fn test_list_sorted_newest_first() {
        let (_root, store, owner_dir) = store_with_owner("u123");
        write_pdf(&owner_dir, "1700000000.pdf", 100);
        write_pdf(&owner_dir, "1700000100.pdf", 0);

        let items = store.list("u123", 10).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].filename, "1700000100.pdf");
        assert_eq!(items[1].filename, "1700000000.pdf");
    }

    #[test]
    fn test_list_respects_limit() {
        let (_root, store, owner_dir) = store_with_owner("u123");
        for i in 0..15 {
            write_pdf(&owner_dir, &format!("17000000{i:02}.pdf"), 100 - i);
        }
        assert_eq!(store.list("u123", 10).unwrap().len(), 10);
    }

    #[test]
    fn test_list_unknown_owner_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let store = ResultStore::new(root.path());
        assert!(store.list("nobody", 10).unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_non_pdf_files() {
        let (_root, store, owner_dir) = store_with_owner("u123");
        write_pdf(&owner_dir, "1700000000.pdf", 0);
        fs::write(owner_dir.join("notes.txt"), b"not a pdf").unwrap();
        fs::create_dir(owner_dir.join("nested.pdf")).unwrap();

        let items = store.list("u123", 10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].filename, "1700000000.pdf");
    }

    #[test]
    fn test_list_rejects_openid_with_separator() {
        let root = tempfile::tempdir().unwrap();
        let store = ResultStore::new(root.path());
        assert!(matches!(
            store.list("../other", 10),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_success() {
        let (_root, store, owner_dir) = store_with_owner("u123");
        write_pdf(&owner_dir, "1700000100.pdf", 0);

        let record = store.resolve("u123", "1700000100.pdf").unwrap();
        assert_eq!(record.openid, "u123");
        assert_eq!(record.filename, "1700000100.pdf");
        assert_eq!(record.size, 9);
        assert!(record.path.is_absolute());
    }

    #[test]
    fn test_resolve_traversal_is_not_found() {
        let (root, store, owner_dir) = store_with_owner("u123");
        write_pdf(&owner_dir, "1700000100.pdf", 0);
        // A real file outside the owner directory must stay unreachable.
        fs::write(root.path().join("secret.pdf"), b"%PDF-1.4 secret").unwrap();

        assert!(matches!(
            store.resolve("u123", "../../secret.pdf"),
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            store.resolve("u123", "../secret.pdf"),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_resolve_missing_file_is_not_found() {
        let (_root, store, _owner_dir) = store_with_owner("u123");
        assert!(matches!(
            store.resolve("u123", "missing.pdf"),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_resolve_missing_owner_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = ResultStore::new(root.path());
        assert!(matches!(
            store.resolve("ghost", "a.pdf"),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_resolve_non_pdf_is_not_found() {
        let (_root, store, owner_dir) = store_with_owner("u123");
        fs::write(owner_dir.join("notes.txt"), b"plain").unwrap();
        assert!(matches!(
            store.resolve("u123", "notes.txt"),
            Err(AppError::NotFound)
        ));
    }
}
