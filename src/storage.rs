use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::db::{self, Attachment, DbPool, NewAttachment};
use crate::error::ApiError;
use crate::upload::ValidatedFile;

/// Writes attachment content under the content root and records metadata in
/// the store. Content for one request is written first; the metadata rows
/// then commit as a single transaction. If that commit fails the written
/// files are removed best-effort; a file that survives the cleanup is an
/// orphan on disk with no referencing row, which is the accepted residual
/// risk of this ordering.
pub struct AttachmentStore {
    content_root: PathBuf,
}

impl AttachmentStore {
    pub fn new(content_root: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(content_root)?;
        Ok(AttachmentStore {
            content_root: content_root.to_path_buf(),
        })
    }

    pub fn content_path(&self, stored_name: &str) -> PathBuf {
        self.content_root.join(stored_name)
    }

    /// Persist a validated batch for one complaint. All metadata rows commit
    /// together or not at all.
    pub fn persist(
        &self,
        db: &DbPool,
        complaint_id: i64,
        files: Vec<ValidatedFile>,
    ) -> Result<Vec<Attachment>, ApiError> {
        let mut written: Vec<PathBuf> = Vec::with_capacity(files.len());

        for file in &files {
            let path = self.content_path(&file.stored_name);
            if let Err(e) = fs::write(&path, &file.bytes) {
                self.discard(&written);
                return Err(ApiError::Internal(format!(
                    "failed to write attachment content: {}",
                    e
                )));
            }
            written.push(path);
        }

        let now = Utc::now().timestamp();
        let rows = files
            .iter()
            .map(|f| NewAttachment {
                complaint_id,
                stored_name: f.stored_name.clone(),
                extension: f.media_type.extension().to_string(),
                media_type: f.media_type.mime().to_string(),
                created_at: now,
            })
            .collect();

        match db::insert_attachments(db, complaint_id, rows) {
            Ok(created) => {
                tracing::info!(
                    "Persisted {} attachment(s) for complaint {}",
                    created.len(),
                    complaint_id
                );
                Ok(created)
            }
            Err(e) => {
                self.discard(&written);
                Err(ApiError::from(e))
            }
        }
    }

    fn discard(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(
                    "Orphaned attachment content left on disk: {} ({})",
                    path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complaint::{CanonicalComplaint, PersonKind};
    use crate::db::init::{init_db, run_migrations, seed_reference_data};
    use crate::upload::sniff::MediaType;

    fn test_db() -> DbPool {
        let db = init_db(":memory:").unwrap();
        run_migrations(&db).unwrap();
        seed_reference_data(&db).unwrap();
        db
    }

    fn stored_complaint(db: &DbPool) -> i64 {
        let params = CanonicalComplaint {
            session_id: "".into(),
            summary: "test".into(),
            object_id: 1,
            jurisdiction_id: 1,
            plaintiff_kind: PersonKind::Individual,
            plaintiff_first_name: "A".into(),
            plaintiff_last_name: "B".into(),
            plaintiff_national_id: "1-9".into(),
            plaintiff_email: None,
            plaintiff_phone: None,
            plaintiff_country_id: 1,
            plaintiff_city_id: 1,
            plaintiff_profession_id: 1,
            defendant_kind: PersonKind::Company,
            defendant_first_name: None,
            defendant_last_name: None,
            defendant_commercial_name: Some("Acme".into()),
        };
        db::create_complaint(db, &params).unwrap().0
    }

    fn validated(name: &str) -> ValidatedFile {
        ValidatedFile {
            stored_name: name.to_string(),
            media_type: MediaType::Pdf,
            bytes: b"%PDF-1.4 test".to_vec(),
        }
    }

    #[test]
    fn persists_content_and_metadata_together() {
        let db = test_db();
        let complaint_id = stored_complaint(&db);
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path()).unwrap();

        let created = store
            .persist(&db, complaint_id, vec![validated("a.pdf"), validated("b.pdf")])
            .unwrap();
        assert_eq!(created.len(), 2);
        assert!(store.content_path("a.pdf").exists());
        assert!(store.content_path("b.pdf").exists());
        assert_eq!(db::list_attachments(&db, complaint_id).unwrap().len(), 2);
    }

    #[test]
    fn unknown_complaint_leaves_no_content_behind() {
        let db = test_db();
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path()).unwrap();

        let err = store
            .persist(&db, 9999, vec![validated("c.pdf")])
            .unwrap_err();
        assert_eq!(err.kind(), "MISSING_OR_INVALID_TARGET");
        assert!(!store.content_path("c.pdf").exists());
        assert!(db::list_attachments(&db, 9999).unwrap().is_empty());
    }

    #[test]
    fn failed_metadata_commit_discards_written_files() {
        let db = test_db();
        let complaint_id = stored_complaint(&db);
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path()).unwrap();

        // Duplicate stored names violate the UNIQUE constraint mid-batch.
        let err = store
            .persist(&db, complaint_id, vec![validated("dup.pdf"), validated("dup.pdf")])
            .unwrap_err();
        assert_eq!(err.kind(), "INTERNAL");
        assert!(!store.content_path("dup.pdf").exists());
        assert!(db::list_attachments(&db, complaint_id).unwrap().is_empty());
    }
}
