//! Local file storage for uploaded product images and generated barcodes.

use std::{
    io,
    path::{Path, PathBuf},
};

use axum::body::Bytes;
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::{models::ProductId, utils::form::sanitize_file_name};

pub const BARCODE_DIR: &str = "barcodes";
/// URL path the storage root is served under.
pub const PUBLIC_PREFIX: &str = "uploads";

/// A file received in a multipart request, held in memory until stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_layout(&self) -> io::Result<()> {
        fs::create_dir_all(self.root.join(BARCODE_DIR)).await
    }

    pub fn barcode_path(&self, product_id: &ProductId) -> PathBuf {
        self.root.join(BARCODE_DIR).join(format!("{product_id}.png"))
    }

    /// Location of a product's barcode as served over HTTP, independent of
    /// where the storage root lives on disk.
    pub fn barcode_url(&self, product_id: &ProductId) -> String {
        format!("{PUBLIC_PREFIX}/{BARCODE_DIR}/{product_id}.png")
    }

    pub fn image_path(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    /// Writes uploads under the storage root and returns their stored names
    /// in submission order.
    pub async fn save_images(&self, uploads: &[UploadedFile]) -> io::Result<Vec<String>> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(&self.root).await?;

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let unique = Uuid::new_v4().simple().to_string();
            let name = format!(
                "{}-{}-{}",
                Utc::now().timestamp_millis(),
                &unique[..8],
                sanitize_file_name(&upload.file_name)
            );
            fs::write(self.image_path(&name), &upload.data).await?;
            stored.push(name);
        }
        Ok(stored)
    }

    /// Attempts to delete every path. Paths that could not be removed are
    /// logged and returned, never raised.
    pub async fn remove_best_effort(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut failures = Vec::new();
        for path in paths {
            if let Err(e) = fs::remove_file(path).await {
                log::warn!("Error deleting file {}: {}", path.display(), e);
                failures.push(path.clone());
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_images_with_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let upload = UploadedFile {
            file_name: "../cake.jpg".to_string(),
            data: Bytes::from_static(b"jpeg"),
        };

        let names = storage.save_images(&[upload.clone(), upload]).await.unwrap();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
        for name in &names {
            assert!(name.ends_with("-cake.jpg"));
            assert_eq!(fs::read(storage.image_path(name)).await.unwrap(), b"jpeg");
        }
    }

    #[test]
    fn barcode_url_does_not_leak_the_storage_root() {
        let storage = FileStorage::new("/srv/bakehouse/data");
        let id = ProductId::parse("00042").unwrap();
        assert_eq!(storage.barcode_url(&id), "uploads/barcodes/00042.png");
        assert_eq!(
            storage.barcode_path(&id),
            PathBuf::from("/srv/bakehouse/data/barcodes/00042.png")
        );
    }

    #[tokio::test]
    async fn cleanup_reports_missing_files_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let present = dir.path().join("present.png");
        fs::write(&present, b"x").await.unwrap();
        let missing = dir.path().join("missing.png");

        let failures = storage.remove_best_effort(&[present.clone(), missing.clone()]).await;
        assert!(!present.exists());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures, vec![missing]);
    }
}
