//! Photo gallery operations over a [`DocumentStore`] and a [`BlobStore`].
//!
//! ## Upload paths
//!
//! ```text
//! upload_photo          bytes ──▶ preprocess ──▶ data URI ──▶ photos/{id}
//! upload_photo_to_blob  bytes ──▶ blob store ──▶ download URL ──▶ photos/{id}
//! ```
//!
//! Both paths report progress through the shared [`UploadStatus`].

use super::backend::{
    BlobError, BlobStore, Direction, Document, DocumentStore, Query, UploadProgressFn,
};
use super::model::{
    PaginatedResponse, Photo, PhotoPatch, PhotoUploadData, ViewMode, PHOTOS_COLLECTION,
};
use super::status::{LoadingTracker, UploadStatus};
use super::validate::{default_title, validate_description, validate_title, validate_upload};
use crate::config::{PreprocessConfig, Quality};
use crate::error::GalleryError;
use crate::output::EncodedOutput;
use crate::preprocess::preprocess;
use crate::progress::{PreprocessProgressCallback, ProgressCallback};
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default page size for [`PhotoService::get_all_photos`].
pub const DEFAULT_PAGE_SIZE: usize = 12;

const ORDER_FIELD: &str = "uploadedAt";

/// Gallery operations for one backend.
#[derive(Clone)]
pub struct PhotoService {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    config: PreprocessConfig,
    status: UploadStatus,
    loading: LoadingTracker,
}

impl PhotoService {
    pub fn new(documents: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_config(documents, blobs, PreprocessConfig::default())
    }

    pub fn with_config(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: PreprocessConfig,
    ) -> Self {
        Self {
            documents,
            blobs,
            config,
            status: UploadStatus::new(),
            loading: LoadingTracker::new(),
        }
    }

    /// Shared upload progress; clones observe the same state.
    pub fn upload_status(&self) -> UploadStatus {
        self.status.clone()
    }

    /// On while a list or lookup query is in flight.
    pub fn loading(&self) -> LoadingTracker {
        self.loading.clone()
    }

    // ── Uploads ───────────────────────────────────────────────────────────

    /// Preprocess the image and store it inline as a data URI.
    pub async fn upload_photo(
        &self,
        data: PhotoUploadData,
        owner_id: Option<&str>,
    ) -> Result<Photo, GalleryError> {
        validate_upload(&data).map_err(GalleryError::Validation)?;

        self.status.begin();
        let result = self.store_inline(data, owner_id).await;
        self.settle(&result);
        result
    }

    /// Store the original bytes in the blob store and reference them by URL.
    ///
    /// Blob paths are per user, so a blank `owner_id` is rejected with
    /// [`GalleryError::NotSignedIn`].
    pub async fn upload_photo_to_blob(
        &self,
        data: PhotoUploadData,
        owner_id: &str,
    ) -> Result<Photo, GalleryError> {
        if owner_id.trim().is_empty() {
            return Err(GalleryError::NotSignedIn);
        }
        validate_upload(&data).map_err(GalleryError::Validation)?;

        self.status.begin();
        let result = self.store_blob(data, owner_id).await;
        self.settle(&result);
        result
    }

    async fn store_inline(
        &self,
        data: PhotoUploadData,
        owner_id: Option<&str>,
    ) -> Result<Photo, GalleryError> {
        let filename = data.filename();
        let title = data.title.unwrap_or_else(|| default_title(&filename));

        let output = preprocess(data.input, &self.run_config()).await?;
        let (width, height) = (output.width, output.height);

        let photo = Photo {
            id: String::new(),
            title,
            filename,
            url: output.data_uri,
            description: data.description.unwrap_or_default(),
            is_favorite: false,
            deleted: false,
            uploaded_at: Utc::now(),
            owner_id: owner_id.map(str::to_string),
            storage_path: None,
            width: Some(width),
            height: Some(height),
        };
        self.insert(photo).await
    }

    async fn store_blob(&self, data: PhotoUploadData, owner_id: &str) -> Result<Photo, GalleryError> {
        let filename = data.filename();
        let title = data.title.unwrap_or_else(|| default_title(&filename));
        let uploaded_at = Utc::now();
        let path = blob_path(owner_id, uploaded_at.timestamp_millis(), &filename);
        let mime = data.input.mime_type().to_string();

        let status = self.status.clone();
        let progress: UploadProgressFn = Arc::new(move |sent, total| {
            status.set_progress(transfer_percent(sent, total));
        });

        let blob = self
            .blobs
            .upload(&path, data.input.into_bytes(), &mime, Some(progress))
            .await?;
        debug!("Stored blob {}", blob.path);

        let photo = Photo {
            id: String::new(),
            title,
            filename,
            url: blob.download_url,
            description: data.description.unwrap_or_default(),
            is_favorite: false,
            deleted: false,
            uploaded_at,
            owner_id: Some(owner_id.to_string()),
            storage_path: Some(blob.path.clone()),
            width: None,
            height: None,
        };

        match self.insert(photo).await {
            Ok(photo) => Ok(photo),
            Err(e) => {
                match self.blobs.delete(&blob.path).await {
                    Ok(()) => warn!("Record write failed; removed blob {}", blob.path),
                    Err(del) => warn!("Record write failed; blob {} left behind: {}", blob.path, del),
                }
                Err(e)
            }
        }
    }

    async fn insert(&self, photo: Photo) -> Result<Photo, GalleryError> {
        let id = self
            .documents
            .create(PHOTOS_COLLECTION, photo.to_value()?)
            .await?;
        info!("Added photo {} ({})", id, photo.filename);
        Ok(Photo { id, ..photo })
    }

    fn settle(&self, result: &Result<Photo, GalleryError>) {
        match result {
            Ok(_) => self.status.finish(),
            Err(e) => {
                warn!("Upload failed: {}", e);
                self.status.reset();
            }
        }
    }

    /// Per-run config that also drives the upload status.
    fn run_config(&self) -> PreprocessConfig {
        let mut config = self.config.clone();
        config.progress_callback = Some(Arc::new(StatusProgress {
            status: self.status.clone(),
            inner: self.config.progress_callback.clone(),
        }));
        config
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Everything not in the trash, newest first.
    pub async fn get_photos(&self) -> Result<Vec<Photo>, GalleryError> {
        self.photos_for(ViewMode::Normal).await
    }

    pub async fn get_favorite_photos(&self) -> Result<Vec<Photo>, GalleryError> {
        self.photos_for(ViewMode::Favorites).await
    }

    pub async fn get_deleted_photos(&self) -> Result<Vec<Photo>, GalleryError> {
        self.photos_for(ViewMode::Trash).await
    }

    pub async fn photos_for(&self, mode: ViewMode) -> Result<Vec<Photo>, GalleryError> {
        self.run_query(&view_query(mode)).await
    }

    /// First page of the gallery, trash excluded.
    pub async fn get_all_photos(
        &self,
        page_size: usize,
    ) -> Result<PaginatedResponse<Photo>, GalleryError> {
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        let data = self
            .run_query(&view_query(ViewMode::Normal).limit(page_size))
            .await?;

        Ok(PaginatedResponse {
            total_count: data.len(),
            has_next_page: data.len() == page_size,
            has_previous_page: false,
            page: 1,
            page_size,
            data,
        })
    }

    pub async fn get_photo_by_id(&self, id: &str) -> Result<Option<Photo>, GalleryError> {
        let _loading = self.loading.guard();
        match self.documents.get(PHOTOS_COLLECTION, id).await? {
            Some(data) => Ok(Some(Photo::from_document(Document {
                id: id.to_string(),
                data,
            })?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive search over title, file name and description.
    /// A blank term matches everything.
    pub async fn search_photos(&self, term: &str) -> Result<Vec<Photo>, GalleryError> {
        let term = term.trim();
        let photos = self.get_photos().await?;
        if term.is_empty() {
            return Ok(photos);
        }
        Ok(photos.into_iter().filter(|p| p.matches_term(term)).collect())
    }

    /// Live view; yields the current list, then again after every change.
    pub async fn watch_photos(
        &self,
        mode: ViewMode,
    ) -> Result<BoxStream<'static, Result<Vec<Photo>, GalleryError>>, GalleryError> {
        let updates = self.documents.subscribe(view_query(mode)).await?;
        Ok(updates
            .map(|batch| {
                batch?
                    .into_iter()
                    .map(|doc| Photo::from_document(doc).map_err(GalleryError::from))
                    .collect::<Result<Vec<_>, _>>()
            })
            .boxed())
    }

    async fn run_query(&self, query: &Query) -> Result<Vec<Photo>, GalleryError> {
        let _loading = self.loading.guard();
        let docs = self.documents.query(query).await?;
        docs.into_iter()
            .map(|doc| Photo::from_document(doc).map_err(GalleryError::from))
            .collect()
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    pub async fn toggle_favorite(&self, id: &str, is_favorite: bool) -> Result<(), GalleryError> {
        self.patch(id, json!({ "isFavorite": is_favorite })).await
    }

    /// Soft delete; the photo stays restorable.
    pub async fn move_to_trash(&self, id: &str) -> Result<(), GalleryError> {
        self.patch(id, json!({ "deleted": true })).await
    }

    pub async fn restore_photo(&self, id: &str) -> Result<(), GalleryError> {
        self.patch(id, json!({ "deleted": false })).await
    }

    pub async fn update_description(&self, id: &str, description: &str) -> Result<(), GalleryError> {
        validate_description(description).map_err(|e| GalleryError::Validation(vec![e]))?;
        self.patch(id, json!({ "description": description })).await
    }

    /// Apply the set fields of `patch`. An empty patch is a no-op.
    pub async fn update_photo(&self, id: &str, patch: PhotoPatch) -> Result<(), GalleryError> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut errors = Vec::new();
        if let Some(title) = &patch.title {
            errors.extend(validate_title(title).err());
        }
        if let Some(description) = &patch.description {
            errors.extend(validate_description(description).err());
        }
        if !errors.is_empty() {
            return Err(GalleryError::Validation(errors));
        }
        self.patch(id, serde_json::to_value(&patch)?).await
    }

    /// Remove the photo for good: blob first (if any), then the document.
    ///
    /// A blob that is already gone is not an error.
    pub async fn permanently_delete_photo(&self, id: &str) -> Result<(), GalleryError> {
        let photo = self
            .get_photo_by_id(id)
            .await?
            .ok_or_else(|| GalleryError::NotFound {
                collection: PHOTOS_COLLECTION.to_string(),
                id: id.to_string(),
            })?;

        if let Some(path) = &photo.storage_path {
            match self.blobs.delete(path).await {
                Ok(()) => debug!("Deleted blob {}", path),
                Err(BlobError::NotFound(_)) => {
                    warn!("Blob {} already gone; deleting document anyway", path)
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.documents.delete(PHOTOS_COLLECTION, id).await?;
        info!("Permanently deleted photo {}", id);
        Ok(())
    }

    async fn patch(&self, id: &str, fields: serde_json::Value) -> Result<(), GalleryError> {
        self.documents.update(PHOTOS_COLLECTION, id, fields).await?;
        debug!("Updated photo {}", id);
        Ok(())
    }
}

/// Query for a view, newest first.
pub fn view_query(mode: ViewMode) -> Query {
    let query = Query::collection(PHOTOS_COLLECTION);
    let query = match mode {
        ViewMode::Normal => query.where_eq("deleted", false),
        ViewMode::Favorites => query
            .where_eq("deleted", false)
            .where_eq("isFavorite", true),
        ViewMode::Trash => query.where_eq("deleted", true),
    };
    query.order_by(ORDER_FIELD, Direction::Descending)
}

/// `photos/{uid}/{timestamp_ms}_{filename}`
pub fn blob_path(owner_id: &str, timestamp_ms: i64, filename: &str) -> String {
    format!("photos/{owner_id}/{timestamp_ms}_{filename}")
}

fn transfer_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (sent.min(total) * 100 / total) as u8
}

/// Forwards preprocessing progress into an [`UploadStatus`].
struct StatusProgress {
    status: UploadStatus,
    inner: Option<ProgressCallback>,
}

impl PreprocessProgressCallback for StatusProgress {
    fn on_start(&self, input_len: usize) {
        if let Some(cb) = &self.inner {
            cb.on_start(input_len);
        }
    }

    fn on_progress(&self, percent: u8) {
        self.status.set_progress(percent);
        if let Some(cb) = &self.inner {
            cb.on_progress(percent);
        }
    }

    fn on_attempt(&self, attempt: u32, quality: Quality, encoded_len: usize) {
        if let Some(cb) = &self.inner {
            cb.on_attempt(attempt, quality, encoded_len);
        }
    }

    fn on_complete(&self, output: &EncodedOutput) {
        if let Some(cb) = &self.inner {
            cb.on_complete(output);
        }
    }

    fn on_error(&self, error: &str) {
        if let Some(cb) = &self.inner {
            cb.on_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::backend::StoreError;
    use crate::gallery::memory::{MemoryBlobStore, MemoryDocumentStore};
    use async_trait::async_trait;
    use crate::pipeline::input::ImageInput;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(name: &str, w: u32, h: u32) -> ImageInput {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 120, 40])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        ImageInput::sniff(buf, Some(name.to_string()))
    }

    fn service() -> (PhotoService, MemoryDocumentStore, MemoryBlobStore) {
        let docs = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let svc = PhotoService::new(Arc::new(docs.clone()), Arc::new(blobs.clone()));
        (svc, docs, blobs)
    }

    /// Document store that rejects every write.
    struct ReadOnlyDocs;

    #[async_trait]
    impl DocumentStore for ReadOnlyDocs {
        async fn create(&self, _: &str, _: serde_json::Value) -> Result<String, StoreError> {
            Err(StoreError::Backend("read-only".into()))
        }
        async fn set(&self, _: &str, _: &str, _: serde_json::Value) -> Result<(), StoreError> {
            Err(StoreError::Backend("read-only".into()))
        }
        async fn get(&self, _: &str, _: &str) -> Result<Option<serde_json::Value>, StoreError> {
            Ok(None)
        }
        async fn update(&self, _: &str, _: &str, _: serde_json::Value) -> Result<(), StoreError> {
            Err(StoreError::Backend("read-only".into()))
        }
        async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("read-only".into()))
        }
        async fn query(&self, _: &Query) -> Result<Vec<Document>, StoreError> {
            Ok(Vec::new())
        }
        async fn subscribe(
            &self,
            _: Query,
        ) -> Result<BoxStream<'static, Result<Vec<Document>, StoreError>>, StoreError> {
            Ok(futures::stream::empty().boxed())
        }
    }

    #[test]
    fn blob_path_layout() {
        assert_eq!(blob_path("u1", 42, "a.jpg"), "photos/u1/42_a.jpg");
    }

    #[test]
    fn transfer_percent_bounds() {
        assert_eq!(transfer_percent(0, 0), 100);
        assert_eq!(transfer_percent(50, 200), 25);
        assert_eq!(transfer_percent(300, 200), 100);
    }

    #[test]
    fn view_queries() {
        let trash = view_query(ViewMode::Trash);
        assert!(trash.matches(&json!({"deleted": true})));
        assert!(!trash.matches(&json!({"deleted": false})));
        let favs = view_query(ViewMode::Favorites);
        assert!(!favs.matches(&json!({"deleted": false, "isFavorite": false})));
        assert_eq!(
            favs.order_by,
            Some((ORDER_FIELD.to_string(), Direction::Descending))
        );
    }

    #[tokio::test]
    async fn inline_upload_stores_data_uri() {
        let (svc, docs, blobs) = service();
        let photo = svc
            .upload_photo(
                PhotoUploadData::new(png("beach.day.png", 64, 48)).description("Sand"),
                Some("u1"),
            )
            .await
            .unwrap();

        assert_eq!(photo.title, "beach");
        assert!(photo.url.starts_with("data:image/jpeg;base64,"));
        assert_eq!((photo.width, photo.height), (Some(64), Some(48)));
        assert_eq!(docs.len(PHOTOS_COLLECTION).await, 1);
        assert_eq!(blobs.len().await, 0);

        let status = svc.upload_status();
        assert!(!status.is_uploading());
        assert_eq!(status.progress(), 0);
    }

    #[tokio::test]
    async fn invalid_upload_never_touches_the_store() {
        let (svc, docs, _) = service();
        let err = svc
            .upload_photo(
                PhotoUploadData::new(ImageInput::from_bytes(vec![1, 2], "text/plain")),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)));
        assert_eq!(docs.len(PHOTOS_COLLECTION).await, 0);
        assert!(!svc.upload_status().is_uploading());
    }

    #[tokio::test]
    async fn undecodable_upload_resets_status() {
        let (svc, docs, _) = service();
        let err = svc
            .upload_photo(
                PhotoUploadData::new(
                    ImageInput::from_bytes(b"not really".to_vec(), "image/png").with_name("x.png"),
                ),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::Preprocess(_)));
        assert_eq!(docs.len(PHOTOS_COLLECTION).await, 0);
        let status = svc.upload_status();
        assert!(!status.is_uploading());
        assert_eq!(status.progress(), 0);
    }

    #[tokio::test]
    async fn blob_upload_and_permanent_delete() {
        let (svc, docs, blobs) = service();
        let photo = svc
            .upload_photo_to_blob(
                PhotoUploadData::new(png("cat.png", 8, 8)).title("My cat"),
                "u9",
            )
            .await
            .unwrap();

        let path = photo.storage_path.clone().unwrap();
        assert!(path.starts_with("photos/u9/") && path.ends_with("_cat.png"));
        assert_eq!(photo.url, MemoryBlobStore::url_for(&path));
        assert!(blobs.contains(&path).await);

        svc.permanently_delete_photo(&photo.id).await.unwrap();
        assert!(!blobs.contains(&path).await);
        assert_eq!(docs.len(PHOTOS_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn failed_record_write_removes_uploaded_blob() {
        let blobs = MemoryBlobStore::new();
        let svc = PhotoService::new(Arc::new(ReadOnlyDocs), Arc::new(blobs.clone()));

        let err = svc
            .upload_photo_to_blob(PhotoUploadData::new(png("dog.png", 8, 8)), "u3")
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::Store(_)), "{err}");
        assert_eq!(blobs.len().await, 0);
        assert!(!svc.upload_status().is_uploading());
    }

    #[tokio::test]
    async fn blob_upload_needs_an_owner() {
        let (svc, docs, blobs) = service();
        let err = svc
            .upload_photo_to_blob(PhotoUploadData::new(png("cat.png", 8, 8)), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::NotSignedIn));
        assert_eq!(blobs.len().await, 0);
        assert_eq!(docs.len(PHOTOS_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn permanently_deleting_missing_photo_is_not_found() {
        let (svc, _, _) = service();
        let err = svc.permanently_delete_photo("nope").await.unwrap_err();
        assert!(matches!(err, GalleryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn favorites_trash_and_restore() {
        let (svc, _, _) = service();
        let a = svc
            .upload_photo(PhotoUploadData::new(png("a1.png", 4, 4)), None)
            .await
            .unwrap();
        let b = svc
            .upload_photo(PhotoUploadData::new(png("b1.png", 4, 4)), None)
            .await
            .unwrap();

        svc.toggle_favorite(&a.id, true).await.unwrap();
        svc.move_to_trash(&b.id).await.unwrap();

        let ids = |v: Vec<Photo>| v.into_iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(svc.get_photos().await.unwrap()), vec![a.id.clone()]);
        assert_eq!(ids(svc.get_favorite_photos().await.unwrap()), vec![a.id.clone()]);
        assert_eq!(ids(svc.get_deleted_photos().await.unwrap()), vec![b.id.clone()]);

        svc.restore_photo(&b.id).await.unwrap();
        assert_eq!(
            ids(svc.get_photos().await.unwrap()),
            vec![b.id.clone(), a.id.clone()],
            "newest first"
        );
        assert!(!svc.loading().is_loading());
    }

    #[tokio::test]
    async fn description_edits_are_validated() {
        let (svc, _, _) = service();
        let p = svc
            .upload_photo(PhotoUploadData::new(png("d.png", 4, 4)), None)
            .await
            .unwrap();

        svc.update_description(&p.id, "Lovely").await.unwrap();
        let err = svc
            .update_description(&p.id, &"x".repeat(501))
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::Validation(_)));

        svc.update_photo(
            &p.id,
            PhotoPatch {
                title: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = svc
            .update_photo(
                &p.id,
                PhotoPatch {
                    title: Some("<>".into()),
                    description: Some("y".repeat(501)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        match err {
            GalleryError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected Validation, got {other:?}"),
        }

        let stored = svc.get_photo_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stored.description, "Lovely");
        assert_eq!(stored.title, "Renamed");
    }

    #[tokio::test]
    async fn updating_missing_photo_is_not_found() {
        let (svc, _, _) = service();
        let err = svc.toggle_favorite("missing", true).await.unwrap_err();
        assert!(matches!(err, GalleryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn pagination_reports_next_page_when_full() {
        let (svc, _, _) = service();
        for name in ["p1.png", "p2.png", "p3.png"] {
            svc.upload_photo(PhotoUploadData::new(png(name, 4, 4)), None)
                .await
                .unwrap();
        }

        let page = svc.get_all_photos(2).await.unwrap();
        assert_eq!(page.data.len(), 2);
        assert!(page.has_next_page);
        assert!(!page.has_previous_page);

        let page = svc.get_all_photos(DEFAULT_PAGE_SIZE).await.unwrap();
        assert_eq!(page.data.len(), 3);
        assert!(!page.has_next_page);
    }

    #[tokio::test]
    async fn search_matches_title_and_description() {
        let (svc, _, _) = service();
        svc.upload_photo(
            PhotoUploadData::new(png("x.png", 4, 4))
                .title("Harbour")
                .description("Boats at dawn"),
            None,
        )
        .await
        .unwrap();
        svc.upload_photo(PhotoUploadData::new(png("y.png", 4, 4)).title("Forest"), None)
            .await
            .unwrap();

        assert_eq!(svc.search_photos("BOATS").await.unwrap().len(), 1);
        assert_eq!(svc.search_photos("forest").await.unwrap().len(), 1);
        assert_eq!(svc.search_photos("  ").await.unwrap().len(), 2);
        assert!(svc.search_photos("desert").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_photos_sees_new_uploads() {
        let (svc, _, _) = service();
        let mut live = svc.watch_photos(ViewMode::Normal).await.unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());

        svc.upload_photo(PhotoUploadData::new(png("w.png", 4, 4)), None)
            .await
            .unwrap();
        assert_eq!(live.next().await.unwrap().unwrap().len(), 1);
    }
}
