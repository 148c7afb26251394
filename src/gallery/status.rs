//! Observable upload and loading state for a UI layer.
//!
//! Both types are cheap to clone; clones share state. Observers subscribe to
//! `tokio::sync::watch` channels and always see the latest value.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Progress of the current upload.
///
/// `progress` is a percentage in `0..=100`; `is_uploading` is true from
/// [`begin`](Self::begin) until [`finish`](Self::finish) or
/// [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct UploadStatus {
    inner: Arc<UploadStatusInner>,
}

#[derive(Debug)]
struct UploadStatusInner {
    progress: watch::Sender<u8>,
    uploading: watch::Sender<bool>,
}

impl Default for UploadStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadStatus {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(0);
        let (uploading, _) = watch::channel(false);
        Self {
            inner: Arc::new(UploadStatusInner {
                progress,
                uploading,
            }),
        }
    }

    pub fn progress(&self) -> u8 {
        *self.inner.progress.borrow()
    }

    pub fn is_uploading(&self) -> bool {
        *self.inner.uploading.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.inner.progress.subscribe()
    }

    pub fn subscribe_uploading(&self) -> watch::Receiver<bool> {
        self.inner.uploading.subscribe()
    }

    /// Mark an upload as started at 0 %.
    pub fn begin(&self) {
        self.inner.progress.send_replace(0);
        self.inner.uploading.send_replace(true);
    }

    /// Clamped to 100. Ignored when no upload is running.
    pub fn set_progress(&self, percent: u8) {
        if self.is_uploading() {
            self.inner.progress.send_replace(percent.min(100));
        }
    }

    /// Upload succeeded: report 100 %, then return to idle.
    pub fn finish(&self) {
        self.inner.progress.send_replace(100);
        self.reset();
    }

    /// Back to idle at 0 %.
    pub fn reset(&self) {
        self.inner.uploading.send_replace(false);
        self.inner.progress.send_replace(0);
    }
}

/// Nested loading indicator.
///
/// Every [`show`](Self::show) must be paired with a [`hide`](Self::hide);
/// the indicator is on while the count is above zero. Prefer
/// [`guard`](Self::guard), which hides on drop.
#[derive(Debug, Clone)]
pub struct LoadingTracker {
    inner: Arc<LoadingInner>,
}

#[derive(Debug)]
struct LoadingInner {
    count: Mutex<usize>,
    loading: watch::Sender<bool>,
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingTracker {
    pub fn new() -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            inner: Arc::new(LoadingInner {
                count: Mutex::new(0),
                loading,
            }),
        }
    }

    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    pub fn show(&self) {
        self.with_count(|count| *count += 1);
    }

    /// Extra hides never drive the count below zero.
    pub fn hide(&self) {
        self.with_count(|count| *count = count.saturating_sub(1));
    }

    pub fn force_hide(&self) {
        self.with_count(|count| *count = 0);
    }

    /// Show now, hide when the guard drops.
    pub fn guard(&self) -> LoadingGuard {
        self.show();
        LoadingGuard {
            tracker: self.clone(),
        }
    }

    fn with_count(&self, f: impl FnOnce(&mut usize)) {
        let mut count = self
            .inner
            .count
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut count);
        self.inner.loading.send_if_modified(|loading| {
            let next = *count > 0;
            let changed = *loading != next;
            *loading = next;
            changed
        });
    }
}

/// Returned by [`LoadingTracker::guard`].
#[must_use = "the loading indicator hides as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LoadingGuard {
    tracker: LoadingTracker,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tracker.hide();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_lifecycle() {
        let status = UploadStatus::new();
        assert!(!status.is_uploading());

        status.set_progress(40);
        assert_eq!(status.progress(), 0, "ignored while idle");

        status.begin();
        status.set_progress(40);
        assert_eq!(status.progress(), 40);
        status.set_progress(250);
        assert_eq!(status.progress(), 100);

        status.finish();
        assert!(!status.is_uploading());
        assert_eq!(status.progress(), 0);
    }

    #[test]
    fn clones_share_state() {
        let a = UploadStatus::new();
        let b = a.clone();
        a.begin();
        assert!(b.is_uploading());
    }

    #[test]
    fn progress_subscribers_see_latest_value() {
        let status = UploadStatus::new();
        let mut rx = status.subscribe_progress();
        status.begin();
        status.set_progress(70);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 70);
    }

    #[test]
    fn loading_counts_nested_calls() {
        let loading = LoadingTracker::new();
        loading.show();
        loading.show();
        loading.hide();
        assert!(loading.is_loading());
        loading.hide();
        assert!(!loading.is_loading());
        loading.hide();
        loading.show();
        assert!(loading.is_loading(), "extra hide must not go negative");
        loading.force_hide();
        assert!(!loading.is_loading());
    }

    #[test]
    fn guard_hides_on_drop() {
        let loading = LoadingTracker::new();
        {
            let _g = loading.guard();
            assert!(loading.is_loading());
        }
        assert!(!loading.is_loading());
    }

    #[test]
    fn loading_subscriber_wakes_on_change() {
        tokio_test::block_on(async {
            let loading = LoadingTracker::new();
            let mut rx = loading.subscribe();
            let handle = loading.clone();
            let task = tokio::spawn(async move {
                rx.changed().await.unwrap();
                *rx.borrow()
            });
            handle.show();
            assert!(task.await.unwrap());
        });
    }
}
