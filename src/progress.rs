//! Progress-callback trait for per-page rasterisation events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::RenderConfigBuilder::progress_callback`] to receive
//! events while the page renderer works through the document.
//!
//! The callback is the least-invasive integration point: callers can forward
//! events to a channel, a log, or a terminal progress bar without the library
//! knowing how the host application communicates. The trait is `Send + Sync`
//! because pages are rendered by a pool of worker threads.
//!
//! # Example
//!
//! ```rust
//! use doc2png::{RenderConfig, RenderProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl RenderProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, page_num: usize, total_pages: usize) {
//!         let done = self.rendered.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("page {page_num} done ({done}/{total_pages})");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = RenderConfig::builder()
//!     .progress_callback(counter as Arc<dyn RenderProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it rasterises each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_page_rendered` is called from the render worker threads, possibly
/// concurrently and out of page order. Protect shared mutable state with
/// `Mutex` or atomics.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once the page count of the intermediate PDF is known, before
    /// any page is rendered.
    fn on_render_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a single page image has been written.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_rendered(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once after every page has been renamed into its canonical slot.
    fn on_render_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RenderConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;
