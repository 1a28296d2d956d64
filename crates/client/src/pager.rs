//! Incremental catalog loading.

use std::sync::{Arc, Mutex, MutexGuard};

use marquee_core::types::{CATALOG_PAGE_SIZE, Movie, Page, PaginationCursor};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::notify::Notifications;
use crate::services::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A batch arrived; carries its size (possibly 0).
    Appended(usize),
    /// Another load was already in flight; nothing was requested.
    Skipped,
    /// The previous batch was short, so there is nothing more to ask for.
    Exhausted,
    /// The list was reset while this batch was in flight; it was dropped.
    Discarded,
}

struct PagerState {
    movies: Vec<Movie>,
    cursor: Option<PaginationCursor>,
    has_more: bool,
    /// Bumped by `reset()` so a batch requested before the reset is dropped.
    generation: u64,
    /// Generation of the load currently in flight, if any.
    in_flight: Option<u64>,
}

/// Accumulates the catalog in batches of [`CATALOG_PAGE_SIZE`].
///
/// More is assumed available exactly when the last batch was full; there is
/// no total-count query, so a catalog whose size is a multiple of the batch
/// size ends with one empty fetch.
pub struct CatalogPager {
    store: Arc<dyn DocumentStore>,
    state: Mutex<PagerState>,
}

/// Releases the in-flight marker even if the load future is dropped. A load
/// made stale by `reset()` leaves the marker of a newer load alone.
struct LoadingGuard<'a> {
    pager: &'a CatalogPager,
    generation: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.pager.lock();
        if state.in_flight == Some(self.generation) {
            state.in_flight = None;
        }
    }
}

impl CatalogPager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            state: Mutex::new(PagerState {
                movies: Vec::new(),
                cursor: None,
                has_more: true,
                generation: 0,
                in_flight: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// One batch starting after `cursor`, without touching accumulated state.
    /// `next_cursor` references the batch's last movie and is absent for an
    /// empty batch.
    pub async fn fetch_page(
        &self,
        cursor: Option<&PaginationCursor>,
    ) -> Result<Page<Movie>, ClientError> {
        let mut page = self.store.list_movies(cursor, CATALOG_PAGE_SIZE).await?;
        if page.items.is_empty() {
            page.next_cursor = None;
        }
        Ok(page)
    }

    /// Fetch the next batch and append it.
    ///
    /// On failure nothing accumulated so far is touched and the error is
    /// returned as is; the caller decides how to report it.
    pub async fn load_more(&self) -> Result<LoadOutcome, ClientError> {
        let (cursor, generation) = {
            let mut state = self.lock();
            if state.in_flight == Some(state.generation) {
                debug!("catalog load already in flight");
                return Ok(LoadOutcome::Skipped);
            }
            if !state.has_more {
                return Ok(LoadOutcome::Exhausted);
            }
            state.in_flight = Some(state.generation);
            (state.cursor.clone(), state.generation)
        };
        let _guard = LoadingGuard {
            pager: self,
            generation,
        };

        let page = self.fetch_page(cursor.as_ref()).await?;

        let mut state = self.lock();
        if state.generation != generation {
            debug!("catalog reset during load, dropping batch");
            return Ok(LoadOutcome::Discarded);
        }

        let count = page.items.len();
        state.has_more = count == CATALOG_PAGE_SIZE;
        if let Some(next) = page.next_cursor {
            state.cursor = Some(next);
        }
        state.movies.extend(page.items);
        debug!(count, total = state.movies.len(), has_more = state.has_more, "catalog batch appended");

        Ok(LoadOutcome::Appended(count))
    }

    /// [`load_more`](Self::load_more) for UI callers: failures become an
    /// error notification and `None`.
    pub async fn load_more_or_notify(&self, notes: &Notifications) -> Option<LoadOutcome> {
        match self.load_more().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "catalog load failed");
                notes.error(format!("Could not load movies: {e}"));
                None
            }
        }
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.movies.clear();
        state.cursor = None;
        state.has_more = true;
        state.generation += 1;
    }

    pub fn movies(&self) -> Vec<Movie> {
        self.lock().movies.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    /// Whether a load for the current list is in flight. A load made stale
    /// by `reset()` does not count.
    pub fn is_loading(&self) -> bool {
        let state = self.lock();
        state.in_flight == Some(state.generation)
    }
}
