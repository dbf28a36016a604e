use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::{is_legal, FeedState};
use crate::clock::Clock;
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::transport::PageSource;


/// Notifications observable by the owner of a feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent<C> {
    /// The feed moved into a new state
    Entered(FeedState<C>),
    /// A load attempt finished, whatever its outcome
    DidLoad,
}

/// Drives one feed through reload / load-more / retry / exhaustion.
///
/// All mutation goes through `&mut self`, so triggers on the same feed are
/// serialized by construction. Dropping an in-flight `start_reload` or
/// `load_more` future abandons the load without emitting further events;
/// the next trigger first puts the feed back where it was before the
/// abandoned one started.
pub struct FeedPaginator<S: PageSource, C: Clock> {
    source: Arc<S>,
    clock: Arc<C>,
    config: FeedConfig,
    state: FeedState<S::Cursor>,
    cursor: Option<S::Cursor>,
    items: Vec<S::Item>,
    is_endpoint_unsupported: bool,
    /// State and cursor from before the running trigger; `Some` only while a load is in flight
    interrupted: Option<(FeedState<S::Cursor>, Option<S::Cursor>)>,
    subscribers: Vec<mpsc::UnboundedSender<FeedEvent<S::Cursor>>>,
}

impl<S: PageSource, C: Clock> FeedPaginator<S, C> {
    pub fn new(source: Arc<S>, clock: Arc<C>, config: FeedConfig) -> Self {
        Self {
            source,
            clock,
            config,
            state: FeedState::Initial,
            cursor: None,
            items: Vec::new(),
            is_endpoint_unsupported: false,
            interrupted: None,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &FeedState<S::Cursor> {
        &self.state
    }

    pub fn items(&self) -> &[S::Item] {
        &self.items
    }

    pub fn cursor(&self) -> Option<&S::Cursor> {
        self.cursor.as_ref()
    }

    /// Set when the server answered 404: it does not offer this feed
    pub fn is_endpoint_unsupported(&self) -> bool {
        self.is_endpoint_unsupported
    }

    pub fn can_load_more(&self) -> bool {
        matches!(self.state, FeedState::Idle)
    }

    /// Every event from now on, in order; receivers are unbounded so a slow
    /// owner never misses a `DidLoad`
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<FeedEvent<S::Cursor>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Discard the cursor and load the first page again.
    ///
    /// Legal from `Initial`, `Idle` and `NoMore`. Returns once the feed
    /// settles in `Idle` or `NoMore`.
    pub async fn start_reload(&mut self) -> Result<(), FeedError> {
        self.recover_interrupted();
        let settled = (self.state.clone(), self.cursor.clone());
        self.enter(FeedState::Reloading)?;
        self.interrupted = Some(settled);
        self.enter_loading()?;
        self.run().await;
        self.interrupted = None;
        Ok(())
    }

    /// Load the page after the stored cursor. Legal only from `Idle`.
    pub async fn load_more(&mut self) -> Result<(), FeedError> {
        self.recover_interrupted();
        if !self.can_load_more() {
            return Err(FeedError::IllegalTransition {
                from: self.state.name(),
                to: "Loading",
            });
        }
        self.interrupted = Some((self.state.clone(), self.cursor.clone()));
        self.enter_loading()?;
        self.run().await;
        self.interrupted = None;
        Ok(())
    }

    /// Undo a trigger whose future was dropped mid-load.
    ///
    /// Items only change when a page lands, so restoring state and cursor is
    /// enough. This is the one place `state` moves outside the transition table.
    fn recover_interrupted(&mut self) {
        if let Some((state, cursor)) = self.interrupted.take() {
            warn!(
                abandoned = self.state.name(),
                restored = state.name(),
                "Previous feed load was abandoned"
            );
            self.state = state.clone();
            self.cursor = cursor;
            self.emit(FeedEvent::Entered(state));
        }
    }

    fn emit(&mut self, event: FeedEvent<S::Cursor>) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Single mutation point for `state`
    fn enter(&mut self, next: FeedState<S::Cursor>) -> Result<(), FeedError> {
        if !is_legal(&self.state, &next) {
            warn!(from = self.state.name(), to = next.name(), "Rejected feed transition");
            return Err(FeedError::IllegalTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }

        debug!(from = self.state.name(), to = next.name(), "Feed transition");
        self.state = next.clone();
        self.emit(FeedEvent::Entered(next));
        Ok(())
    }

    /// Enter `Loading`; coming from `Reloading` resets the cursor
    fn enter_loading(&mut self) -> Result<(), FeedError> {
        if matches!(self.state, FeedState::Reloading) {
            self.cursor = None;
        }
        let cursor = self.cursor.clone();
        self.enter(FeedState::Loading { cursor })
    }

    /// Load until the feed leaves the `Loading`/`Fail` cycle
    async fn run(&mut self) {
        loop {
            self.load_page().await;

            if !matches!(self.state, FeedState::Fail) {
                break;
            }

            let delay = self.config.fail_retry_delay();
            info!(delay_secs = delay.as_secs(), "Feed load failed, retrying");
            self.clock.after(delay).await;

            if let Err(e) = self.enter_loading() {
                error!("Could not retry feed load: {}", e);
                break;
            }
        }
    }

    /// One fetch from `Loading`, ending in `Idle`, `NoMore` or `Fail`
    async fn load_page(&mut self) {
        let previous = self.cursor.clone();
        let is_reloading = previous.is_none();

        let result = self.source.fetch_page(previous.clone()).await;
        let next = match result {
            Ok(page) => {
                let new_cursor = match (page.next_cursor, previous.as_ref()) {
                    (Some(next), Some(prev)) => {
                        if next < *prev {
                            warn!(cursor = ?next, previous = ?prev, "Server returned an older cursor, keeping previous");
                        }
                        Some(next.max(prev.clone()))
                    }
                    (next, _) => next,
                };

                let has_more = match new_cursor.as_ref() {
                    Some(cursor) => Some(cursor) != previous.as_ref(),
                    None => false,
                };
                self.cursor = new_cursor;

                let mut items = if is_reloading {
                    Vec::new()
                } else {
                    std::mem::take(&mut self.items)
                };

                let mut appended = 0usize;
                for item in page.items {
                    if items.contains(&item) {
                        continue;
                    }
                    items.push(item);
                    appended += 1;
                }
                self.items = items;

                debug!(
                    appended,
                    total = self.items.len(),
                    has_more,
                    cursor = ?self.cursor,
                    "Feed page loaded"
                );

                if appended > 0 && has_more {
                    FeedState::Idle
                } else {
                    FeedState::NoMore
                }
            }
            Err(e) if e.is_not_found() => {
                info!("Feed endpoint not supported by server");
                self.is_endpoint_unsupported = true;
                FeedState::NoMore
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Feed request unauthorized: {}", e);
                FeedState::NoMore
            }
            Err(e) => {
                warn!("Feed request failed: {}", e);
                FeedState::Fail
            }
        };

        if let Err(e) = self.enter(next) {
            error!("Feed load finished in unexpected state: {}", e);
        }
        self.emit(FeedEvent::DidLoad);
    }
}
