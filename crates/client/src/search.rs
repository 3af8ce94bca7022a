//! Incremental search across the edition feed.
//!
//! One scan task walks editions in index order and appends matches to a
//! shared buffer; a timer task drains that buffer on a fixed cadence so the
//! consumer sees results trickle in, and the scan itself drains it when it
//! reaches the batch threshold. Both drains run under one buffer lock that
//! is held across the channel send, so a flush is atomic and batches arrive
//! in wall-clock order.
//!
//! The aggregator owns the cancellation token for the active scan and
//! guarantees at most one scan at a time: issuing a new search cancels the
//! previous one before the new scan starts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use gazette_core::{Article, Error};

use crate::store::ContentStore;

/// Queries shorter than this (after trimming) reset to idle instead of
/// scanning; single characters would flood the consumer with matches.
const MIN_QUERY_LEN: usize = 2;

/// Tuning for batch emission.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Cadence of the timer-driven flush.
    pub flush_interval: Duration,

    /// Buffer size at which the scan flushes synchronously.
    pub batch_size: usize,

    /// Capacity of the event channel handed to the consumer.
    pub channel_capacity: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { flush_interval: Duration::from_millis(500), batch_size: 20, channel_capacity: 32 }
    }
}

/// Lifecycle of one search, as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// No active search; the query was empty or below the minimum length.
    Idle,
    /// Scan in progress.
    Loading,
    /// Scan finished with zero matches emitted.
    Empty,
    /// Scan finished; matches were emitted.
    Done,
    /// Scan stopped on an unexpected failure.
    Error,
}

/// Events delivered to the search consumer.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    State(SearchState),
    Batch(Vec<Article>),
}

/// Runs at most one cancelable scan at a time against a content store.
pub struct SearchAggregator {
    store: Arc<ContentStore>,
    options: SearchOptions,
    active: StdMutex<CancellationToken>,
}

impl SearchAggregator {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self::with_options(store, SearchOptions::default())
    }

    pub fn with_options(store: Arc<ContentStore>, options: SearchOptions) -> Self {
        Self { store, options, active: StdMutex::new(CancellationToken::new()) }
    }

    /// Start a search, superseding any search still in flight.
    ///
    /// Returns the consumer end of the event stream; the channel closes
    /// after a terminal state. Must be called within a Tokio runtime.
    pub fn search(&self, query: &str) -> mpsc::Receiver<SearchEvent> {
        // Cancel-then-replace: the previous scan stops appending and runs
        // its final flush; only the token installed here may emit onward.
        let token = {
            let mut active = self.active.lock().unwrap();
            active.cancel();
            *active = CancellationToken::new();
            active.clone()
        };

        let (tx, rx) = mpsc::channel(self.options.channel_capacity);
        let query = query.trim().to_string();

        if query.chars().count() < MIN_QUERY_LEN {
            // Fast-path reset, not a search: no scan and no network.
            let _ = tx.try_send(SearchEvent::State(SearchState::Idle));
            return rx;
        }

        let store = self.store.clone();
        let options = self.options.clone();
        tokio::spawn(run_search(store, query, options, token, tx));

        rx
    }

    /// Stop the active search, if any.
    pub fn cancel(&self) {
        self.active.lock().unwrap().cancel();
    }
}

async fn run_search(
    store: Arc<ContentStore>, query: String, options: SearchOptions, token: CancellationToken,
    tx: mpsc::Sender<SearchEvent>,
) {
    let _ = tx.send(SearchEvent::State(SearchState::Loading)).await;

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let emitted = Arc::new(AtomicUsize::new(0));

    let timer = tokio::spawn(flush_timer(
        buffer.clone(),
        tx.clone(),
        emitted.clone(),
        token.clone(),
        options.flush_interval,
    ));

    let outcome = scan(&store, &query, &buffer, &tx, &emitted, &token, options.batch_size).await;

    // Stop the timer before the final flush; it exits without draining, so
    // exactly one flush emits whatever is left.
    token.cancel();
    let _ = timer.await;

    flush(&buffer, &tx, &emitted).await;

    match outcome {
        // Cancellation is a normal termination, never logged as an error.
        Ok(()) | Err(Error::Canceled) => {
            let state = if emitted.load(Ordering::Relaxed) == 0 { SearchState::Empty } else { SearchState::Done };
            let _ = tx.send(SearchEvent::State(state)).await;
        }
        Err(err) => {
            tracing::error!("search for {:?} failed: {}", query, err);
            let _ = tx.send(SearchEvent::State(SearchState::Error)).await;
        }
    }
}

/// Walk editions in index order, buffering matches.
///
/// The token is checked before each fetch and before each append; a fetch
/// already in flight is allowed to finish and its matches are discarded at
/// the next checkpoint. Returns `Error::Canceled` on cancellation, which
/// the caller treats as a normal termination.
async fn scan(
    store: &ContentStore, query: &str, buffer: &Mutex<Vec<Article>>, tx: &mpsc::Sender<SearchEvent>,
    emitted: &AtomicUsize, token: &CancellationToken, batch_size: usize,
) -> Result<(), Error> {
    let ids = store.get_edition_ids(false).await?;

    for id in ids {
        if token.is_cancelled() {
            return Err(Error::Canceled);
        }

        let Some(edition) = store.get_edition(&id, false).await? else {
            continue;
        };

        for article in edition.articles {
            if !article.matches(query) {
                continue;
            }
            if token.is_cancelled() {
                return Err(Error::Canceled);
            }

            let full = {
                let mut buf = buffer.lock().await;
                buf.push(article);
                buf.len() >= batch_size
            };
            if full {
                flush(buffer, tx, emitted).await;
            }
        }
    }

    Ok(())
}

/// Periodic drain of the shared buffer, one batch per tick.
async fn flush_timer(
    buffer: Arc<Mutex<Vec<Article>>>, tx: mpsc::Sender<SearchEvent>, emitted: Arc<AtomicUsize>,
    token: CancellationToken, interval: Duration,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => flush(&buffer, &tx, &emitted).await,
        }
    }
}

/// Drain the buffer and emit its contents as one batch.
///
/// The lock is held across the send: a flush can never observe a partial
/// append, and concurrent flushes cannot reorder batches.
async fn flush(buffer: &Mutex<Vec<Article>>, tx: &mpsc::Sender<SearchEvent>, emitted: &AtomicUsize) {
    let mut buf = buffer.lock().await;
    if buf.is_empty() {
        return;
    }
    let batch = std::mem::take(&mut *buf);
    emitted.fetch_add(batch.len(), Ordering::Relaxed);
    let _ = tx.send(SearchEvent::Batch(batch)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestStore, edition_json, index_json, test_store};

    /// Three editions, most-recent first, with 2, 0, and 3 articles
    /// mentioning "tokio" respectively.
    async fn seeded() -> TestStore {
        let t = test_store().await;
        t.fetcher
            .respond("index.json", index_json(&[("E3", 300), ("E2", 200), ("E1", 100)]));
        t.fetcher.respond(
            "E3.json",
            edition_json("E3", 300, &[
                ("a1", "Tokio graceful shutdown", "notes"),
                ("a2", "Serde tricks", "about tokio too"),
                ("a3", "Unrelated", "nothing here"),
            ]),
        );
        t.fetcher.respond("E2.json", edition_json("E2", 200, &[("b1", "CLI design", "clap")]));
        t.fetcher.respond(
            "E1.json",
            edition_json("E1", 100, &[
                ("c1", "tokio timers", "interval"),
                ("c2", "More Tokio", "channels"),
                ("c3", "Tokio again", "select"),
            ]),
        );
        t
    }

    async fn collect(mut rx: mpsc::Receiver<SearchEvent>) -> Vec<SearchEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn batch_sizes(events: &[SearchEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                SearchEvent::Batch(batch) => Some(batch.len()),
                _ => None,
            })
            .collect()
    }

    fn terminal(events: &[SearchEvent]) -> SearchState {
        match events.last() {
            Some(SearchEvent::State(state)) => *state,
            other => panic!("expected terminal state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_query_resets_to_idle() {
        let t = seeded().await;
        let aggregator = SearchAggregator::new(t.store.clone());

        let events = collect(aggregator.search("")).await;

        assert!(matches!(events.as_slice(), [SearchEvent::State(SearchState::Idle)]));
        assert!(t.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_single_character_query_is_not_searched() {
        let t = seeded().await;
        let aggregator = SearchAggregator::new(t.store.clone());

        let events = collect(aggregator.search("a")).await;

        assert!(matches!(events.as_slice(), [SearchEvent::State(SearchState::Idle)]));
        assert!(t.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fast_scan_emits_one_batch_then_done() {
        let t = seeded().await;
        let aggregator = SearchAggregator::new(t.store.clone());

        let events = collect(aggregator.search("tokio")).await;

        assert!(matches!(events.first(), Some(SearchEvent::State(SearchState::Loading))));
        assert_eq!(batch_sizes(&events), vec![5]);
        assert_eq!(terminal(&events), SearchState::Done);

        // Discovery order: edition order from the index, article order within.
        let SearchEvent::Batch(batch) = &events[1] else { panic!("expected batch") };
        let ids: Vec<_> = batch.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn test_no_matches_ends_empty() {
        let t = seeded().await;
        let aggregator = SearchAggregator::new(t.store.clone());

        let events = collect(aggregator.search("zig")).await;

        assert_eq!(batch_sizes(&events), Vec::<usize>::new());
        assert_eq!(terminal(&events), SearchState::Empty);
    }

    #[tokio::test]
    async fn test_count_driven_flush_at_threshold() {
        let t = test_store().await;
        let articles: Vec<(String, String, String)> = (0..25)
            .map(|i| (format!("a{}", i), format!("rust item {}", i), String::new()))
            .collect();
        let article_refs: Vec<(&str, &str, &str)> = articles
            .iter()
            .map(|(id, title, body)| (id.as_str(), title.as_str(), body.as_str()))
            .collect();
        t.fetcher.respond("index.json", index_json(&[("E1", 100)]));
        t.fetcher.respond("E1.json", edition_json("E1", 100, &article_refs));

        // Timer far in the future: only count-driven flushes can happen
        // before the final one.
        let options = SearchOptions { flush_interval: Duration::from_secs(600), ..Default::default() };
        let aggregator = SearchAggregator::with_options(t.store.clone(), options);

        let events = collect(aggregator.search("rust")).await;

        assert_eq!(batch_sizes(&events), vec![20, 5]);
        assert_eq!(terminal(&events), SearchState::Done);
    }

    #[tokio::test]
    async fn test_timer_flush_drains_while_scan_continues() {
        let t = seeded().await;
        // Each fetch takes 300ms against a 500ms flush cadence: E3's two
        // matches are buffered at ~600ms and the 1000ms tick drains them
        // while E1 is still being fetched; E1's three matches arrive in the
        // final flush.
        t.fetcher.set_delay(Duration::from_millis(300));
        let aggregator = SearchAggregator::new(t.store.clone());

        let events = collect(aggregator.search("tokio")).await;

        assert_eq!(batch_sizes(&events), vec![2, 3]);
        assert_eq!(terminal(&events), SearchState::Done);
    }

    #[tokio::test]
    async fn test_cancel_mid_scan_flushes_once_and_stops() {
        let t = seeded().await;
        t.fetcher.gate("E2.json");
        let aggregator = SearchAggregator::new(t.store.clone());

        let mut rx = aggregator.search("tokio");
        assert!(matches!(rx.recv().await, Some(SearchEvent::State(SearchState::Loading))));

        // Wait until the scan has buffered E3's matches and is parked on E2.
        while t.fetcher.call_count("E2.json") == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        aggregator.cancel();
        t.fetcher.open_gate("E2.json");

        let events = collect(rx).await;
        // Exactly one final flush with the two matches that had accumulated;
        // E1 was never fetched.
        assert_eq!(batch_sizes(&events), vec![2]);
        assert_eq!(terminal(&events), SearchState::Done);
        assert_eq!(t.fetcher.call_count("E1.json"), 0);
    }

    #[tokio::test]
    async fn test_new_search_supersedes_previous() {
        let t = seeded().await;
        t.fetcher.gate("E2.json");
        let aggregator = SearchAggregator::new(t.store.clone());

        let first = aggregator.search("tokio");
        while t.fetcher.call_count("E2.json") == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // Starting the next search cancels the parked one, then the gate
        // opens for both.
        let second = aggregator.search("clap");
        t.fetcher.open_gate("E2.json");

        // The superseded search stops at its checkpoint: one final flush
        // with E3's matches, nothing from E1.
        let first_events = collect(first).await;
        assert_eq!(batch_sizes(&first_events), vec![2]);
        assert_eq!(terminal(&first_events), SearchState::Done);

        let second_events = collect(second).await;
        assert_eq!(batch_sizes(&second_events), vec![1]);
        assert_eq!(terminal(&second_events), SearchState::Done);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_error_state() {
        let t = test_store().await;
        t.fetcher.fail("index.json", "connection reset");
        let aggregator = SearchAggregator::new(t.store.clone());

        let events = collect(aggregator.search("tokio")).await;

        assert!(matches!(events.first(), Some(SearchEvent::State(SearchState::Loading))));
        assert_eq!(terminal(&events), SearchState::Error);
    }
}
