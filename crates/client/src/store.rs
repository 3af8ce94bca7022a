//! Content store: cache-first document reads with staleness reconciliation.
//!
//! The index is the single source of truth for "has this content changed".
//! It is cached on a short TTL and refreshed when it lapses; editions are
//! cached for a very long time and judged stale only by comparing their
//! version stamp against the current index. A refresh that fails falls back
//! to whatever is cached: stale data beats no data.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use gazette_core::{AppConfig, Article, CacheDb, Edition, Error, Index, document};

use crate::connectivity::Connectivity;
use crate::fetch::RemoteFetcher;
use crate::saved::SavedArticleStore;
use crate::telemetry::Telemetry;

const INDEX_RESOURCE: &str = "index.json";

fn edition_resource(id: &str) -> String {
    format!("{}.json", id)
}

/// Cache-first access to the edition feed.
pub struct ContentStore {
    db: CacheDb,
    fetcher: Arc<dyn RemoteFetcher>,
    connectivity: Arc<dyn Connectivity>,
    telemetry: Arc<dyn Telemetry>,
    saved: SavedArticleStore,
    index_ttl_secs: i64,
    edition_ttl_secs: i64,

    /// Per-key refresh coalescing: concurrent refreshes of one resource
    /// queue behind a single fetch instead of each hitting the network.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ContentStore {
    pub fn new(
        db: CacheDb, fetcher: Arc<dyn RemoteFetcher>, connectivity: Arc<dyn Connectivity>,
        telemetry: Arc<dyn Telemetry>, config: &AppConfig,
    ) -> Self {
        let saved = SavedArticleStore::new(db.clone());
        Self {
            db,
            fetcher,
            connectivity,
            telemetry,
            saved,
            index_ttl_secs: config.index_ttl_secs,
            edition_ttl_secs: config.edition_ttl_secs,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// The current index.
    ///
    /// Served from cache while its TTL holds and `force_refresh` is false;
    /// otherwise refreshed over the network when connectivity allows. A
    /// failed refresh falls back to the last cached index regardless of
    /// expiry; `Error::Unavailable` only when nothing was ever cached.
    pub async fn get_index(&self, force_refresh: bool) -> Result<Index, Error> {
        let cached = self.cached_index().await?;

        if !force_refresh
            && let Some((index, false)) = &cached
        {
            return Ok(index.clone());
        }

        if !self.connectivity.has_internet() {
            return cached.map(|(index, _)| index).ok_or(Error::Unavailable);
        }

        let lock = self.refresh_lock(INDEX_RESOURCE).await;
        let _guard = lock.lock().await;

        // A refresh may have landed while we waited for the lock.
        if !force_refresh
            && let Some((index, false)) = self.cached_index().await?
        {
            return Ok(index);
        }

        match self.fetch_index().await {
            Ok(index) => Ok(index),
            Err(err) => {
                tracing::error!("index refresh failed: {}", err);
                self.telemetry.track_error(&err, &[("resource", INDEX_RESOURCE)]);
                match cached {
                    Some((index, _)) => {
                        tracing::warn!("serving stale cached index after failed refresh");
                        Ok(index)
                    }
                    None => Err(Error::Unavailable),
                }
            }
        }
    }

    /// Edition ids in publish order, most-recent first.
    pub async fn get_edition_ids(&self, force_refresh: bool) -> Result<Vec<String>, Error> {
        Ok(self.get_index(force_refresh).await?.edition_ids())
    }

    /// An edition by id, served from cache when its version stamp agrees
    /// with the current index.
    ///
    /// Stale or missing editions are refreshed when connectivity allows; a
    /// failed refresh keeps the stale candidate. Every returned article has
    /// `is_saved` recomputed against the saved-article collection. `None`
    /// when nothing was ever cached and the fetch failed or was skipped.
    pub async fn get_edition(&self, id: &str, force_refresh: bool) -> Result<Option<Edition>, Error> {
        let resource = edition_resource(id);
        let mut candidate = self.cached_edition(&resource).await?;

        let stale = match &candidate {
            Some(edition) => !self.edition_up_to_date(edition).await,
            None => true,
        };

        if (stale || force_refresh) && self.connectivity.has_internet() {
            let lock = self.refresh_lock(&resource).await;
            let _guard = lock.lock().await;

            // Re-read after waiting: a concurrent caller may have already
            // replaced this entry with an up-to-date copy.
            let refreshed = self.cached_edition(&resource).await?;
            let coalesced = match &refreshed {
                Some(edition) if !force_refresh => self.edition_up_to_date(edition).await,
                _ => false,
            };

            if coalesced {
                candidate = refreshed;
            } else {
                match self.fetch_edition(&resource).await {
                    Ok(edition) => candidate = Some(edition),
                    Err(err) => {
                        tracing::error!("edition {} refresh failed: {}", id, err);
                        self.telemetry.track_error(&err, &[("resource", &resource)]);
                        if candidate.is_some() {
                            tracing::warn!("serving stale cached edition {} after failed refresh", id);
                        }
                    }
                }
            }
        }

        if let Some(edition) = &mut candidate {
            let saved_ids = self.saved.saved_ids().await?;
            document::annotate_saved(edition, &saved_ids);
        }

        Ok(candidate)
    }

    /// Whether a newer edition than the cached leader has been published.
    ///
    /// Compares only the leading entry id of the cached index against a
    /// force-refreshed one; changes further down the list are not detected.
    /// Returns `false` when no index was ever cached: nothing to compare
    /// against is not a failure.
    pub async fn preload_next_edition(&self) -> Result<bool, Error> {
        let Some((cached, _)) = self.cached_index().await? else {
            return Ok(false);
        };

        let refreshed = self.get_index(true).await?;
        Ok(cached.leading_id() != refreshed.leading_id())
    }

    /// An article by id within an edition.
    pub async fn get_article(&self, edition_id: &str, article_id: &str) -> Result<Option<Article>, Error> {
        let Some(edition) = self.get_edition(edition_id, false).await? else {
            return Ok(None);
        };
        Ok(edition.articles.into_iter().find(|a| a.id == article_id))
    }

    /// All bookmarked articles.
    pub async fn saved_articles(&self) -> Result<Vec<Article>, Error> {
        self.saved.list().await
    }

    /// Add an article to the saved collection.
    pub async fn bookmark_article(&self, article: &Article) -> Result<(), Error> {
        self.saved.add(article).await
    }

    /// Remove an article from the saved collection.
    pub async fn unbookmark_article(&self, article_id: &str) -> Result<(), Error> {
        self.saved.remove(article_id).await
    }

    /// The backing cache, for maintenance operations.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    async fn edition_up_to_date(&self, edition: &Edition) -> bool {
        match self.get_index(false).await {
            Ok(index) => edition.is_up_to_date(&index),
            Err(err) => {
                // No index to reconcile against: treat as stale so a refresh
                // is attempted; the fallback path still serves the cached copy.
                tracing::debug!("index unavailable while checking edition {}: {}", edition.id, err);
                false
            }
        }
    }

    async fn fetch_index(&self) -> Result<Index, Error> {
        let bytes = self.fetcher.fetch(INDEX_RESOURCE).await?;
        let mut index = document::decode_index(&bytes)?;
        index.fetched_at = Some(Utc::now());

        let body = document::encode_index(&index)?;
        self.db.put_document(INDEX_RESOURCE, &body, self.index_ttl_secs).await?;
        Ok(index)
    }

    async fn fetch_edition(&self, resource: &str) -> Result<Edition, Error> {
        let bytes = self.fetcher.fetch(resource).await?;
        let edition = document::decode_edition(&bytes)?;

        self.db.put_document(resource, &bytes, self.edition_ttl_secs).await?;
        Ok(edition)
    }

    async fn cached_index(&self) -> Result<Option<(Index, bool)>, Error> {
        let Some(doc) = self.db.get_document(INDEX_RESOURCE).await? else {
            return Ok(None);
        };
        match document::decode_index(&doc.body) {
            Ok(index) => Ok(Some((index, doc.is_expired()))),
            Err(err) => {
                // A corrupt entry is a miss; the refresh path repopulates it.
                tracing::warn!("discarding undecodable cached index: {}", err);
                Ok(None)
            }
        }
    }

    async fn cached_edition(&self, resource: &str) -> Result<Option<Edition>, Error> {
        let Some(doc) = self.db.get_document(resource).await? else {
            return Ok(None);
        };
        match document::decode_edition(&doc.body) {
            Ok(edition) => Ok(Some(edition)),
            Err(err) => {
                tracing::warn!("discarding undecodable cached edition {}: {}", resource, err);
                Ok(None)
            }
        }
    }

    async fn refresh_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        inflight.entry(key.to_string()).or_default().clone()
    }
}
