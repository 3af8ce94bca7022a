//! Document model for the edition feed, plus its JSON codec.
//!
//! The remote content repository publishes two document kinds: an index
//! (`index.json`, an ordered manifest of known editions with version stamps)
//! and one edition document per id (`{editionId}.json`). The camelCase field
//! names below are the de facto wire format and round-trip losslessly.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One edition's version as known to the index. Immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

/// Ordered manifest of known editions, most-recent first.
///
/// Entry order is semantically meaningful: the leading entry is the latest
/// published edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub entries: Vec<IndexEntry>,

    /// When this index document itself was retrieved. Stamped by the store
    /// at fetch time; not part of the remote document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Index {
    /// Look up an entry by edition id.
    pub fn entry(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Id of the most recently published edition, if any.
    pub fn leading_id(&self) -> Option<&str> {
        self.entries.first().map(|e| e.id.as_str())
    }

    /// Edition ids in publish order, most-recent first.
    pub fn edition_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }
}

/// A single article within an edition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub edition_id: String,
    pub title: String,
    pub body: String,

    /// Read-time projection against the saved-article collection. Never
    /// serialized, so it cannot leak into a cached document.
    #[serde(default, skip_serializing)]
    pub is_saved: bool,
}

impl Article {
    /// Case-insensitive substring match against title and body.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.body.to_lowercase().contains(&query)
    }
}

/// A versioned document containing an ordered list of articles.
///
/// Considered immutable once published; `updated_at` is the version stamp
/// compared against the index's corresponding entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edition {
    pub id: String,
    pub updated_at: DateTime<Utc>,
    pub articles: Vec<Article>,
}

impl Edition {
    /// Whether this cached edition agrees with the given index.
    ///
    /// Up to date iff the index holds an entry with this id and an equal
    /// version stamp. Absence from the index counts as stale.
    pub fn is_up_to_date(&self, index: &Index) -> bool {
        index.entry(&self.id).is_some_and(|entry| entry.updated_at == self.updated_at)
    }
}

/// Independently persisted collection of bookmarked articles, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArticleList {
    pub articles: Vec<Article>,
}

impl SavedArticleList {
    pub fn ids(&self) -> HashSet<String> {
        self.articles.iter().map(|a| a.id.clone()).collect()
    }

    /// Insert or replace by article id.
    pub fn add(&mut self, article: Article) {
        self.remove(&article.id);
        self.articles.push(article);
    }

    pub fn remove(&mut self, article_id: &str) {
        self.articles.retain(|a| a.id != article_id);
    }
}

/// Annotate every article's `is_saved` flag by membership in `saved_ids`.
///
/// A read-time projection applied after cache retrieval; the cached bytes
/// stay free of this derived state.
pub fn annotate_saved(edition: &mut Edition, saved_ids: &HashSet<String>) {
    for article in &mut edition.articles {
        article.is_saved = saved_ids.contains(&article.id);
    }
}

/// Decode a raw `index.json` payload.
pub fn decode_index(bytes: &[u8]) -> Result<Index, Error> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode an index for caching, preserving the `fetched_at` stamp.
pub fn encode_index(index: &Index) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(index)?)
}

/// Decode a raw `{editionId}.json` payload.
pub fn decode_edition(bytes: &[u8]) -> Result<Edition, Error> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode the persisted saved-article collection.
pub fn decode_saved(bytes: &[u8]) -> Result<SavedArticleList, Error> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode the saved-article collection for persistence.
pub fn encode_saved(saved: &SavedArticleList) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(saved)?)
}
