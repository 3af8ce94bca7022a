//! Persistence for bookmarked articles.
//!
//! The saved list lives in the same backing store as fetched documents,
//! under a reserved key with a long expiry. It is canonical state of its
//! own: the `is_saved` flag on articles returned by the content store is
//! recomputed from this collection on every read, never cached.

use std::collections::HashSet;

use gazette_core::{Article, CacheDb, Error, SavedArticleList, document};

const SAVED_KEY: &str = "saved-articles.json";

/// How long the saved list may sit untouched before a purge could drop it.
const SAVED_TTL_SECS: i64 = 60 * 60 * 24 * 999;

/// Store for the user's bookmarked articles.
#[derive(Clone)]
pub struct SavedArticleStore {
    db: CacheDb,
}

impl SavedArticleStore {
    pub fn new(db: CacheDb) -> Self {
        Self { db }
    }

    /// All saved articles, flagged as saved.
    pub async fn list(&self) -> Result<Vec<Article>, Error> {
        let mut saved = self.load().await?;
        for article in &mut saved.articles {
            article.is_saved = true;
        }
        Ok(saved.articles)
    }

    /// Ids of all saved articles, for membership tests.
    pub async fn saved_ids(&self) -> Result<HashSet<String>, Error> {
        Ok(self.load().await?.ids())
    }

    /// Add an article to the saved list, replacing any previous copy.
    pub async fn add(&self, article: &Article) -> Result<(), Error> {
        let mut saved = self.load().await?;
        saved.add(article.clone());
        self.persist(&saved).await
    }

    /// Remove an article from the saved list by id.
    pub async fn remove(&self, article_id: &str) -> Result<(), Error> {
        let mut saved = self.load().await?;
        saved.remove(article_id);
        self.persist(&saved).await
    }

    async fn load(&self) -> Result<SavedArticleList, Error> {
        match self.db.get_document(SAVED_KEY).await? {
            Some(doc) => document::decode_saved(&doc.body),
            None => Ok(SavedArticleList::default()),
        }
    }

    async fn persist(&self, saved: &SavedArticleList) -> Result<(), Error> {
        let body = document::encode_saved(saved)?;
        self.db.put_document(SAVED_KEY, &body, SAVED_TTL_SECS).await
    }
}
