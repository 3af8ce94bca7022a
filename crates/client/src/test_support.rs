//! Scripted collaborators and fixtures shared by store and search tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tokio::sync::Notify;

use gazette_core::{AppConfig, CacheDb, Error};

use crate::connectivity::Connectivity;
use crate::fetch::RemoteFetcher;
use crate::store::ContentStore;
use crate::telemetry::Telemetry;

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Remote index document as raw bytes: `(id, updated_at seconds)` per entry.
pub fn index_json(entries: &[(&str, i64)]) -> Vec<u8> {
    let entries: Vec<_> = entries
        .iter()
        .map(|(id, secs)| json!({"id": id, "updatedAt": ts(*secs)}))
        .collect();
    serde_json::to_vec(&json!({"entries": entries})).unwrap()
}

/// Remote edition document as raw bytes: `(id, title, body)` per article.
pub fn edition_json(id: &str, updated_secs: i64, articles: &[(&str, &str, &str)]) -> Vec<u8> {
    let articles: Vec<_> = articles
        .iter()
        .map(|(aid, title, body)| json!({"id": aid, "editionId": id, "title": title, "body": body}))
        .collect();
    serde_json::to_vec(&json!({"id": id, "updatedAt": ts(updated_secs), "articles": articles})).unwrap()
}

/// Scripted [`RemoteFetcher`]: canned responses per resource name, call
/// recording, optional latency, optional per-resource gates.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Result<Vec<u8>, String>>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, resource: &str, body: Vec<u8>) {
        self.responses.lock().unwrap().insert(resource.to_string(), Ok(body));
    }

    pub fn fail(&self, resource: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(resource.to_string(), Err(message.to_string()));
    }

    /// Latency applied to every fetch, via `tokio::time::sleep`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Block fetches of `resource` until [`MockFetcher::open_gate`].
    pub fn gate(&self, resource: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(resource.to_string(), Arc::new(Notify::new()));
    }

    pub fn open_gate(&self, resource: &str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(resource) {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, resource: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| *r == resource).count()
    }
}

#[async_trait]
impl RemoteFetcher for MockFetcher {
    async fn fetch(&self, resource: &str) -> Result<Bytes, Error> {
        self.calls.lock().unwrap().push(resource.to_string());

        let gate = self.gates.lock().unwrap().get(resource).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().unwrap().get(resource).cloned();
        match response {
            Some(Ok(body)) => Ok(Bytes::from(body)),
            Some(Err(message)) => Err(Error::Network(message)),
            None => Err(Error::Network(format!("status 404 fetching {}", resource))),
        }
    }
}

/// Connectivity source with a switchable answer.
pub struct ScriptedConnectivity {
    online: AtomicBool,
}

impl ScriptedConnectivity {
    pub fn new(online: bool) -> Self {
        Self { online: AtomicBool::new(online) }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for ScriptedConnectivity {
    fn has_internet(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Records tracked errors for assertions.
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<String>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn track_error(&self, error: &Error, tags: &[(&str, &str)]) {
        let tags = tags
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        self.events.lock().unwrap().push(format!("{} [{}]", error, tags));
    }
}

/// A content store wired to scripted collaborators and an in-memory cache.
pub struct TestStore {
    pub store: Arc<ContentStore>,
    pub fetcher: Arc<MockFetcher>,
    pub connectivity: Arc<ScriptedConnectivity>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub db: CacheDb,
}

pub async fn test_store() -> TestStore {
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let connectivity = Arc::new(ScriptedConnectivity::new(true));
    let telemetry = Arc::new(RecordingTelemetry::default());
    let store = Arc::new(ContentStore::new(
        db.clone(),
        fetcher.clone(),
        connectivity.clone(),
        telemetry.clone(),
        &AppConfig::default(),
    ));
    TestStore { store, fetcher, connectivity, telemetry, db }
}
