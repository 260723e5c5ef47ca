//! Catalog Actor
//!
//! Owns the single catalog connection on a dedicated thread and serializes
//! every catalog operation through one channel. Each request is answered
//! over its own oneshot channel.

use crate::catalog::store::{CatalogStats, CatalogStore};
use crate::error::{Error, Result};
use crate::models::{NewPackageVersion, PackageSummary, PackageVersion, VersionEntry};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Message sent to the actor
#[derive(Debug)]
pub enum CatalogMessage {
    Insert {
        record: NewPackageVersion,
        reply: Reply<bool>,
    },
    Search {
        query: String,
        reply: Reply<Vec<PackageSummary>>,
    },
    ListVersions {
        name: String,
        reply: Reply<Vec<VersionEntry>>,
    },
    IncrementDownload {
        name: String,
        version: String,
        reply: Reply<bool>,
    },
    Get {
        name: String,
        version: String,
        reply: Reply<Option<PackageVersion>>,
    },
    Stats {
        reply: Reply<CatalogStats>,
    },
    /// Close the connection and stop the actor
    Shutdown,
}

/// Handle for sending requests to the actor
#[derive(Clone)]
pub struct CatalogHandle {
    tx: mpsc::Sender<CatalogMessage>,
}

impl CatalogHandle {
    async fn request<T>(&self, message: impl FnOnce(Reply<T>) -> CatalogMessage) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(message(reply))
            .await
            .map_err(|_| Error::CatalogUnavailable)?;
        response.await.map_err(|_| Error::CatalogUnavailable)?
    }

    pub async fn insert(&self, record: NewPackageVersion) -> Result<bool> {
        self.request(|reply| CatalogMessage::Insert { record, reply })
            .await
    }

    pub async fn search(&self, query: impl Into<String>) -> Result<Vec<PackageSummary>> {
        let query = query.into();
        self.request(|reply| CatalogMessage::Search { query, reply })
            .await
    }

    pub async fn list_versions(&self, name: impl Into<String>) -> Result<Vec<VersionEntry>> {
        let name = name.into();
        self.request(|reply| CatalogMessage::ListVersions { name, reply })
            .await
    }

    pub async fn increment_download<N, V>(&self, name: N, version: V) -> Result<bool>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let (name, version) = (name.into(), version.into());
        self.request(|reply| CatalogMessage::IncrementDownload {
            name,
            version,
            reply,
        })
        .await
    }

    pub async fn get<N, V>(&self, name: N, version: V) -> Result<Option<PackageVersion>>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let (name, version) = (name.into(), version.into());
        self.request(|reply| CatalogMessage::Get {
            name,
            version,
            reply,
        })
        .await
    }

    pub async fn stats(&self) -> Result<CatalogStats> {
        self.request(|reply| CatalogMessage::Stats { reply }).await
    }

    /// Request graceful shutdown of the actor
    pub async fn shutdown(&self) {
        if let Err(e) = self.tx.send(CatalogMessage::Shutdown).await {
            tracing::warn!(error = %e, "Failed to send shutdown message to catalog actor");
        }
    }
}

/// Catalog actor - the only owner of the catalog connection
pub struct CatalogActor {
    rx: mpsc::Receiver<CatalogMessage>,
    store: CatalogStore,
}

impl CatalogActor {
    /// Channel capacity
    const CHANNEL_CAPACITY: usize = 256;

    /// Create a new actor and its handle
    pub fn new(store: CatalogStore) -> (Self, CatalogHandle) {
        let (tx, rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        (Self { rx, store }, CatalogHandle { tx })
    }

    /// Run the actor loop on a dedicated OS thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("catalog-actor".to_string())
            .spawn(move || self.run())
    }

    /// Run the actor loop on the current thread until shutdown.
    /// Must not be called from inside an async runtime.
    pub fn run(mut self) {
        tracing::info!(ordering = ?self.store.ordering(), "Catalog actor started");

        while let Some(message) = self.rx.blocking_recv() {
            if !self.handle(message) {
                tracing::info!("Catalog actor received shutdown signal");
                break;
            }
        }

        tracing::info!("Catalog actor stopped");
    }

    /// Returns false once the actor should stop
    fn handle(&mut self, message: CatalogMessage) -> bool {
        // A dropped reply receiver means the caller went away; nothing to do.
        match message {
            CatalogMessage::Insert { record, reply } => {
                let result = self.store.insert(&record);
                if let Ok(false) = result {
                    tracing::debug!(
                        package = %record.name,
                        version = %record.version,
                        "Ignored duplicate package version"
                    );
                }
                let _ = reply.send(result);
            }
            CatalogMessage::Search { query, reply } => {
                let _ = reply.send(self.store.search(&query));
            }
            CatalogMessage::ListVersions { name, reply } => {
                let _ = reply.send(self.store.list_versions(&name));
            }
            CatalogMessage::IncrementDownload {
                name,
                version,
                reply,
            } => {
                let _ = reply.send(self.store.increment_download(&name, &version));
            }
            CatalogMessage::Get {
                name,
                version,
                reply,
            } => {
                let _ = reply.send(self.store.get(&name, &version));
            }
            CatalogMessage::Stats { reply } => {
                let _ = reply.send(self.store.stats());
            }
            CatalogMessage::Shutdown => return false,
        }
        true
    }
}
