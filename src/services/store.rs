//! Report document store with a standing snapshot watch.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;

use super::BoxFuture;
use crate::db::{CollectionSnapshot, Repository};
use crate::errors::AppError;
use crate::models::{LatLng, NewReport, ReportDocument};

/// The complete current contents of the report collection.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub revision: i64,
    pub documents: Arc<Vec<ReportDocument>>,
}

impl From<CollectionSnapshot> for Snapshot {
    fn from(snapshot: CollectionSnapshot) -> Self {
        Self {
            revision: snapshot.revision_id,
            documents: Arc::new(snapshot.documents),
        }
    }
}

/// The remote report collection: create plus a continuous snapshot watch.
///
/// The receiver returned by `watch` always holds the latest full snapshot;
/// intermediate snapshots may be skipped, the newest one is never lost.
pub trait ReportStore: Send + Sync {
    /// Add a document; resolves to the id assigned by the store.
    fn create(&self, report: NewReport) -> BoxFuture<'_, Result<String, AppError>>;

    fn watch(&self) -> BoxFuture<'_, Result<watch::Receiver<Snapshot>, AppError>>;
}

/// Demo sightings inserted into an empty collection on request.
const DEMO_REPORTS: &[(f64, f64, u32)] = &[
    (12.9177, 77.6238, 189), // Silk Board
    (12.9352, 77.6245, 67),  // Koramangala
];

/// SQLite-backed store. Each successful write republishes the collection.
pub struct SqliteReportStore {
    repo: Repository,
    collection: String,
    sender: watch::Sender<Snapshot>,
}

impl SqliteReportStore {
    pub async fn open(repo: Repository, collection: impl Into<String>) -> Result<Self, AppError> {
        let collection = collection.into();
        let initial = repo.snapshot(&collection).await?;
        tracing::info!(
            "Report collection '{}' opened with {} documents",
            collection,
            initial.documents.len()
        );
        let (sender, _) = watch::channel(Snapshot::from(initial));

        Ok(Self {
            repo,
            collection,
            sender,
        })
    }

    /// Insert the demo reports if the collection is empty. Returns how many were added.
    pub async fn seed_demo_reports(&self) -> Result<usize, AppError> {
        if self.repo.count_documents(&self.collection).await? > 0 {
            return Ok(0);
        }

        for (lat, lng, verified_count) in DEMO_REPORTS {
            let fields = json!({
                "lat": lat,
                "lng": lng,
                "reporterId": "demo",
                "verifiedCount": verified_count,
            });
            if let serde_json::Value::Object(map) = fields {
                self.repo.insert_document(&self.collection, map).await?;
            }
        }

        self.publish().await?;
        tracing::info!("Seeded {} demo reports", DEMO_REPORTS.len());
        Ok(DEMO_REPORTS.len())
    }

    /// Re-read the collection and publish it unless a newer snapshot already went out.
    async fn publish(&self) -> Result<(), AppError> {
        let next = Snapshot::from(self.repo.snapshot(&self.collection).await?);
        self.sender.send_if_modified(|current| {
            if next.revision > current.revision {
                *current = next;
                true
            } else {
                false
            }
        });
        Ok(())
    }
}

impl ReportStore for SqliteReportStore {
    fn create(&self, report: NewReport) -> BoxFuture<'_, Result<String, AppError>> {
        Box::pin(async move {
            LatLng::new(report.lat, report.lng)?;

            let doc = self
                .repo
                .insert_document(&self.collection, report.into_fields())
                .await?;
            tracing::debug!("Report {} written to '{}'", doc.id, self.collection);

            if let Err(e) = self.publish().await {
                tracing::warn!("Report {} stored but snapshot publish failed: {}", doc.id, e);
            }
            Ok(doc.id)
        })
    }

    fn watch(&self) -> BoxFuture<'_, Result<watch::Receiver<Snapshot>, AppError>> {
        Box::pin(async move { Ok(self.sender.subscribe()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::UserId;
    use tempfile::TempDir;

    async fn store() -> (SqliteReportStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        let store = SqliteReportStore::open(Repository::new(pool), "reports")
            .await
            .unwrap();
        (store, temp_dir)
    }

    fn new_report(lat: f64, lng: f64) -> NewReport {
        NewReport::new(LatLng::new(lat, lng).unwrap(), &UserId::new("u1"))
    }

    #[tokio::test]
    async fn test_create_publishes_full_snapshot() {
        let (store, _dir) = store().await;
        let mut rx = store.watch().await.unwrap();
        assert!(rx.borrow_and_update().documents.is_empty());

        let id = store.create(new_report(12.9, 77.6)).await.unwrap();

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.documents.len(), 1);
        assert_eq!(snapshot.documents[0].id, id);
        assert_eq!(snapshot.documents[0].fields["verifiedCount"], 1);
        assert!(snapshot.revision > 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_current_state() {
        let (store, _dir) = store().await;
        store.create(new_report(1.0, 1.0)).await.unwrap();
        store.create(new_report(1.0, 1.0)).await.unwrap();

        let rx = store.watch().await.unwrap();
        assert_eq!(rx.borrow().documents.len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range() {
        let (store, _dir) = store().await;
        let mut report = new_report(1.0, 1.0);
        report.lat = 120.0;
        assert!(matches!(
            store.create(report).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_demo_reports_only_when_empty() {
        let (store, _dir) = store().await;
        assert_eq!(store.seed_demo_reports().await.unwrap(), 2);
        assert_eq!(store.seed_demo_reports().await.unwrap(), 0);

        let rx = store.watch().await.unwrap();
        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.documents.len(), 2);
        assert!(snapshot
            .documents
            .iter()
            .any(|doc| doc.fields["verifiedCount"] == 189));
    }
}
