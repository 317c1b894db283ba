//! Live report feed: keeps the session's report list equal to the latest store snapshot.

use std::sync::Weak;

use tokio::task::JoinHandle;

use crate::errors::AppError;
use crate::models::Report;
use crate::services::{BoxFuture, ReportStore, Snapshot};
use crate::session::SessionState;

/// Replace the report list with the snapshot contents.
pub fn apply_snapshot(session: &mut SessionState, snapshot: &Snapshot) {
    session.reports = snapshot.documents.iter().map(Report::from_document).collect();
    session.feed_revision = snapshot.revision;
}

/// Receiver of snapshots delivered by a subscription.
pub trait SnapshotSink: Send + Sync {
    fn on_snapshot(&self, snapshot: Snapshot) -> BoxFuture<'_, ()>;
}

/// Running feed watch. Cancelled explicitly or on drop.
pub struct FeedSubscription {
    task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Report feed subscription cancelled");
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start delivering snapshots to `sink`, beginning with the current one.
///
/// The loop ends when the sink is gone, the store closes the watch or the
/// subscription is cancelled.
pub async fn subscribe(
    store: &dyn ReportStore,
    sink: Weak<dyn SnapshotSink>,
) -> Result<FeedSubscription, AppError> {
    let mut rx = store.watch().await?;

    let task = tokio::spawn(async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            let Some(target) = sink.upgrade() else {
                break;
            };
            target.on_snapshot(snapshot).await;
            drop(target);

            if rx.changed().await.is_err() {
                tracing::debug!("Report store closed the snapshot watch");
                break;
            }
        }
    });

    Ok(FeedSubscription { task: Some(task) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::json;

    use crate::models::{LatLng, ReportDocument};
    use crate::testing::RecordingStore;

    #[derive(Default)]
    struct Collect {
        revisions: Mutex<Vec<i64>>,
    }

    impl SnapshotSink for Collect {
        fn on_snapshot(&self, snapshot: Snapshot) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                self.revisions.lock().unwrap().push(snapshot.revision);
            })
        }
    }

    fn document(id: &str, fields: serde_json::Value) -> ReportDocument {
        ReportDocument {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    fn weak_sink(sink: &Arc<Collect>) -> Weak<dyn SnapshotSink> {
        let weak: Weak<Collect> = Arc::downgrade(sink);
        weak
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[test]
    fn test_apply_snapshot_replaces_wholesale() {
        let mut session = SessionState::new(LatLng::new(0.0, 0.0).unwrap());
        let first = Snapshot {
            revision: 1,
            documents: Arc::new(vec![
                document("a", json!({ "lat": 1.0, "lng": 2.0, "verifiedCount": 3 })),
                document("b", json!({ "lat": 1.0, "lng": 2.0 })),
            ]),
        };
        apply_snapshot(&mut session, &first);
        assert_eq!(session.reports.len(), 2);
        assert_eq!(session.reports[0].verified_count, 3);
        assert_eq!(session.reports[1].verified_count, 0);

        let second = Snapshot {
            revision: 2,
            documents: Arc::new(vec![document("c", json!({ "lat": "x" }))]),
        };
        apply_snapshot(&mut session, &second);
        assert_eq!(session.reports.len(), 1);
        assert_eq!(session.reports[0].id, "c");
        assert_eq!(session.reports[0].lat, 0.0);
        assert_eq!(session.feed_revision, 2);
    }

    #[tokio::test]
    async fn test_delivers_initial_and_later_snapshots() {
        let store = RecordingStore::new();
        let sink = Arc::new(Collect::default());
        let weak = weak_sink(&sink);

        let _subscription = subscribe(&store, weak).await.unwrap();
        settle().await;
        store.publish(vec![document("a", json!({ "lat": 1.0, "lng": 1.0 }))]);
        settle().await;

        let revisions = sink.revisions.lock().unwrap().clone();
        assert_eq!(revisions.first(), Some(&0));
        assert_eq!(revisions.last(), Some(&1));
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let store = RecordingStore::new();
        let sink = Arc::new(Collect::default());
        let weak = weak_sink(&sink);

        let mut subscription = subscribe(&store, weak).await.unwrap();
        settle().await;
        subscription.cancel();
        store.publish(Vec::new());
        settle().await;

        assert_eq!(*sink.revisions.lock().unwrap(), vec![0]);
    }
}
