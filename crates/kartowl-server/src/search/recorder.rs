use kartowl_core::Product;
use kartowl_db::{HistoryStore, PriceObservation};
use tokio::task::JoinHandle;

/// Writes price observations in the background after a search.
///
/// Each product is appended by its own detached task. A failed append is
/// logged and goes no further; the search response never waits on these.
#[derive(Clone)]
pub struct HistoryRecorder {
    store: HistoryStore,
}

impl HistoryRecorder {
    #[must_use]
    pub fn new(store: HistoryStore) -> Self {
        Self { store }
    }

    /// Spawns one append per product. Dropping the returned batch detaches
    /// the tasks; they still run to completion.
    pub fn record(&self, products: &[Product]) -> RecordBatch {
        let handles = products
            .iter()
            .map(|product| {
                let store = self.store.clone();
                let observation = PriceObservation::from(product);
                tokio::spawn(async move {
                    if let Err(e) = store.append(&observation).await {
                        tracing::error!(
                            marketplace = %observation.marketplace,
                            url = %observation.product_url,
                            error = %e,
                            "failed to record price observation"
                        );
                    }
                })
            })
            .collect();
        RecordBatch { handles }
    }
}

/// Handles to the appends spawned by one [`HistoryRecorder::record`] call.
pub struct RecordBatch {
    handles: Vec<JoinHandle<()>>,
}

impl RecordBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every append in the batch to finish.
    #[cfg(test)]
    pub(crate) async fn wait(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "history append task panicked");
            }
        }
    }
}
