//! In-memory results sink and progress reporting
//!
//! The sink is single-writer: only the owning dispatcher appends. Readers
//! take snapshots of the record list or subscribe to the progress channel.

use std::sync::RwLock;
use tokio::sync::watch;
use verity_domain::FactCheckRecord;

/// Dispatch progress, updated after each completed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Claims resolved so far (success or failure)
    pub completed: usize,

    /// Total claims in the current cycle
    pub total: usize,
}

/// Session-scoped store of completed verification records
pub struct ResultsSink {
    records: RwLock<Vec<FactCheckRecord>>,
    progress_tx: watch::Sender<Progress>,
}

impl ResultsSink {
    /// Create an empty sink
    pub fn new() -> Self {
        let (progress_tx, _) = watch::channel(Progress::default());
        Self {
            records: RwLock::new(Vec::new()),
            progress_tx,
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress_tx.subscribe()
    }

    /// Start a new cycle: clear records and reset progress to 0/total
    pub fn begin_cycle(&self, total: usize) {
        self.records.write().unwrap().clear();
        let _ = self.progress_tx.send(Progress {
            completed: 0,
            total,
        });
    }

    /// Append a completed record
    pub fn push(&self, record: FactCheckRecord) {
        self.records.write().unwrap().push(record);
    }

    /// Publish progress after a batch completes
    pub fn report_progress(&self, completed: usize, total: usize) {
        let _ = self.progress_tx.send(Progress { completed, total });
    }

    /// Snapshot of all records, in append (completion) order
    pub fn records(&self) -> Vec<FactCheckRecord> {
        self.records.read().unwrap().clone()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Whether the sink holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all records and reset progress
    pub fn reset(&self) {
        self.records.write().unwrap().clear();
        let _ = self.progress_tx.send(Progress::default());
    }
}

impl Default for ResultsSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_domain::SessionId;

    #[test]
    fn test_push_and_snapshot() {
        let sink = ResultsSink::new();
        assert!(sink.is_empty());

        sink.push(FactCheckRecord::failed(
            "claim",
            "boom",
            None,
            SessionId::new(),
        ));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].claim, "claim");
    }

    #[test]
    fn test_begin_cycle_clears_previous_records() {
        let sink = ResultsSink::new();
        sink.push(FactCheckRecord::failed("old", "x", None, SessionId::new()));

        sink.begin_cycle(4);
        assert!(sink.is_empty());
        assert_eq!(
            *sink.subscribe().borrow(),
            Progress {
                completed: 0,
                total: 4
            }
        );
    }

    #[tokio::test]
    async fn test_progress_updates_observed() {
        let sink = ResultsSink::new();
        let mut rx = sink.subscribe();

        sink.begin_cycle(6);
        sink.report_progress(3, 6);

        rx.changed().await.unwrap();
        let progress = *rx.borrow();
        assert_eq!(progress.completed, 3);
        assert_eq!(progress.total, 6);
    }

    #[test]
    fn test_reset() {
        let sink = ResultsSink::new();
        sink.begin_cycle(2);
        sink.push(FactCheckRecord::failed("c", "e", None, SessionId::new()));

        sink.reset();
        assert!(sink.is_empty());
        assert_eq!(*sink.subscribe().borrow(), Progress::default());
    }
}
