use std::sync::Arc;

use tracing::{info, warn};

use lesson_core::Clock;
use lesson_core::model::{LessonOutline, ProgressSnapshot, SectionId};
use storage::repository::{SectionProgressStore, StorageError};

use super::verifier::CompletionVerifier;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Sections confirmed remotely and marked complete during this pass.
    pub repaired: Vec<SectionId>,
    /// Sections still incomplete in the snapshot read after repairing.
    pub still_incomplete: Vec<SectionId>,
    pub snapshot: ProgressSnapshot,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.still_incomplete.is_empty()
    }
}

/// Repairs local progress that lags behind the server.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn SectionProgressStore>,
    verifier: CompletionVerifier,
    clock: Clock,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        store: Arc<dyn SectionProgressStore>,
        verifier: CompletionVerifier,
        clock: Clock,
    ) -> Self {
        Self {
            store,
            verifier,
            clock,
        }
    }

    /// Verifies each remotely-checkable incomplete section once and re-reads
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written.
    pub async fn reconcile(&self, outline: &LessonOutline) -> Result<ReconcileReport, StorageError> {
        let lesson_id = outline.lesson_id();
        let before = self.store.snapshot(lesson_id).await?;
        let candidates: Vec<SectionId> = before
            .incomplete(outline)
            .into_iter()
            .map(|section| section.id)
            .filter(|id| self.verifier.is_remote(id.section_type()))
            .collect();

        let mut repaired = Vec::new();
        for section in candidates {
            if self.verifier.verify(lesson_id, section).await {
                self.store
                    .mark_completed(lesson_id, section, self.clock.now())
                    .await?;
                repaired.push(section);
            }
        }

        let snapshot = self.store.snapshot(lesson_id).await?;
        let still_incomplete: Vec<SectionId> = snapshot
            .incomplete(outline)
            .into_iter()
            .map(|section| section.id)
            .collect();

        if !repaired.is_empty() {
            info!(lesson_id = %lesson_id, repaired = repaired.len(), "reconciled section progress");
        }
        if !still_incomplete.is_empty() {
            warn!(
                lesson_id = %lesson_id,
                remaining = still_incomplete.len(),
                "lesson still has incomplete sections"
            );
        }

        Ok(ReconcileReport {
            repaired,
            still_incomplete,
            snapshot,
        })
    }
}
