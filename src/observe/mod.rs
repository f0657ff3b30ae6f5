//! Structured pipeline events.
//!
//! Applications subscribe by attaching a [`DetectionObserver`] to the
//! pipeline; closures taking `&PipelineEvent` implement the trait directly.
//! Events borrow from the call that produced them and are only valid for the
//! duration of the callback.

/// Why a candidate slot did not become a detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rejection {
    /// Confidence at or below the threshold (or not a number).
    BelowThreshold { confidence: f32 },
    /// Class index outside the label table.
    OutOfRangeClassIndex { class_index: i64 },
    /// Label present in the table but not in the allow-list.
    NotAllowed { class_index: i64 },
    /// Box with non-positive width or height, or non-finite coordinates.
    DegenerateGeometry,
}

/// Event emitted while a pipeline call runs.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent<'a> {
    /// Output roles were assigned.
    RolesResolved {
        boxes: &'a str,
        scores: &'a str,
        classes: Option<&'a str>,
        candidates: usize,
    },
    /// Output roles could not be assigned; the call yields no detections.
    RolesUnresolved { reason: &'static str },
    /// A candidate slot passed decoding and class filtering.
    CandidateAccepted {
        index: usize,
        label: &'a str,
        confidence: f32,
    },
    /// A candidate slot was dropped.
    CandidateRejected { index: usize, reason: Rejection },
    /// Suppression finished.
    NmsApplied { before: usize, after: usize },
    /// The upstream inference call failed; the call yields no detections.
    InferenceFailed { reason: &'a str },
}

/// Receiver for [`PipelineEvent`]s.
pub trait DetectionObserver: Send + Sync {
    /// Called synchronously from the pipeline call that produced `event`.
    fn on_event(&self, event: &PipelineEvent<'_>);
}

impl<F> DetectionObserver for F
where
    F: Fn(&PipelineEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent<'_>) {
        self(event)
    }
}
