//! End-to-end detection pipeline.
//!
//! `DetectionPipeline` runs role resolution, decoding, class filtering and
//! suppression over one frame of model outputs. It is immutable after
//! construction, so one instance can serve concurrent callers; all per-call
//! data stays local to the call.

use crate::decode::{decode_candidates_with, DecodeConfig, ImageSize};
use crate::filter::{AllowList, ClassFilter};
use crate::labels::LabelTable;
use crate::nms::{suppress, IouThresholds};
use crate::observe::{DetectionObserver, PipelineEvent};
use crate::roles::{RoleResolver, RoleStrategy};
use crate::tensor::OutputMap;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{DetDecodeError, DetDecodeResult};
use crate::Detection;
use std::fmt::Display;
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Configuration for a detection pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineConfig {
    /// Threshold, tile size, coordinate convention and clamp policy.
    pub decode: DecodeConfig,
    /// Labels retained after decoding.
    pub allow_list: AllowList,
    /// Suppression thresholds.
    pub nms: IouThresholds,
    /// Output role resolution strategy.
    pub roles: RoleStrategy,
}

impl PipelineConfig {
    /// Validates every section.
    pub fn validate(&self) -> DetDecodeResult<()> {
        self.decode.validate()?;
        self.allow_list.validate()?;
        self.nms.validate()?;
        self.roles.validate()
    }
}

/// Decoding and suppression pipeline over raw detection outputs.
pub struct DetectionPipeline {
    labels: LabelTable,
    cfg: PipelineConfig,
    resolver: Box<dyn RoleResolver + Send + Sync>,
    observer: Option<Arc<dyn DetectionObserver>>,
}

impl DetectionPipeline {
    /// Builds a pipeline, validating the configuration.
    pub fn new(labels: LabelTable, cfg: PipelineConfig) -> DetDecodeResult<Self> {
        cfg.validate()?;
        let resolver = cfg.roles.build();
        Ok(Self {
            labels,
            cfg,
            resolver,
            observer: None,
        })
    }

    /// Replaces the configured role strategy with a custom resolver.
    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: RoleResolver + Send + Sync + 'static,
    {
        self.resolver = Box::new(resolver);
        self
    }

    /// Attaches an observer that receives every [`PipelineEvent`].
    pub fn with_observer(mut self, observer: Arc<dyn DetectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the label table.
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    fn emit(&self, event: PipelineEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }

    /// Runs the pipeline, reporting unresolved output roles as an error.
    pub fn try_detect(
        &self,
        outputs: &OutputMap<'_>,
        image: ImageSize,
    ) -> DetDecodeResult<Vec<Detection>> {
        let _span = trace_span!("detect", outputs = outputs.len()).entered();

        let roles = match self.resolver.resolve(outputs) {
            Ok(roles) => roles,
            Err(err) => {
                if let DetDecodeError::UnresolvedOutputRoles { reason } = err {
                    trace_event!("roles_unresolved", reason = reason);
                    self.emit(PipelineEvent::RolesUnresolved { reason });
                }
                return Err(err);
            }
        };
        let candidates = crate::decode::candidate_count(&roles);
        trace_event!(
            "roles_resolved",
            boxes = roles.boxes.0,
            scores = roles.scores.0,
            candidates = candidates,
        );
        self.emit(PipelineEvent::RolesResolved {
            boxes: roles.boxes.0,
            scores: roles.scores.0,
            classes: roles.classes.map(|(name, _)| name),
            candidates,
        });

        let decoded = {
            let _span = trace_span!("decode", candidates = candidates).entered();
            decode_candidates_with(&roles, &self.cfg.decode, image, |index, reason| {
                self.emit(PipelineEvent::CandidateRejected { index, reason });
            })
        };

        let filter = ClassFilter::new(&self.labels, &self.cfg.allow_list);
        let mut detections = Vec::with_capacity(decoded.len());
        for candidate in &decoded {
            match filter.accept(candidate) {
                Ok(det) => {
                    trace_debug!(
                        "candidate_accepted",
                        index = candidate.index,
                        confidence = det.confidence,
                    );
                    self.emit(PipelineEvent::CandidateAccepted {
                        index: candidate.index,
                        label: &det.label,
                        confidence: det.confidence,
                    });
                    detections.push(det);
                }
                Err(reason) => self.emit(PipelineEvent::CandidateRejected {
                    index: candidate.index,
                    reason,
                }),
            }
        }

        let before = detections.len();
        let kept = {
            let _span = trace_span!("nms", before = before).entered();
            suppress(detections, &self.cfg.nms)
        };
        trace_event!("nms_applied", before = before, after = kept.len());
        self.emit(PipelineEvent::NmsApplied {
            before,
            after: kept.len(),
        });

        Ok(kept)
    }

    /// Runs the pipeline; malformed outputs yield no detections.
    pub fn detect(&self, outputs: &OutputMap<'_>, image: ImageSize) -> Vec<Detection> {
        self.try_detect(outputs, image).unwrap_or_default()
    }

    /// Runs the pipeline on the outcome of an inference call.
    ///
    /// An inference error is reported to the observer and returned as
    /// [`DetDecodeError::InferenceFailed`].
    pub fn try_detect_result<E: Display>(
        &self,
        inference: Result<OutputMap<'_>, E>,
        image: ImageSize,
    ) -> DetDecodeResult<Vec<Detection>> {
        match inference {
            Ok(outputs) => self.try_detect(&outputs, image),
            Err(err) => {
                let reason = err.to_string();
                trace_event!("inference_failed", reason = reason.as_str());
                self.emit(PipelineEvent::InferenceFailed { reason: &reason });
                Err(DetDecodeError::InferenceFailed { reason })
            }
        }
    }

    /// Runs the pipeline on the outcome of an inference call; failures of any
    /// kind yield no detections.
    pub fn detect_result<E: Display>(
        &self,
        inference: Result<OutputMap<'_>, E>,
        image: ImageSize,
    ) -> Vec<Detection> {
        self.try_detect_result(inference, image).unwrap_or_default()
    }

    /// Runs the pipeline over several frames in order.
    pub fn detect_batch(&self, frames: &[(OutputMap<'_>, ImageSize)]) -> Vec<Vec<Detection>> {
        frames
            .iter()
            .map(|(outputs, image)| self.detect(outputs, *image))
            .collect()
    }

    /// Runs the pipeline over several frames in parallel.
    ///
    /// Results are returned in frame order and equal [`Self::detect_batch`].
    #[cfg(feature = "rayon")]
    pub fn detect_batch_par(&self, frames: &[(OutputMap<'_>, ImageSize)]) -> Vec<Vec<Detection>> {
        frames
            .par_iter()
            .map(|(outputs, image)| self.detect(outputs, *image))
            .collect()
    }
}
