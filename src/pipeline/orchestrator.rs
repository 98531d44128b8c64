//! Attestation pipeline orchestrator.
//!
//! # Responsibilities
//! - Own the captured image and the observable [`PipelineState`]
//! - Run hash → sign → upload → anchor strictly in order, one attempt at a time
//! - Re-read the identity at every stage that needs it
//! - Tag every failure with its stage and keep any artifact already stored
//!
//! # Concurrency
//! The image slot is a `tokio::sync::Mutex` held for the whole attempt.
//! A second `attest` (or `capture` / `retake`) that cannot take it fails
//! immediately with `Busy` and leaves the running attempt alone. An attempt
//! whose future is dropped ends `Errored` with `Abandoned`.

use alloy::primitives::Address;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, Mutex};
use tracing::Instrument;
use uuid::Uuid;

use crate::anchor::LedgerAnchorClient;
use crate::attestation::{
    build_message, hash, CapturedImage, SignatureBundle, SignedAttestation, Timestamp,
};
use crate::identity::{IdentityProvider, SignerAdapter};
use crate::observability::logging::abbreviate;
use crate::observability::metrics;
use crate::pipeline::challenge::ChallengeSource;
use crate::pipeline::error::{AttestError, PipelineError, StageError};
use crate::pipeline::state::{AnchorPhase, AttestationOutcome, PipelineState, Stage};
use crate::upload::{ArtifactReference, UploadClient};

/// Sequences one attestation attempt at a time.
pub struct AttestationPipeline {
    signer: SignerAdapter,
    uploader: UploadClient,
    anchor: LedgerAnchorClient,
    challenges: Arc<dyn ChallengeSource>,
    image: Mutex<Option<CapturedImage>>,
    state: watch::Sender<PipelineState>,
}

impl AttestationPipeline {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        uploader: UploadClient,
        anchor: LedgerAnchorClient,
        challenges: Arc<dyn ChallengeSource>,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            signer: SignerAdapter::new(identity),
            uploader,
            anchor,
            challenges,
            image: Mutex::new(None),
            state,
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Hold `image` for the next attempt, replacing any previous capture
    /// and clearing the last attempt's outcome.
    pub fn capture(&self, image: CapturedImage) -> Result<(), PipelineError> {
        let mut slot = self.try_slot()?;
        tracing::debug!(size = image.len(), mime_type = image.mime_type(), "Image captured");
        *slot = Some(image);
        self.transition(PipelineState::Idle);
        Ok(())
    }

    /// Discard the captured image and any error, back to `Idle`.
    pub fn retake(&self) -> Result<(), PipelineError> {
        let mut slot = self.try_slot()?;
        *slot = None;
        self.transition(PipelineState::Idle);
        Ok(())
    }

    /// Back to `Idle`, keeping the captured image for a fresh attempt.
    pub fn reset(&self) -> Result<(), PipelineError> {
        let _slot = self.try_slot()?;
        self.transition(PipelineState::Idle);
        Ok(())
    }

    pub fn has_image(&self) -> bool {
        self.image.try_lock().map(|slot| slot.is_some()).unwrap_or(true)
    }

    /// Attest and publish the captured image.
    pub async fn attest(&self) -> Result<AttestationOutcome, PipelineError> {
        self.attest_with_cancel(std::future::pending()).await
    }

    /// As [`attest`](Self::attest), but stop waiting when `cancel` resolves.
    ///
    /// Cancelling only abandons the wait: a signature already requested or a
    /// transaction already submitted is not retracted. The attempt ends
    /// `Errored` with `Abandoned` at the stage that was running.
    pub async fn attest_with_cancel<C>(&self, cancel: C) -> Result<AttestationOutcome, PipelineError>
    where
        C: Future<Output = ()>,
    {
        let mut slot = self.try_slot().inspect_err(|_| metrics::record_attempt("busy"))?;
        let image = slot.clone().ok_or_else(|| {
            PipelineError::Refused(AttestError::InvalidInput {
                message: "no image captured".to_string(),
            })
        })?;

        let attempt_id = Uuid::new_v4();
        let span = tracing::info_span!("attest", attempt_id = %attempt_id);

        // Declared after `slot` so a dropped attempt settles the state while
        // the image lock is still held.
        let mut attempt = AttemptGuard::new(self);
        let result = async {
            tracing::info!(size = image.len(), mime_type = image.mime_type(), "Attestation started");
            tokio::select! {
                result = self.run(&image, &attempt.stored) => result,
                _ = cancel => {
                    tracing::warn!("Attestation abandoned while waiting");
                    Err(StageError::new(self.current_stage(), AttestError::Abandoned))
                }
            }
        }
        .instrument(span.clone())
        .await;
        let stored = attempt.disarm();

        match result {
            Ok(outcome) => {
                *slot = None;
                tracing::info!(
                    parent: &span,
                    tx_hash = %outcome.receipt.tx_hash,
                    artifact = %outcome.artifact.url(),
                    "Attestation complete"
                );
                metrics::record_attempt("complete");
                self.transition(PipelineState::Complete(Box::new(outcome.clone())));
                Ok(outcome)
            }
            Err(mut error) => {
                if error.artifact.is_none() {
                    error.artifact = stored;
                }
                tracing::warn!(
                    parent: &span,
                    stage = %error.stage,
                    error = %error.error,
                    artifact = error.artifact.as_ref().map(|a| a.url()),
                    "Attestation failed"
                );
                metrics::record_attempt("errored");
                self.transition(PipelineState::Errored(error.clone()));
                Err(PipelineError::Failed(error))
            }
        }
    }

    async fn run(
        &self,
        image: &CapturedImage,
        stored: &StdMutex<Option<ArtifactReference>>,
    ) -> Result<AttestationOutcome, StageError> {
        // Size and media checks happen here so nothing is signed or sent for
        // an image the backend would refuse.
        let content_hash = self
            .stage(Stage::Hashing, async {
                self.uploader.check(image, &SignatureBundle::Unsigned)?;
                hash(image.bytes()).map_err(AttestError::from)
            })
            .await?;

        let attestation = self
            .stage(Stage::AwaitingSignature, async {
                let identity = self.signer.identity()?;
                let challenge = self.challenges.issue(&content_hash).await?;
                let timestamp = now_unix();
                let message = build_message(&content_hash, &challenge, timestamp);
                let signature = self.signer.sign(&message, identity).await?;

                let attestation = SignedAttestation {
                    signature,
                    content_hash,
                    challenge,
                    timestamp,
                    identity,
                };
                tracing::info!(
                    identity = %identity,
                    content_hash = %abbreviate(&content_hash.to_hex()),
                    signature = %abbreviate(&attestation.signature_hex()),
                    "Attestation signed"
                );
                Ok::<_, AttestError>(attestation)
            })
            .await?;

        let artifact = self
            .stage(Stage::Uploading, async {
                self.signer.ensure_identity(attestation.identity)?;
                let bundle = SignatureBundle::Signed(attestation.clone());
                self.uploader
                    .upload(image, &bundle)
                    .await
                    .map_err(AttestError::from)
            })
            .await?;
        if let Ok(mut slot) = stored.lock() {
            *slot = Some(artifact.clone());
        }

        let receipt = self
            .stage(Stage::Anchoring, async {
                let pending = self
                    .anchor
                    .submit(
                        &artifact,
                        &attestation.content_hash,
                        attestation.timestamp,
                        &attestation.signature,
                        attestation.identity,
                    )
                    .await?;
                self.transition(PipelineState::Anchoring(AnchorPhase::Confirming {
                    tx_hash: pending.tx_hash,
                }));
                self.anchor.confirm(pending).await.map_err(AttestError::from)
            })
            .await
            .map_err(|e| e.with_artifact(artifact.clone()))?;

        Ok(AttestationOutcome {
            receipt,
            artifact,
            attestation,
        })
    }

    /// Enter `stage`, run `work`, and record how it went.
    async fn stage<T, F>(&self, stage: Stage, work: F) -> Result<T, StageError>
    where
        F: Future<Output = Result<T, AttestError>>,
    {
        self.transition(entering(stage));
        let started = Instant::now();
        let result = work.await;
        metrics::record_stage(stage, started.elapsed(), result.is_ok());
        result.map_err(|error| StageError::new(stage, error))
    }

    fn transition(&self, next: PipelineState) {
        tracing::debug!(state = %next.status_message(), "Pipeline state changed");
        self.state.send_replace(next);
    }

    fn current_stage(&self) -> Stage {
        self.state.borrow().stage().unwrap_or(Stage::Hashing)
    }

    fn try_slot(&self) -> Result<tokio::sync::MutexGuard<'_, Option<CapturedImage>>, PipelineError> {
        self.image
            .try_lock()
            .map_err(|_| PipelineError::Refused(AttestError::Busy))
    }

    /// Address the pipeline would sign with right now.
    pub fn identity(&self) -> Option<Address> {
        self.signer.identity().ok()
    }
}

impl std::fmt::Debug for AttestationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationPipeline")
            .field("state", &*self.state.borrow())
            .field("anchor", &self.anchor)
            .finish()
    }
}

/// Settles the observable state when an attempt future is dropped mid-flight,
/// so no in-flight state outlives its attempt.
struct AttemptGuard<'a> {
    pipeline: &'a AttestationPipeline,
    stored: StdMutex<Option<ArtifactReference>>,
    armed: bool,
}

impl<'a> AttemptGuard<'a> {
    fn new(pipeline: &'a AttestationPipeline) -> Self {
        Self {
            pipeline,
            stored: StdMutex::new(None),
            armed: true,
        }
    }

    /// The attempt finished on its own; hand back any stored artifact.
    fn disarm(&mut self) -> Option<ArtifactReference> {
        self.armed = false;
        self.stored.get_mut().ok().and_then(|stored| stored.take())
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut error = StageError::new(self.pipeline.current_stage(), AttestError::Abandoned);
        error.artifact = self.stored.get_mut().ok().and_then(|stored| stored.take());
        tracing::warn!(stage = %error.stage, "Attestation dropped while in flight");
        metrics::record_attempt("abandoned");
        self.pipeline.transition(PipelineState::Errored(error));
    }
}

fn entering(stage: Stage) -> PipelineState {
    match stage {
        Stage::Hashing => PipelineState::Hashing,
        Stage::AwaitingSignature => PipelineState::AwaitingSignature,
        Stage::Uploading => PipelineState::Uploading,
        Stage::Anchoring => PipelineState::Anchoring(AnchorPhase::Submitting),
    }
}

fn now_unix() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
