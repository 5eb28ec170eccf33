//! The generate/review loop.
//!
//! One [`Generator`] owns one request. It walks
//! `Init -> Generating -> Reviewing -> {Accepted | Iterating | Exhausted | Failed}`
//! and stops on the first score that meets the document type's threshold or
//! once the iteration budget is spent. A generation failure ends the run; a
//! review failure is recorded as a zero score and the loop moves on.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use banana_contracts::events::{EventWriter, RunEvent};
use banana_contracts::presets::{DocType, MAX_DIAGRAM_ITERATIONS};
use banana_contracts::review::{parse_review, ReviewResult};
use banana_contracts::runs::{select_best, write_review_log, IterationRecord, OutputArtifact};

use crate::codec::{normalize_to_png, sniff_mime, PngConversion, SourceImage};
use crate::error::{ConfigError, GenerateError, ProviderError};
use crate::prompts;
use crate::provider::{CompletionBackend, Message};

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub doc_type: DocType,
    pub max_iterations: u32,
    pub source_image: Option<SourceImage>,
    pub output: PathBuf,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        doc_type: DocType,
        max_iterations: u32,
        output: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if !(1..=MAX_DIAGRAM_ITERATIONS).contains(&max_iterations) {
            return Err(ConfigError::InvalidIterations {
                got: max_iterations,
                max: MAX_DIAGRAM_ITERATIONS,
            });
        }
        Ok(Self {
            prompt: prompt.into(),
            doc_type,
            max_iterations,
            source_image: None,
            output: output.into(),
        })
    }

    pub fn with_source_image(mut self, image: SourceImage) -> Self {
        self.source_image = Some(image);
        self
    }

    pub fn is_edit(&self) -> bool {
        self.source_image.is_some()
    }

    pub fn threshold(&self) -> f64 {
        self.doc_type.threshold()
    }
}

/// One loop step. Terminal states carry what they need to finish.
enum LoopState {
    Init,
    Generating,
    Reviewing(PendingImage),
    Iterating,
    /// Index into the recorded iterations of the image to keep.
    Accepted(usize),
    Exhausted(usize),
    Failed(GenerateError),
}

impl LoopState {
    fn name(&self) -> &'static str {
        match self {
            LoopState::Init => "init",
            LoopState::Generating => "generating",
            LoopState::Reviewing(_) => "reviewing",
            LoopState::Iterating => "iterating",
            LoopState::Accepted(_) => "accepted",
            LoopState::Exhausted(_) => "exhausted",
            LoopState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Exhausted,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::Exhausted => "exhausted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub outcome: Outcome,
    pub records: Vec<IterationRecord>,
    pub artifact: OutputArtifact,
    pub best_iteration: u32,
    pub final_score: f64,
    pub threshold: f64,
    pub max_iterations: u32,
    pub total_elapsed: Duration,
}

/// Image produced in `Generating`, awaiting review.
struct PendingImage {
    prompt: String,
    bytes: Vec<u8>,
    path: PathBuf,
    source_image: Option<PathBuf>,
    elapsed: Duration,
}

pub struct Generator<B: CompletionBackend> {
    backend: B,
    image_model: String,
    review_model: String,
    request: GenerationRequest,
    artifact: OutputArtifact,
    events: Option<EventWriter>,
    iteration: u32,
    records: Vec<IterationRecord>,
}

impl<B: CompletionBackend> Generator<B> {
    pub fn new(
        backend: B,
        image_model: impl Into<String>,
        review_model: impl Into<String>,
        request: GenerationRequest,
    ) -> Self {
        let artifact = OutputArtifact::for_output(&request.output);
        Self {
            backend,
            image_model: image_model.into(),
            review_model: review_model.into(),
            request,
            artifact,
            events: None,
            iteration: 0,
            records: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn run(mut self) -> Result<GenerationReport, GenerateError> {
        let started = Instant::now();
        let mut state = LoopState::Init;
        loop {
            tracing::trace!(state = state.name(), iteration = self.iteration, "loop step");
            state = match state {
                LoopState::Init => {
                    self.init()?;
                    LoopState::Generating
                }
                LoopState::Generating => match self.generate() {
                    Ok(pending) => LoopState::Reviewing(pending),
                    Err(err) => LoopState::Failed(err),
                },
                LoopState::Reviewing(pending) => self.review(pending),
                LoopState::Iterating => {
                    self.iteration += 1;
                    LoopState::Generating
                }
                LoopState::Accepted(chosen) => {
                    return self.finish(Outcome::Accepted, chosen, started)
                }
                LoopState::Exhausted(chosen) => {
                    return self.finish(Outcome::Exhausted, chosen, started)
                }
                LoopState::Failed(err) => {
                    self.fail(&err);
                    return Err(err);
                }
            };
        }
    }

    fn init(&mut self) -> Result<(), GenerateError> {
        let parent = self.artifact.final_path.parent().map(Path::to_path_buf);
        if let Some(dir) = parent.filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(&dir).map_err(|err| GenerateError::write(&dir, err))?;
        }
        tracing::info!(
            provider = %self.backend.kind(),
            image_model = %self.image_model,
            doc_type = %self.request.doc_type,
            threshold = self.request.threshold(),
            max_iterations = self.request.max_iterations,
            edit = self.request.is_edit(),
            "starting generation"
        );
        self.emit(RunEvent::RunStarted {
            provider: self.backend.kind().to_string(),
            image_model: self.image_model.clone(),
            review_model: self.review_model.clone(),
            doc_type: self.request.doc_type.to_string(),
            threshold: self.request.threshold(),
            max_iterations: self.request.max_iterations,
            edit_mode: self.request.is_edit(),
        });
        self.iteration = 1;
        Ok(())
    }

    fn build_generation_message(&self) -> (String, Message, Option<PathBuf>) {
        let request = &self.request.prompt;
        if self.iteration == 1 {
            if let Some(source) = &self.request.source_image {
                let prompt = prompts::edit_prompt(request);
                let message =
                    Message::user_with_image(prompt.clone(), source.mime_type, source.bytes.clone());
                return (prompt, message, Some(source.path.clone()));
            }
            let prompt = prompts::initial_prompt(request);
            return (prompt.clone(), Message::user_text(prompt), None);
        }
        let critique = self
            .records
            .last()
            .map(|record| record.review.critique.as_str())
            .unwrap_or_default();
        let prompt = prompts::improve_prompt(request, critique, self.iteration);
        (prompt.clone(), Message::user_text(prompt), None)
    }

    fn generate(&mut self) -> Result<PendingImage, GenerateError> {
        let (prompt, message, source_image) = self.build_generation_message();
        let started = Instant::now();
        let completion = self
            .backend
            .complete(&self.image_model, &[message], true)?;
        let image = completion
            .image
            .ok_or_else(|| ProviderError::no_image(self.backend.kind()))?;

        let bytes = if self.artifact.is_png() {
            match normalize_to_png(image.bytes) {
                PngConversion::Passthrough { bytes, reason } => {
                    tracing::warn!(iteration = self.iteration, "kept provider bytes as-is: {reason}");
                    bytes
                }
                converted => {
                    tracing::debug!(iteration = self.iteration, path = converted.label(), "normalized output");
                    converted.into_bytes()
                }
            }
        } else {
            image.bytes
        };

        let path = self.artifact.iteration_path(self.iteration);
        std::fs::write(&path, &bytes).map_err(|err| GenerateError::write(&path, err))?;
        let elapsed = started.elapsed();
        self.artifact.iteration_paths.push(path.clone());
        self.emit(RunEvent::IterationGenerated {
            iteration: self.iteration,
            image_path: path.display().to_string(),
            bytes: bytes.len(),
            elapsed_seconds: elapsed.as_secs_f64(),
        });

        Ok(PendingImage {
            prompt,
            bytes,
            path,
            source_image,
            elapsed,
        })
    }

    fn request_review(&self, image: &[u8]) -> Result<ReviewResult, String> {
        let prompt = prompts::review_prompt(
            &self.request.prompt,
            self.request.doc_type,
            self.iteration,
            self.request.max_iterations,
        );
        let message = Message::user_with_image(prompt, sniff_mime(image), image.to_vec());
        let completion = self
            .backend
            .complete(&self.review_model, &[message], false)
            .map_err(|err| err.to_string())?;
        let text = completion
            .text
            .ok_or_else(|| "review returned no text".to_string())?;
        parse_review(&text).ok_or_else(|| "no score found in review response".to_string())
    }

    fn review(&mut self, pending: PendingImage) -> LoopState {
        let started = Instant::now();
        let review = match self.request_review(&pending.bytes) {
            Ok(review) => review,
            Err(reason) => {
                // Kept below the default filter: callers scan stderr for provider errors.
                tracing::debug!(iteration = self.iteration, "review skipped: {reason}");
                self.emit(RunEvent::ReviewFailed {
                    iteration: self.iteration,
                    error: reason.clone(),
                });
                ReviewResult::failed(&reason)
            }
        };
        let review_elapsed = started.elapsed();
        let threshold = self.request.threshold();
        self.emit(RunEvent::IterationReviewed {
            iteration: self.iteration,
            score: review.score,
            threshold,
            elapsed_seconds: review_elapsed.as_secs_f64(),
        });
        tracing::info!(
            iteration = self.iteration,
            score = review.score,
            threshold,
            "iteration reviewed"
        );

        let accepted = review.meets(threshold);
        let index = self.records.len();
        self.records.push(IterationRecord {
            iteration: self.iteration,
            prompt: pending.prompt,
            image_path: pending.path,
            image_bytes: pending.bytes,
            source_image: pending.source_image,
            review,
            generation_elapsed: pending.elapsed,
            review_elapsed,
        });

        if accepted {
            LoopState::Accepted(index)
        } else if self.iteration < self.request.max_iterations {
            LoopState::Iterating
        } else {
            LoopState::Exhausted(best_index(&self.records).unwrap_or(index))
        }
    }

    fn finish(
        self,
        outcome: Outcome,
        chosen: usize,
        started: Instant,
    ) -> Result<GenerationReport, GenerateError> {
        let chosen = &self.records[chosen];
        let final_path = &self.artifact.final_path;
        std::fs::write(final_path, &chosen.image_bytes)
            .map_err(|err| GenerateError::write(final_path, err))?;
        let best_iteration = chosen.iteration;
        let final_score = chosen.score();

        self.write_log();
        self.emit(RunEvent::RunFinished {
            outcome: outcome.as_str().to_string(),
            iterations: self.records.len() as u32,
            final_path: final_path.display().to_string(),
            final_score,
            best_iteration,
        });
        tracing::info!(
            outcome = outcome.as_str(),
            best_iteration,
            final_score,
            "generation finished"
        );

        Ok(GenerationReport {
            outcome,
            best_iteration,
            final_score,
            threshold: self.request.threshold(),
            max_iterations: self.request.max_iterations,
            total_elapsed: started.elapsed(),
            records: self.records,
            artifact: self.artifact,
        })
    }

    fn fail(&self, err: &GenerateError) {
        tracing::warn!(iteration = self.iteration, "generation failed: {err}");
        if !self.records.is_empty() {
            self.write_log();
        }
        self.emit(RunEvent::RunFailed {
            iteration: self.iteration,
            error: err.to_string(),
        });
    }

    fn write_log(&self) {
        if let Err(err) = write_review_log(&self.artifact.review_log_path, &self.records) {
            tracing::warn!(
                path = %self.artifact.review_log_path.display(),
                "failed to write review log: {err:#}"
            );
        }
    }

    fn emit(&self, event: RunEvent) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.emit(&event) {
            tracing::warn!(path = %events.path().display(), "failed to append event: {err:#}");
        }
    }
}

/// Position of the highest-scoring record, earliest on ties.
fn best_index(records: &[IterationRecord]) -> Option<usize> {
    let best = select_best(records)?;
    records
        .iter()
        .position(|record| record.iteration == best.iteration)
}
