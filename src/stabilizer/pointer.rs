//! Stabilized pointer - the stroke facade owning buffers, pipeline, and batching

use super::batcher::{FrameBatcher, FrameScheduler};
use super::pipeline::{FilterConfig, FilterKind, FilterPipeline, PipelineConfig};
use crate::input::{extract_samples, PointerEvent, PointerSample, SurfaceOffset};

/// Callback receiving the full stabilized buffer on every flush.
pub type FlushCallback = Box<dyn FnMut(&[PointerSample])>;

/// Maximum distance the stroke's final stabilized point may sit from the
/// true pen-up position before `finish()` appends a correction point.
pub const END_POINT_EPSILON: f64 = 0.5;

/// One active stroke's stabilization state.
///
/// Owns the raw and stabilized buffers, the filter pipeline, and the frame
/// batcher. Constructed once and reused across strokes; `finish()` or
/// `reset()` returns it to the no-active-stroke state without discarding
/// the pipeline configuration.
///
/// Strictly one stroke at a time: callers must not interleave two strokes'
/// samples without an intervening `finish()`/`reset()`.
pub struct StabilizedPointer {
    pipeline: FilterPipeline,
    batcher: FrameBatcher,
    raw: Vec<PointerSample>,
    stabilized: Vec<PointerSample>,
    read_cursor: usize,
    on_flush: Option<FlushCallback>,
}

impl StabilizedPointer {
    /// Create with an empty (pass-through) pipeline.
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create from a validated pipeline configuration.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            pipeline: FilterPipeline::new(config),
            batcher: FrameBatcher::new(),
            raw: Vec::new(),
            stabilized: Vec::new(),
            read_cursor: 0,
            on_flush: None,
        }
    }

    // ----- chainable configuration -----

    /// Add (or replace) the noise stage. Parameters are clamped to usable
    /// values on this fluent path; use [`PipelineConfig::builder`] for
    /// strict validation.
    pub fn add_noise_filter(&mut self, min_distance: f64) -> &mut Self {
        self.pipeline
            .add(FilterConfig::Noise { min_distance }.sanitized());
        self
    }

    /// Add (or replace) the Kalman stage.
    pub fn add_kalman_filter(&mut self, process_noise: f64, measurement_noise: f64) -> &mut Self {
        self.pipeline.add(
            FilterConfig::Kalman {
                process_noise,
                measurement_noise,
            }
            .sanitized(),
        );
        self
    }

    /// Add (or replace) the Gaussian stage.
    pub fn add_gaussian_filter(&mut self, size: usize, sigma: f64) -> &mut Self {
        self.pipeline
            .add(FilterConfig::Gaussian { size, sigma }.sanitized());
        self
    }

    /// Add (or replace) the string (lazy-brush) stage.
    pub fn add_string_filter(&mut self, string_length: f64) -> &mut Self {
        self.pipeline
            .add(FilterConfig::String { string_length }.sanitized());
        self
    }

    /// Update an existing stage's parameters, keeping its per-stroke
    /// state. Absent kinds are a no-op.
    pub fn update_filter(&mut self, config: FilterConfig) -> &mut Self {
        self.pipeline.update(config.sanitized());
        self
    }

    /// Remove a stage and its private state. Absent kinds are a no-op.
    pub fn remove_filter(&mut self, kind: FilterKind) -> &mut Self {
        self.pipeline.remove(kind);
        self
    }

    /// Enable or disable a stage without dropping its configuration.
    pub fn set_filter_enabled(&mut self, kind: FilterKind, enabled: bool) -> &mut Self {
        self.pipeline.set_enabled(kind, enabled);
        self
    }

    /// Toggle frame batching. Turning it off mid-stroke drains the
    /// pending queue synchronously (processing and flushing it now).
    pub fn set_frame_batching(&mut self, enabled: bool) -> &mut Self {
        let released = self.batcher.set_enabled(enabled);
        if !released.is_empty() {
            self.process_batch(&released);
        }
        self
    }

    /// Swap the frame-scheduling backend (e.g. a host compositor hook).
    pub fn set_scheduler(&mut self, scheduler: Box<dyn FrameScheduler>) -> &mut Self {
        self.batcher.set_scheduler(scheduler);
        self
    }

    /// Install the flush callback invoked with the full stabilized buffer.
    pub fn set_flush_callback(&mut self, callback: impl FnMut(&[PointerSample]) + 'static) -> &mut Self {
        self.on_flush = Some(Box::new(callback));
        self
    }

    // ----- point submission -----

    /// Submit one sample synchronously. Returns the stabilized sample, or
    /// `None` if the pipeline rejected it.
    pub fn add_point(&mut self, sample: PointerSample) -> Option<PointerSample> {
        let accepted = self.process_sample(sample);
        if accepted.is_some() {
            self.fire_flush();
        }
        accepted
    }

    /// Submit a batch synchronously. Returns only the accepted points;
    /// the flush callback fires once if anything was appended.
    pub fn add_points(&mut self, samples: &[PointerSample]) -> Vec<PointerSample> {
        self.process_batch(samples)
    }

    /// Submit a platform event. Extracted samples are localized to the
    /// surface at `offset` and scaled by `1 / zoom`, then either queued
    /// for the next frame (batching on) or processed synchronously.
    pub fn add_pointer_event(&mut self, event: &PointerEvent, offset: SurfaceOffset, zoom: f64) {
        let samples = extract_samples(event, offset, zoom);
        if self.batcher.submit(&samples) {
            return;
        }
        self.process_batch(&samples);
    }

    /// Frame tick: drain the pending batch, if one is scheduled. Hosts
    /// call this from their animation-frame driver; tests call it
    /// directly.
    pub fn pump(&mut self) {
        let Some(batch) = self.batcher.take_due() else {
            return;
        };
        let mut appended = false;
        for sample in batch {
            appended |= self.process_sample(sample).is_some();
        }
        if appended {
            self.fire_flush();
        }
    }

    // ----- readout -----

    /// Points appended since the previous call (consuming incremental
    /// reader). An empty buffer yields an empty Vec.
    pub fn new_points(&mut self) -> Vec<PointerSample> {
        let fresh = self.stabilized[self.read_cursor..].to_vec();
        self.read_cursor = self.stabilized.len();
        fresh
    }

    /// The full stabilized buffer so far (read-only view).
    pub fn all_points(&self) -> &[PointerSample] {
        &self.stabilized
    }

    /// Number of stabilized points buffered for the active stroke.
    pub fn len(&self) -> usize {
        self.stabilized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stabilized.is_empty()
    }

    pub fn is_batching(&self) -> bool {
        self.batcher.is_enabled()
    }

    /// True while samples wait on the next frame tick.
    pub fn has_pending(&self) -> bool {
        self.batcher.has_pending()
    }

    pub fn has_filter(&self, kind: FilterKind) -> bool {
        self.pipeline.contains(kind)
    }

    /// Current configuration of a stage, if present.
    pub fn filter_config(&self, kind: FilterKind) -> Option<FilterConfig> {
        self.pipeline.config_of(kind)
    }

    /// Snapshot of the pipeline configuration, in application order.
    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline.config()
    }

    // ----- lifecycle -----

    /// End the stroke: drain any pending batch, reconcile the end point,
    /// return the full stabilized buffer, and clear all stroke state.
    ///
    /// When smoothing left the final stabilized point more than
    /// [`END_POINT_EPSILON`] away from the last raw sample, the raw
    /// sample is appended so the stroke terminates at the true pen-up
    /// position.
    pub fn finish(&mut self) -> Vec<PointerSample> {
        for sample in self.batcher.drain() {
            let _ = self.process_sample(sample);
        }

        let mut points = std::mem::take(&mut self.stabilized);
        if let (Some(last_raw), Some(last_out)) = (self.raw.last(), points.last()) {
            if last_raw.distance_to(last_out) > END_POINT_EPSILON {
                points.push(*last_raw);
            }
        }

        tracing::debug!(points = points.len(), "stroke finished");
        self.clear_stroke();
        points
    }

    /// Abort the stroke: cancel any scheduled frame callback, discard the
    /// pending queue, and clear buffers and per-stroke filter state. The
    /// pipeline configuration is kept.
    pub fn reset(&mut self) {
        self.batcher.clear();
        self.clear_stroke();
        tracing::debug!("pointer reset");
    }

    // ----- internals -----

    /// Run one raw sample through the pipeline and, when accepted, append
    /// the raw original and the stabilized result in lockstep.
    fn process_sample(&mut self, sample: PointerSample) -> Option<PointerSample> {
        let stabilized = self.pipeline.apply(&self.raw, sample)?;
        self.raw.push(sample);
        self.stabilized.push(stabilized);
        Some(stabilized)
    }

    fn process_batch(&mut self, samples: &[PointerSample]) -> Vec<PointerSample> {
        let mut accepted = Vec::with_capacity(samples.len());
        for sample in samples {
            if let Some(stabilized) = self.process_sample(*sample) {
                accepted.push(stabilized);
            }
        }
        if !accepted.is_empty() {
            self.fire_flush();
        }
        accepted
    }

    fn fire_flush(&mut self) {
        if let Some(callback) = self.on_flush.as_mut() {
            callback(&self.stabilized);
        }
    }

    fn clear_stroke(&mut self) {
        self.raw.clear();
        self.stabilized.clear();
        self.read_cursor = 0;
        self.pipeline.reset();
    }

    #[cfg(test)]
    fn raw_len(&self) -> usize {
        self.raw.len()
    }
}

impl Default for StabilizedPointer {
    fn default() -> Self {
        Self::new()
    }
}
