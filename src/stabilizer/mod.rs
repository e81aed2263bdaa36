//! Stabilizer module - filter pipeline, frame batching, and the stroke facade
//!
//! Raw pointer samples go in through [`StabilizedPointer`]; stabilized
//! drawing points come out through the flush callback and the buffer
//! readers. The filter stack (noise rejection, Kalman prediction,
//! Gaussian smoothing, lazy-brush string) is assembled either with the
//! validating [`PipelineConfig`] builder or the facade's chainable
//! methods, and [`pointer_for_level`] maps a single 0-100 strength to a
//! tuned preset.

mod batcher;
mod pipeline;
mod pointer;
mod presets;
mod stages;

pub use batcher::{FrameScheduler, ManualFrameScheduler, TaskHandle};
pub use pipeline::{
    ConfigError, FilterConfig, FilterKind, FilterPipeline, PipelineConfig, PipelineConfigBuilder,
    StageEntry,
};
pub use pointer::{FlushCallback, StabilizedPointer, END_POINT_EPSILON};
pub use presets::pointer_for_level;
