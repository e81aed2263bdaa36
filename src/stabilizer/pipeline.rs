//! Filter pipeline - ordered, per-kind stage slots applied to each sample

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stages::{
    FilterStage, GaussianFilter, KalmanFilter, NoiseFilter, RawWindow, StringFilter,
};
use crate::input::PointerSample;

/// Identifies a filter stage kind within the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Noise,
    Kalman,
    Gaussian,
    String,
}

/// Configuration for a single filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Distance-based jitter rejection; `min_distance = 0` disables it.
    Noise { min_distance: f64 },
    /// Constant-velocity Kalman predictor (Q = process, R = measurement).
    Kalman {
        process_noise: f64,
        measurement_noise: f64,
    },
    /// Gaussian smoothing over the raw-buffer neighborhood. `size` must be
    /// odd; a size of 1 or less leaves samples untouched.
    Gaussian { size: usize, sigma: f64 },
    /// Lazy-brush dead zone of radius `string_length`.
    String { string_length: f64 },
}

impl FilterConfig {
    /// The stage kind this configuration belongs to.
    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Noise { .. } => FilterKind::Noise,
            Self::Kalman { .. } => FilterKind::Kalman,
            Self::Gaussian { .. } => FilterKind::Gaussian,
            Self::String { .. } => FilterKind::String,
        }
    }

    /// Reject unusable parameters (the validating builder path).
    fn validate(&self) -> Result<(), ConfigError> {
        let check = |name: &'static str, value: f64, allow_zero: bool| {
            let ok = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
            if ok {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter {
                    kind: self.kind(),
                    name,
                    value,
                })
            }
        };

        match *self {
            Self::Noise { min_distance } => check("min_distance", min_distance, true),
            Self::Kalman {
                process_noise,
                measurement_noise,
            } => {
                check("process_noise", process_noise, true)?;
                check("measurement_noise", measurement_noise, false)
            }
            Self::Gaussian { size, sigma } => {
                if size > 1 && size % 2 == 0 {
                    return Err(ConfigError::EvenKernelSize(size));
                }
                check("sigma", sigma, false)
            }
            Self::String { string_length } => check("string_length", string_length, true),
        }
    }

    /// Clamp unusable parameters to the nearest valid value (the fluent
    /// facade path). Logs when anything had to change.
    pub(crate) fn sanitized(self) -> Self {
        let clamped = |name: &'static str, value: f64, fallback: f64| {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                tracing::warn!("invalid {name} {value}, using {fallback}");
                fallback
            }
        };

        match self {
            Self::Noise { min_distance } => Self::Noise {
                min_distance: clamped("min_distance", min_distance, 0.0),
            },
            Self::Kalman {
                process_noise,
                measurement_noise,
            } => Self::Kalman {
                process_noise: clamped("process_noise", process_noise, 0.1),
                measurement_noise: clamped("measurement_noise", measurement_noise, 0.5)
                    .max(f64::EPSILON),
            },
            Self::Gaussian { size, sigma } => {
                let size = if size > 1 && size % 2 == 0 {
                    tracing::warn!("even gaussian kernel size {size}, rounding up");
                    size + 1
                } else {
                    size
                };
                let sigma = if sigma.is_finite() && sigma > 0.0 {
                    sigma
                } else {
                    tracing::warn!("invalid sigma {sigma}, using 1.0");
                    1.0
                };
                Self::Gaussian { size, sigma }
            }
            Self::String { string_length } => Self::String {
                string_length: clamped("string_length", string_length, 0.0),
            },
        }
    }
}

/// Invalid filter parameters rejected by the validating builder.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {kind:?} parameter {name}: {value}")]
    InvalidParameter {
        kind: FilterKind,
        name: &'static str,
        value: f64,
    },

    #[error("gaussian kernel size must be odd, got {0}")]
    EvenKernelSize(usize),
}

/// One configured stage within a [`PipelineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    pub config: FilterConfig,
    pub enabled: bool,
}

/// Immutable, validated pipeline configuration. Stage order is the
/// application order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    stages: Vec<StageEntry>,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Configured stages in application order.
    pub fn stages(&self) -> &[StageEntry] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder for [`PipelineConfig`]. Adding a kind twice replaces the
/// earlier entry in place instead of stacking a duplicate.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    stages: IndexMap<FilterKind, StageEntry>,
}

impl PipelineConfigBuilder {
    pub fn noise(self, min_distance: f64) -> Self {
        self.add(FilterConfig::Noise { min_distance })
    }

    pub fn kalman(self, process_noise: f64, measurement_noise: f64) -> Self {
        self.add(FilterConfig::Kalman {
            process_noise,
            measurement_noise,
        })
    }

    pub fn gaussian(self, size: usize, sigma: f64) -> Self {
        self.add(FilterConfig::Gaussian { size, sigma })
    }

    pub fn string(self, string_length: f64) -> Self {
        self.add(FilterConfig::String { string_length })
    }

    /// Toggle a previously added stage; unknown kinds are ignored.
    pub fn enabled(mut self, kind: FilterKind, enabled: bool) -> Self {
        if let Some(entry) = self.stages.get_mut(&kind) {
            entry.enabled = enabled;
        }
        self
    }

    fn add(mut self, config: FilterConfig) -> Self {
        match self.stages.get_mut(&config.kind()) {
            Some(entry) => entry.config = config,
            None => {
                self.stages.insert(
                    config.kind(),
                    StageEntry {
                        config,
                        enabled: true,
                    },
                );
            }
        }
        self
    }

    /// Validate every stage and produce the immutable config.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        for entry in self.stages.values() {
            entry.config.validate()?;
        }
        Ok(PipelineConfig {
            stages: self.stages.into_values().collect(),
        })
    }
}

/// A configured stage together with its per-stroke state.
enum Stage {
    Noise(NoiseFilter),
    Kalman(KalmanFilter),
    Gaussian(GaussianFilter),
    String(StringFilter),
}

impl Stage {
    fn from_config(config: FilterConfig) -> Self {
        match config {
            FilterConfig::Noise { min_distance } => Self::Noise(NoiseFilter::new(min_distance)),
            FilterConfig::Kalman {
                process_noise,
                measurement_noise,
            } => Self::Kalman(KalmanFilter::new(process_noise, measurement_noise)),
            FilterConfig::Gaussian { size, sigma } => {
                Self::Gaussian(GaussianFilter::new(size, sigma))
            }
            FilterConfig::String { string_length } => {
                Self::String(StringFilter::new(string_length))
            }
        }
    }

    /// Adopt new parameters without touching per-stroke state. Callers key
    /// updates by kind, so a mismatched config is ignored.
    fn update(&mut self, config: FilterConfig) {
        match (self, config) {
            (Self::Noise(filter), FilterConfig::Noise { min_distance }) => {
                filter.min_distance = min_distance;
            }
            (
                Self::Kalman(filter),
                FilterConfig::Kalman {
                    process_noise,
                    measurement_noise,
                },
            ) => {
                filter.process_noise = process_noise;
                filter.measurement_noise = measurement_noise;
            }
            (Self::Gaussian(filter), FilterConfig::Gaussian { size, sigma }) => {
                filter.reconfigure(size, sigma);
            }
            (Self::String(filter), FilterConfig::String { string_length }) => {
                filter.string_length = string_length;
            }
            _ => {}
        }
    }

    fn config(&self) -> FilterConfig {
        match self {
            Self::Noise(filter) => FilterConfig::Noise {
                min_distance: filter.min_distance,
            },
            Self::Kalman(filter) => FilterConfig::Kalman {
                process_noise: filter.process_noise,
                measurement_noise: filter.measurement_noise,
            },
            Self::Gaussian(filter) => FilterConfig::Gaussian {
                size: filter.size,
                sigma: filter.sigma,
            },
            Self::String(filter) => FilterConfig::String {
                string_length: filter.string_length,
            },
        }
    }

    fn apply(&mut self, window: &RawWindow<'_>, sample: PointerSample) -> Option<PointerSample> {
        match self {
            Self::Noise(filter) => filter.apply(window, sample),
            Self::Kalman(filter) => filter.apply(window, sample),
            Self::Gaussian(filter) => filter.apply(window, sample),
            Self::String(filter) => filter.apply(window, sample),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Noise(filter) => filter.reset(),
            Self::Kalman(filter) => filter.reset(),
            Self::Gaussian(filter) => filter.reset(),
            Self::String(filter) => filter.reset(),
        }
    }
}

struct Slot {
    enabled: bool,
    stage: Stage,
}

/// Ordered filter stages applied to each incoming sample.
///
/// At most one stage per [`FilterKind`] exists; stage order is insertion
/// order. The pipeline itself never touches the buffers - it decides, per
/// raw sample, whether a stabilized sample comes out and what it is.
pub struct FilterPipeline {
    slots: IndexMap<FilterKind, Slot>,
}

impl FilterPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let slots = config
            .stages
            .iter()
            .map(|entry| {
                (
                    entry.config.kind(),
                    Slot {
                        enabled: entry.enabled,
                        stage: Stage::from_config(entry.config),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    /// Add a stage, or replace an existing stage of the same kind in
    /// place (keeping its position, restarting its per-stroke state).
    pub fn add(&mut self, config: FilterConfig) {
        let kind = config.kind();
        tracing::debug!(?kind, "adding filter stage");
        self.slots.insert(
            kind,
            Slot {
                enabled: true,
                stage: Stage::from_config(config),
            },
        );
    }

    /// Update an existing stage's parameters, preserving its per-stroke
    /// state. Absent kinds are a no-op.
    pub fn update(&mut self, config: FilterConfig) {
        if let Some(slot) = self.slots.get_mut(&config.kind()) {
            slot.stage.update(config);
        }
    }

    /// Remove a stage and its private state. Absent kinds are a no-op.
    pub fn remove(&mut self, kind: FilterKind) {
        if self.slots.shift_remove(&kind).is_some() {
            tracing::debug!(?kind, "removed filter stage");
        }
    }

    /// Enable or disable a stage without dropping its configuration or
    /// state. Absent kinds are a no-op.
    pub fn set_enabled(&mut self, kind: FilterKind, enabled: bool) {
        if let Some(slot) = self.slots.get_mut(&kind) {
            slot.enabled = enabled;
        }
    }

    pub fn contains(&self, kind: FilterKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Current configuration of a stage, if present.
    pub fn config_of(&self, kind: FilterKind) -> Option<FilterConfig> {
        self.slots.get(&kind).map(|slot| slot.stage.config())
    }

    pub fn has_enabled_stage(&self) -> bool {
        self.slots.values().any(|slot| slot.enabled)
    }

    /// Snapshot of the current configuration, in application order.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            stages: self
                .slots
                .values()
                .map(|slot| StageEntry {
                    config: slot.stage.config(),
                    enabled: slot.enabled,
                })
                .collect(),
        }
    }

    /// Run one raw sample through the enabled stages in order.
    ///
    /// `history` is the raw buffer before this sample. Returns the
    /// stabilized sample, or `None` if a stage rejected it.
    pub fn apply(&mut self, history: &[PointerSample], raw: PointerSample) -> Option<PointerSample> {
        // Pass-through fast path: nothing enabled, the sample is accepted
        // verbatim with no state bookkeeping.
        if !self.has_enabled_stage() {
            return Some(raw);
        }

        let window = RawWindow { history, current: raw };
        let mut working = raw;
        for slot in self.slots.values_mut() {
            if !slot.enabled {
                continue;
            }
            working = slot.stage.apply(&window, working)?;
        }
        Some(working)
    }

    /// Drop all per-stroke stage state, keeping every configuration.
    pub fn reset(&mut self) {
        for slot in self.slots.values_mut() {
            slot.stage.reset();
        }
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
