//! Filter stages - the four per-stroke stabilization rules

use crate::input::PointerSample;

/// Shared interface for the per-stroke filter stages.
///
/// A stage transforms (or rejects) one working sample at a time. The
/// [`RawWindow`] carries raw-buffer context for stages that look at
/// neighbors by index.
pub(crate) trait FilterStage {
    /// Apply the stage to `sample`. Returns `None` to reject the sample
    /// outright (only the noise stage does this).
    fn apply(&mut self, window: &RawWindow<'_>, sample: PointerSample) -> Option<PointerSample>;

    /// Drop per-stroke state; configuration is kept.
    fn reset(&mut self);
}

/// Raw-buffer context for one pipeline pass.
///
/// `history` is the raw buffer before the current sample was appended;
/// `current` is the raw sample being processed, logically at index
/// `history.len()`.
pub(crate) struct RawWindow<'a> {
    pub history: &'a [PointerSample],
    pub current: PointerSample,
}

impl RawWindow<'_> {
    /// Raw sample at `index`, clamped to the valid range (edge replication).
    fn raw_at(&self, index: isize) -> PointerSample {
        let last = self.history.len() as isize;
        let clamped = index.clamp(0, last) as usize;
        if clamped == self.history.len() {
            self.current
        } else {
            self.history[clamped]
        }
    }
}

/// Rejects samples that moved less than `min_distance` from the most
/// recently accepted raw sample.
///
/// The reference point is the raw buffer's tail, so rejected samples never
/// become distance references themselves. `min_distance = 0` disables
/// rejection entirely.
#[derive(Debug, Clone)]
pub(crate) struct NoiseFilter {
    pub(crate) min_distance: f64,
}

impl NoiseFilter {
    pub fn new(min_distance: f64) -> Self {
        Self { min_distance }
    }
}

impl FilterStage for NoiseFilter {
    fn apply(&mut self, window: &RawWindow<'_>, sample: PointerSample) -> Option<PointerSample> {
        if self.min_distance <= 0.0 {
            return Some(sample);
        }
        let Some(last) = window.history.last() else {
            return Some(sample);
        };
        // Distance is measured between raw samples, not filtered output.
        if window.current.distance_to(last) < self.min_distance {
            return None;
        }
        Some(sample)
    }

    fn reset(&mut self) {}
}

/// Constant-velocity Kalman estimator with a scalar covariance shared
/// across both axes (`dt` = 1 sample).
///
/// Smooths jitter and predicts slightly ahead along the direction of
/// travel. Output carries the observation's pressure and device.
#[derive(Debug, Clone)]
pub(crate) struct KalmanFilter {
    pub(crate) process_noise: f64,
    pub(crate) measurement_noise: f64,
    state: Option<KalmanState>,
}

#[derive(Debug, Clone, Copy)]
struct KalmanState {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    p: f64,
}

impl KalmanFilter {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
            state: None,
        }
    }
}

impl FilterStage for KalmanFilter {
    fn apply(&mut self, _window: &RawWindow<'_>, sample: PointerSample) -> Option<PointerSample> {
        let Some(state) = self.state.as_mut() else {
            // No prior to correct against: seed the estimate and pass through.
            self.state = Some(KalmanState {
                x: sample.x,
                y: sample.y,
                vx: 0.0,
                vy: 0.0,
                p: 1.0,
            });
            return Some(sample);
        };

        // Predict
        let predicted_x = state.x + state.vx;
        let predicted_y = state.y + state.vy;
        let predicted_p = state.p + self.process_noise;

        // Gain
        let gain = predicted_p / (predicted_p + self.measurement_noise);

        // Update, re-deriving velocity from the position step
        let new_x = predicted_x + gain * (sample.x - predicted_x);
        let new_y = predicted_y + gain * (sample.y - predicted_y);
        state.vx = new_x - state.x;
        state.vy = new_y - state.y;
        state.x = new_x;
        state.y = new_y;
        state.p = (1.0 - gain) * predicted_p;

        Some(sample.at(new_x, new_y))
    }

    fn reset(&mut self) {
        self.state = None;
    }
}

/// Replaces each point with a Gaussian-weighted average of its raw-buffer
/// neighborhood.
///
/// Only x/y are smoothed; pressure and device pass through from the target
/// sample. Out-of-range window indices clamp to the nearest valid raw
/// sample (edge replication). A kernel size of 1 or less is a no-op.
#[derive(Debug, Clone)]
pub(crate) struct GaussianFilter {
    pub(crate) size: usize,
    pub(crate) sigma: f64,
    kernel: Vec<f64>,
}

impl GaussianFilter {
    pub fn new(size: usize, sigma: f64) -> Self {
        Self {
            size,
            sigma,
            kernel: build_kernel(size, sigma),
        }
    }

    pub fn reconfigure(&mut self, size: usize, sigma: f64) {
        self.size = size;
        self.sigma = sigma;
        self.kernel = build_kernel(size, sigma);
    }
}

fn build_kernel(size: usize, sigma: f64) -> Vec<f64> {
    if size <= 1 {
        return Vec::new();
    }
    let center = (size / 2) as f64;
    let sigma = sigma.max(f64::EPSILON);
    (0..size)
        .map(|i| {
            let offset = i as f64 - center;
            (-(offset * offset) / (2.0 * sigma * sigma)).exp()
        })
        .collect()
}

impl FilterStage for GaussianFilter {
    fn apply(&mut self, window: &RawWindow<'_>, sample: PointerSample) -> Option<PointerSample> {
        if self.size <= 1 {
            return Some(sample);
        }

        // The window is centered on the current raw sample; upstream
        // transforms of the working sample do not feed the convolution.
        let center = (self.size / 2) as isize;
        let target = window.history.len() as isize;

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut weight_total = 0.0;
        for (i, weight) in self.kernel.iter().enumerate() {
            let neighbor = window.raw_at(target - center + i as isize);
            sum_x += neighbor.x * weight;
            sum_y += neighbor.y * weight;
            weight_total += weight;
        }

        Some(sample.at(sum_x / weight_total, sum_y / weight_total))
    }

    fn reset(&mut self) {}
}

/// Lazy-brush dead zone: the drawn point is tethered to the pen by a
/// string of fixed length.
///
/// Movements inside the dead zone do not move the drawn point at all;
/// movements beyond it drag the anchor along by exactly the excess
/// distance, so the output always trails the pen by `string_length`.
#[derive(Debug, Clone)]
pub(crate) struct StringFilter {
    pub(crate) string_length: f64,
    anchor: Option<(f64, f64)>,
}

impl StringFilter {
    pub fn new(string_length: f64) -> Self {
        Self {
            string_length,
            anchor: None,
        }
    }
}

impl FilterStage for StringFilter {
    fn apply(&mut self, _window: &RawWindow<'_>, sample: PointerSample) -> Option<PointerSample> {
        let Some((anchor_x, anchor_y)) = self.anchor else {
            self.anchor = Some((sample.x, sample.y));
            return Some(sample);
        };

        if self.string_length <= 0.0 {
            // No dead zone: the anchor shadows the pen exactly.
            self.anchor = Some((sample.x, sample.y));
            return Some(sample);
        }

        let dx = sample.x - anchor_x;
        let dy = sample.y - anchor_y;
        let distance = (dx * dx + dy * dy).sqrt();

        // Inside the dead zone the anchor holds still. This branch also
        // covers distance == 0, keeping the division below well-defined.
        if distance <= self.string_length {
            return Some(sample.at(anchor_x, anchor_y));
        }

        let pull = (distance - self.string_length) / distance;
        let new_x = anchor_x + dx * pull;
        let new_y = anchor_y + dy * pull;
        self.anchor = Some((new_x, new_y));
        Some(sample.at(new_x, new_y))
    }

    fn reset(&mut self) {
        self.anchor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of(history: &[PointerSample], current: PointerSample) -> RawWindow<'_> {
        RawWindow { history, current }
    }

    #[test]
    fn test_noise_filter_rejects_close_samples() {
        let mut filter = NoiseFilter::new(1.5);
        let first = PointerSample::new(0.0, 0.0, 0.5);
        let history = [first];

        let near = PointerSample::new(0.5, 0.5, 0.5);
        assert!(filter.apply(&window_of(&history, near), near).is_none());

        let far = PointerSample::new(10.0, 10.0, 0.5);
        assert!(filter.apply(&window_of(&history, far), far).is_some());
    }

    #[test]
    fn test_noise_filter_first_sample_passes() {
        let mut filter = NoiseFilter::new(5.0);
        let sample = PointerSample::new(0.0, 0.0, 0.5);
        assert!(filter.apply(&window_of(&[], sample), sample).is_some());
    }

    #[test]
    fn test_noise_filter_zero_distance_disables() {
        let mut filter = NoiseFilter::new(0.0);
        let first = PointerSample::new(0.0, 0.0, 0.5);
        let history = [first];

        // Even an identical position passes with rejection disabled
        assert!(filter.apply(&window_of(&history, first), first).is_some());
    }

    #[test]
    fn test_kalman_first_sample_passes_unchanged() {
        let mut filter = KalmanFilter::new(0.1, 0.5);
        let sample = PointerSample::new(3.0, 4.0, 0.7);

        let Some(result) = filter.apply(&window_of(&[], sample), sample) else {
            panic!("kalman never rejects");
        };
        assert_eq!(result.x, 3.0);
        assert_eq!(result.y, 4.0);
        assert_eq!(result.pressure, 0.7);
    }

    #[test]
    fn test_kalman_identical_points_stay_put() {
        let mut filter = KalmanFilter::new(0.1, 0.5);
        let sample = PointerSample::new(5.0, 5.0, 0.5);

        for _ in 0..20 {
            let Some(result) = filter.apply(&window_of(&[], sample), sample) else {
                panic!("kalman never rejects");
            };
            assert!((result.x - 5.0).abs() < 1e-9);
            assert!((result.y - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_kalman_converges_after_step() {
        let mut filter = KalmanFilter::new(0.1, 0.5);
        let origin = PointerSample::new(0.0, 0.0, 0.5);
        let _ = filter.apply(&window_of(&[], origin), origin);

        let target = PointerSample::new(5.0, 0.0, 0.5);
        let mut error_at_10 = 0.0;
        let mut error_at_40 = 0.0;
        for i in 0..40 {
            let Some(result) = filter.apply(&window_of(&[], target), target) else {
                panic!("kalman never rejects");
            };
            if i == 9 {
                error_at_10 = (result.x - 5.0).abs();
            }
            if i == 39 {
                error_at_40 = (result.x - 5.0).abs();
            }
        }

        assert!(error_at_40 < error_at_10);
        assert!(error_at_40 < 0.01);
    }

    #[test]
    fn test_kalman_predicts_along_direction_of_travel() {
        let mut filter = KalmanFilter::new(0.1, 0.5);
        let mut last_x = 0.0;
        for i in 0..30 {
            let sample = PointerSample::new(i as f64 * 2.0, 0.0, 0.5);
            let Some(result) = filter.apply(&window_of(&[], sample), sample) else {
                panic!("kalman never rejects");
            };
            last_x = result.x;
        }
        // After a long constant-velocity run the estimate tracks the input
        assert!((last_x - 58.0).abs() < 1.0);
    }

    #[test]
    fn test_kalman_reset_drops_state() {
        let mut filter = KalmanFilter::new(0.1, 0.5);
        let a = PointerSample::new(0.0, 0.0, 0.5);
        let b = PointerSample::new(100.0, 0.0, 0.5);

        let _ = filter.apply(&window_of(&[], a), a);
        filter.reset();

        // After reset the next sample seeds fresh state and passes through
        let Some(result) = filter.apply(&window_of(&[], b), b) else {
            panic!("kalman never rejects");
        };
        assert_eq!(result.x, 100.0);
    }

    #[test]
    fn test_gaussian_noop_below_effective_size() {
        let mut filter = GaussianFilter::new(1, 2.0);
        let sample = PointerSample::new(7.0, 9.0, 0.5);
        let Some(result) = filter.apply(&window_of(&[], sample), sample) else {
            panic!("gaussian never rejects");
        };
        assert_eq!(result.x, 7.0);
        assert_eq!(result.y, 9.0);
    }

    #[test]
    fn test_gaussian_first_sample_unchanged() {
        // With no history, every tap replicates the current sample
        let mut filter = GaussianFilter::new(5, 1.0);
        let sample = PointerSample::new(3.0, -2.0, 0.5);
        let Some(result) = filter.apply(&window_of(&[], sample), sample) else {
            panic!("gaussian never rejects");
        };
        assert!((result.x - 3.0).abs() < 1e-12);
        assert!((result.y + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_gaussian_preserves_collinear_points() {
        let mut filter = GaussianFilter::new(5, 1.2);
        let history: Vec<PointerSample> = (0..10)
            .map(|i| PointerSample::new(i as f64, i as f64 * 0.5, 0.5))
            .collect();
        let current = PointerSample::new(10.0, 5.0, 0.5);

        let Some(result) = filter.apply(&window_of(&history, current), current) else {
            panic!("gaussian never rejects");
        };
        // A weighted average of points on y = x/2 stays on y = x/2
        assert!((result.y - result.x * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_gaussian_smooths_toward_neighbors() {
        let mut filter = GaussianFilter::new(3, 1.0);
        let history = [
            PointerSample::new(0.0, 0.0, 0.5),
            PointerSample::new(1.0, 0.0, 0.5),
        ];
        let current = PointerSample::new(2.0, 3.0, 0.5);

        let Some(result) = filter.apply(&window_of(&history, current), current) else {
            panic!("gaussian never rejects");
        };
        // The outlier y is pulled toward the flat neighborhood
        assert!(result.y < 3.0);
        assert!(result.y > 0.0);
    }

    #[test]
    fn test_gaussian_passes_pressure_through() {
        let mut filter = GaussianFilter::new(3, 1.0);
        let history = [PointerSample::new(0.0, 0.0, 0.1)];
        let current = PointerSample::new(4.0, 0.0, 0.9);

        let Some(result) = filter.apply(&window_of(&history, current), current) else {
            panic!("gaussian never rejects");
        };
        assert_eq!(result.pressure, 0.9);
    }

    #[test]
    fn test_string_dead_zone_holds_anchor() {
        let mut filter = StringFilter::new(10.0);
        let first = PointerSample::new(0.0, 0.0, 0.5);
        let _ = filter.apply(&window_of(&[], first), first);

        // A jump of exactly the string length stays inside the dead zone
        let inside = PointerSample::new(6.0, 8.0, 0.5);
        let Some(result) = filter.apply(&window_of(&[], inside), inside) else {
            panic!("string never rejects");
        };
        assert_eq!(result.x, 0.0);
        assert_eq!(result.y, 0.0);
    }

    #[test]
    fn test_string_drags_by_exact_excess() {
        let mut filter = StringFilter::new(10.0);
        let first = PointerSample::new(0.0, 0.0, 0.5);
        let _ = filter.apply(&window_of(&[], first), first);

        // Magnitude 11 along (0.6, 0.8): the anchor moves by exactly 1
        let beyond = PointerSample::new(6.6, 8.8, 0.5);
        let Some(result) = filter.apply(&window_of(&[], beyond), beyond) else {
            panic!("string never rejects");
        };
        assert!((result.x - 0.6).abs() < 1e-9);
        assert!((result.y - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_string_zero_length_shadows_pen() {
        let mut filter = StringFilter::new(0.0);
        let first = PointerSample::new(0.0, 0.0, 0.5);
        let _ = filter.apply(&window_of(&[], first), first);

        let next = PointerSample::new(0.25, 0.25, 0.5);
        let Some(result) = filter.apply(&window_of(&[], next), next) else {
            panic!("string never rejects");
        };
        assert_eq!(result.x, 0.25);
        assert_eq!(result.y, 0.25);
    }

    #[test]
    fn test_string_repeated_point_keeps_output_finite() {
        let mut filter = StringFilter::new(5.0);
        let sample = PointerSample::new(2.0, 2.0, 0.5);

        let _ = filter.apply(&window_of(&[], sample), sample);
        // distance == 0 must not divide by zero
        let Some(result) = filter.apply(&window_of(&[], sample), sample) else {
            panic!("string never rejects");
        };
        assert!(result.x.is_finite());
        assert!(result.y.is_finite());
        assert_eq!(result.x, 2.0);
    }

    #[test]
    fn test_string_reset_drops_anchor() {
        let mut filter = StringFilter::new(10.0);
        let a = PointerSample::new(0.0, 0.0, 0.5);
        let _ = filter.apply(&window_of(&[], a), a);
        filter.reset();

        // A fresh anchor forms at the next sample
        let b = PointerSample::new(50.0, 0.0, 0.5);
        let Some(result) = filter.apply(&window_of(&[], b), b) else {
            panic!("string never rejects");
        };
        assert_eq!(result.x, 50.0);
    }
}
