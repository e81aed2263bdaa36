//! Stabilization level presets - one strength scalar to a tuned pipeline

use super::pointer::StabilizedPointer;

/// Map a 0-100 stabilization strength to a tuned [`StabilizedPointer`].
///
/// Levels outside the range clamp to the nearest end. Each band keeps the
/// filters of the bands below it:
///
/// - `0`: pass-through, no filters
/// - `1-20`: noise rejection
/// - `21-40`: + Kalman prediction
/// - `41-60`: + Gaussian smoothing (size 7) and frame batching
/// - `61-80`: Gaussian size 9, + string stabilization (length 8)
/// - `81-100`: string length 15
pub fn pointer_for_level(level: i32) -> StabilizedPointer {
    let level = level.clamp(0, 100);
    let mut pointer = StabilizedPointer::new();
    if level == 0 {
        return pointer;
    }

    let strength = f64::from(level);
    pointer.add_noise_filter(1.0 + strength * 0.02);

    if level > 20 {
        pointer.add_kalman_filter(0.12 - strength * 0.0008, 0.4 + strength * 0.006);
    }

    if level > 40 {
        let size = if level > 60 { 9 } else { 7 };
        pointer.add_gaussian_filter(size, 1.0 + strength * 0.006);
        pointer.set_frame_batching(true);
    }

    if level > 60 {
        let string_length = if level > 80 { 15.0 } else { 8.0 };
        pointer.add_string_filter(string_length);
    }

    tracing::debug!(level, "built stabilization preset");
    pointer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerSample;
    use crate::stabilizer::pipeline::{FilterConfig, FilterKind};

    #[test]
    fn test_level_zero_is_pass_through() {
        let pointer = pointer_for_level(0);
        assert!(pointer.pipeline_config().is_empty());
        assert!(!pointer.is_batching());
    }

    #[test]
    fn test_levels_clamp_at_boundaries() {
        let below = pointer_for_level(-5);
        assert!(below.pipeline_config().is_empty());

        let above = pointer_for_level(150);
        let capped = pointer_for_level(100);
        assert_eq!(above.pipeline_config(), capped.pipeline_config());
    }

    #[test]
    fn test_band_composition() {
        let low = pointer_for_level(10);
        assert!(low.has_filter(FilterKind::Noise));
        assert!(!low.has_filter(FilterKind::Kalman));
        assert!(!low.is_batching());

        let mid = pointer_for_level(30);
        assert!(mid.has_filter(FilterKind::Kalman));
        assert!(!mid.has_filter(FilterKind::Gaussian));

        let smooth = pointer_for_level(50);
        assert!(smooth.has_filter(FilterKind::Gaussian));
        assert!(smooth.is_batching());
        assert!(!smooth.has_filter(FilterKind::String));

        let heavy = pointer_for_level(70);
        assert_eq!(
            heavy.filter_config(FilterKind::Gaussian),
            Some(FilterConfig::Gaussian {
                size: 9,
                sigma: 1.0 + 70.0 * 0.006,
            })
        );
        assert_eq!(
            heavy.filter_config(FilterKind::String),
            Some(FilterConfig::String { string_length: 8.0 })
        );

        let max = pointer_for_level(90);
        assert_eq!(
            max.filter_config(FilterKind::String),
            Some(FilterConfig::String {
                string_length: 15.0
            })
        );
    }

    #[test]
    fn test_tuned_parameters_follow_level() {
        let pointer = pointer_for_level(20);
        assert_eq!(
            pointer.filter_config(FilterKind::Noise),
            Some(FilterConfig::Noise {
                min_distance: 1.0 + 20.0 * 0.02,
            })
        );

        let pointer = pointer_for_level(40);
        assert_eq!(
            pointer.filter_config(FilterKind::Kalman),
            Some(FilterConfig::Kalman {
                process_noise: 0.12 - 40.0 * 0.0008,
                measurement_noise: 0.4 + 40.0 * 0.006,
            })
        );
    }

    /// Feed one jittery path through three preset bands and check the
    /// output wobble never grows with the level.
    #[test]
    fn test_higher_levels_do_not_increase_variance() {
        fn jittery_path() -> Vec<PointerSample> {
            (0..60)
                .map(|i| {
                    let wobble = if i % 2 == 0 { 2.0 } else { -2.0 };
                    PointerSample::new(i as f64 * 3.0, wobble, 0.5)
                })
                .collect()
        }

        fn y_variance(points: &[PointerSample]) -> f64 {
            let mean = points.iter().map(|p| p.y).sum::<f64>() / points.len() as f64;
            points.iter().map(|p| (p.y - mean).powi(2)).sum::<f64>() / points.len() as f64
        }

        let mut variances = Vec::new();
        for level in [10, 50, 90] {
            let mut pointer = pointer_for_level(level);
            // add_points is synchronous regardless of the batching mode
            pointer.add_points(&jittery_path());
            variances.push(y_variance(pointer.all_points()));
        }

        assert!(variances[1] <= variances[0]);
        assert!(variances[2] <= variances[1] + 0.05);
        // The smoothed bands are dramatically calmer than noise-only
        assert!(variances[1] < variances[0] * 0.5);
    }
}
