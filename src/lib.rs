//! Steadyink - real-time pointer stabilization for low-latency pen input
//!
//! Turns a noisy, bursty stream of pointer/stylus samples into a
//! stabilized stream of drawing points. The host feeds platform events or
//! pre-localized samples into a [`stabilizer::StabilizedPointer`] and
//! renders from the flushed buffer; `finish()` ends the stroke at the
//! true pen-up position.

pub mod input;
pub mod stabilizer;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for hosts that embed the crate directly.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steadyink=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("steadyink initializing...");
}
