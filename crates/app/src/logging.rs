use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;
use voxshade_core::{ProgressEvent, ProgressSink};

pub(crate) fn parse_level(name: &str) -> Result<LevelFilter, String> {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::OFF),
        "error" => Ok(LevelFilter::ERROR),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        other => Err(format!("unknown log level '{other}'")),
    }
}

/// Installs the stderr subscriber. Our own targets log at `level`, everything
/// else at WARN.
pub(crate) fn setup_tracing(level: LevelFilter) {
    let filter_layer = tracing_subscriber::filter::filter_fn(move |metadata| {
        let is_voxshade = metadata.target().starts_with("voxshade");
        let effective = if is_voxshade {
            level
        } else {
            LevelFilter::from_level(Level::WARN).min(level)
        };
        metadata.level() <= &effective
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter_layer))
        .init();
}

/// Progress sink that turns refinement progress into log lines.
pub(crate) fn progress_sink() -> ProgressSink {
    Arc::new(|event: ProgressEvent| match event {
        ProgressEvent::Start { iterations } => tracing::debug!(iterations, "refinement started"),
        ProgressEvent::Advance { epoch, fraction } => {
            tracing::debug!(epoch, percent = (fraction * 100.0).round() as u32, "progress")
        }
        ProgressEvent::Finish { epochs } => tracing::debug!(epochs, "refinement complete"),
    })
}
