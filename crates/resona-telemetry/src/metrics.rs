//! Metric names and recording helpers

use std::time::Duration;

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter},
};

/// Instrumentation scope for every Resona metric
pub const METER_NAME: &str = "resona";

// Music generation metric names
pub const MUSIC_GENERATION_DURATION: &str = "music.generation.duration";
pub const MUSIC_GENERATION_COUNT: &str = "music.generation.count";

// Audio store metric names
pub const AUDIO_DOWNLOAD_COUNT: &str = "audio.download.count";
pub const AUDIO_DOWNLOAD_BYTES: &str = "audio.download.bytes";

/// Meter bound to the global provider
///
/// Without an exporter configured the global provider is a no-op, so
/// instruments created from it are free to record into.
pub fn meter() -> Meter {
    opentelemetry::global::meter(METER_NAME)
}

/// Instruments for remote generation calls
#[derive(Clone)]
pub struct GenerationMetrics {
    duration: Histogram<f64>,
    count: Counter<u64>,
}

impl GenerationMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            duration: meter
                .f64_histogram(MUSIC_GENERATION_DURATION)
                .with_unit("s")
                .with_description("Wall time of remote music generation calls")
                .build(),
            count: meter
                .u64_counter(MUSIC_GENERATION_COUNT)
                .with_description("Remote music generation calls by outcome")
                .build(),
        }
    }

    /// Record one finished generation call
    pub fn record(&self, elapsed: Duration, model: &str, success: bool) {
        let attributes = [
            KeyValue::new("model", model.to_string()),
            KeyValue::new("outcome", if success { "success" } else { "failure" }),
        ];

        self.duration.record(elapsed.as_secs_f64(), &attributes);
        self.count.add(1, &attributes);
    }
}

/// Instruments for background audio downloads
#[derive(Clone)]
pub struct DownloadMetrics {
    count: Counter<u64>,
    bytes: Counter<u64>,
}

impl DownloadMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            count: meter
                .u64_counter(AUDIO_DOWNLOAD_COUNT)
                .with_description("Background audio downloads by outcome")
                .build(),
            bytes: meter
                .u64_counter(AUDIO_DOWNLOAD_BYTES)
                .with_unit("By")
                .with_description("Bytes written to the audio store")
                .build(),
        }
    }

    /// Record a completed download
    pub fn record_success(&self, bytes: u64) {
        self.count.add(1, &[KeyValue::new("outcome", "success")]);
        self.bytes.add(bytes, &[]);
    }

    /// Record a failed download
    pub fn record_failure(&self) {
        self.count.add(1, &[KeyValue::new("outcome", "failure")]);
    }
}
