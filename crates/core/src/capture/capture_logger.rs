use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for capture-session events.
///
/// Lets the sampler report progress without knowing whether the caller is a
/// terminal, a test or something with its own progress display.
pub trait CaptureLogger: Send {
    /// Report that sampling tick `tick` ran at playback time `time` seconds.
    fn tick(&mut self, tick: usize, time: f64);

    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per tick).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullCaptureLogger;

impl CaptureLogger for NullCaptureLogger {
    fn tick(&mut self, _tick: usize, _time: f64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger backed by the `log` crate that keeps per-stage timings and
/// metrics for a summary at the end of the session.
///
/// Tick output is throttled to every `throttle_ticks` ticks.
pub struct LogCaptureLogger {
    throttle_ticks: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    ticks: usize,
    messages: Vec<String>,
}

impl LogCaptureLogger {
    pub fn new(throttle_ticks: usize) -> Self {
        Self {
            throttle_ticks: throttle_ticks.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            ticks: 0,
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Capture summary ({} ticks, {elapsed_s:.1}s total):",
            self.ticks
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  max {:6.1}ms  total {total_ms:7.0}ms",
                mean(durations),
                durations.iter().copied().fold(0.0, f64::max)
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            lines.push(format!(
                "  {name}: avg {:.1}  total {:.0}",
                mean(values),
                values.iter().sum::<f64>()
            ));
        }

        if self.ticks > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Sampling rate: {:.1} ticks/s",
                self.ticks as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for LogCaptureLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl CaptureLogger for LogCaptureLogger {
    fn tick(&mut self, tick: usize, time: f64) {
        self.ticks = self.ticks.max(tick);
        if tick % self.throttle_ticks == 0 {
            log::info!("Sampling: tick {tick} at {time:.2}s");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
