use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Decouples the pipeline from where its progress goes, so the server, the
/// worker and tests can each observe a run without changing the pipeline.
pub trait PipelineLogger: Send {
    /// Record how long a named pipeline stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. segment count, output size).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger backed by the `log` facade. Keeps stage timings and metrics for
/// a summary at the end of the run.
pub struct LogPipelineLogger {
    timings: BTreeMap<String, f64>,
    metrics: BTreeMap<String, f64>,
    start_time: Instant,
    messages: Vec<String>,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!("Pipeline summary ({:.1}s total):", elapsed_ms / 1000.0)];

        for (stage, total_ms) in &self.timings {
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {stage:10}: {:8.1}s  ({pct:4.1}%)", total_ms / 1000.0));
        }
        for (name, value) in &self.metrics {
            lines.push(format!("  {name}: {value}"));
        }

        Some(lines.join("\n"))
    }

    /// Total milliseconds recorded for a stage.
    pub fn timing_for(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).copied()
    }

    pub fn metric_for(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        log::debug!("Stage {stage} took {duration_ms:.0}ms");
        *self.timings.entry(stage.to_string()).or_default() += duration_ms;
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.insert(name.to_string(), value);
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.timing("recognize", 5.0);
        logger.metric("segments", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_accumulates_per_stage() {
        let mut logger = LogPipelineLogger::new();
        logger.timing("diarize", 20.0);
        logger.timing("diarize", 30.0);
        logger.timing("transcode", 5.0);

        assert_relative_eq!(logger.timing_for("diarize").unwrap(), 50.0);
        assert_relative_eq!(logger.timing_for("transcode").unwrap(), 5.0);
        assert!(logger.timing_for("format").is_none());
    }

    #[test]
    fn test_metric_keeps_latest_value() {
        let mut logger = LogPipelineLogger::new();
        logger.metric("segments", 3.0);
        logger.metric("segments", 4.0);
        assert_relative_eq!(logger.metric_for("segments").unwrap(), 4.0);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = LogPipelineLogger::new();
        logger.timing("recognize", 1200.0);
        logger.timing("transcode", 40.0);
        logger.metric("segments", 12.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Pipeline summary"));
        assert!(summary.contains("recognize"));
        assert!(summary.contains("transcode"));
        assert!(summary.contains("segments: 12"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogPipelineLogger::new().summary_string().is_none());
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = LogPipelineLogger::new();
        logger.info("hello world");
        assert_eq!(logger.messages, vec!["hello world".to_string()]);
    }
}
