use std::time::{Duration, Instant};

/// The stages of one CLI run, in the order they execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Parse,
    Transform,
    Write,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::Parse => "parse",
            Stage::Transform => "transform",
            Stage::Write => "write",
        }
    }
}

/// Wall-clock time per stage, recorded only with `--profile`
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(Stage, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, stage: Stage, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        println!("⏱️  {}: {:.3}ms", stage.label(), millis(elapsed));
        self.timings.push((stage, elapsed));
        result
    }

    pub fn elapsed(&self, stage: Stage) -> Option<Duration> {
        self.timings
            .iter()
            .find(|(recorded, _)| *recorded == stage)
            .map(|(_, elapsed)| *elapsed)
    }

    /// Stage timings in milliseconds, keyed by stage label
    pub fn to_json(&self) -> serde_json::Value {
        self.timings
            .iter()
            .map(|(stage, elapsed)| (stage.label().to_string(), serde_json::json!(millis(*elapsed))))
            .collect::<serde_json::Map<_, _>>()
            .into()
    }

    pub fn print_summary(&self) {
        if self.timings.is_empty() {
            return;
        }

        println!("\n📊 Timing Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (stage, elapsed) in &self.timings {
            println!("   {:.<20} {:.3}ms", stage.label(), millis(*elapsed));
        }
        println!("   {:.<20} {:.3}ms", "total", millis(total));
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let mut profiler = StepProfiler::new(false);
        assert_eq!(profiler.time_step(Stage::Parse, || 2 + 2), 4);
        assert_eq!(profiler.elapsed(Stage::Parse), None);
        assert_eq!(profiler.to_json(), serde_json::json!({}));
    }

    #[test]
    fn test_enabled_profiler_reports_each_stage() {
        let mut profiler = StepProfiler::new(true);
        profiler.time_step(Stage::Parse, || ());
        profiler.time_step(Stage::Transform, || ());

        assert!(profiler.elapsed(Stage::Transform).is_some());
        assert!(profiler.elapsed(Stage::Write).is_none());
        let json = profiler.to_json();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["parse", "transform"]);
    }
}
