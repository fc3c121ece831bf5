use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone)]
pub struct StageTiming {
    pub name: String,
    pub duration: Duration,
    pub calls: u64,
}

/// Accumulated time spent in each processing stage over a scan.
#[derive(Debug, Default)]
pub struct StageTimings {
    order: Vec<String>,
    stages: HashMap<String, StageTiming>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        if !self.stages.contains_key(&name) {
            self.order.push(name.clone());
        }
        let entry = self.stages.entry(name.clone()).or_insert(StageTiming {
            name,
            duration: Duration::ZERO,
            calls: 0,
        });
        entry.duration += duration;
        entry.calls += 1;
    }

    pub fn record(&mut self, timer: Timer) {
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.values().map(|s| s.duration).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<&StageTiming> {
        self.stages.get(name)
    }

    pub fn steps(&self) -> impl Iterator<Item = &StageTiming> {
        self.order.iter().filter_map(|name| self.stages.get(name))
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.stages.clear();
    }

    pub fn log_summary(&self) {
        let total = self.total_duration();
        for step in self.steps() {
            let percentage = if total.as_secs_f64() > 0.0 {
                (step.duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            } else {
                0.0
            };
            debug!(
                "{:<12} {:>10.3}ms over {:>6} calls ({:>5.1}%)",
                step.name,
                step.duration.as_secs_f64() * 1000.0,
                step.calls,
                percentage
            );
        }
        debug!("{:<12} {:>10.3}ms", "total", total.as_secs_f64() * 1000.0);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_accumulate_in_first_seen_order() {
        let mut timings = StageTimings::new();
        timings.add_step("calibrate", Duration::from_millis(2));
        timings.add_step("raster", Duration::from_millis(1));
        timings.add_step("calibrate", Duration::from_millis(3));

        let names: Vec<_> = timings.steps().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["calibrate", "raster"]);

        let calibrate = timings.get_step("calibrate").unwrap();
        assert_eq!(calibrate.duration, Duration::from_millis(5));
        assert_eq!(calibrate.calls, 2);
        assert_eq!(timings.total_duration(), Duration::from_millis(6));
    }
}
