// profiler.rs
// Per-stage timing of an experiment run (read, collect, refine, tabulate)

use std::fmt;
use std::time::{Duration, Instant};

/// A timed part of `run_experiment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading every input file, headers included.
    Read,
    /// One file's bytes, gunzipped when needed, split into lines.
    FileLines,
    Collect,
    Refine,
    Tabulate,
}

impl Stage {
    pub const ALL: [Stage; 5] = [Stage::Read, Stage::FileLines, Stage::Collect, Stage::Refine, Stage::Tabulate];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::FileLines => "file lines",
            Stage::Collect => "collect",
            Stage::Refine => "refine",
            Stage::Tabulate => "tabulate",
        }
    }
}

/// Accumulated time and entry count of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTiming {
    pub total: Duration,
    pub calls: u32,
}

impl fmt::Display for StageTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} over {} call(s)", self.total, self.calls)
    }
}

#[derive(Debug, Default)]
pub struct Profiler {
    timings: [StageTiming; Stage::ALL.len()],
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        let timing = &mut self.timings[stage.index()];
        timing.total += elapsed;
        timing.calls += 1;
    }

    pub fn finish(&mut self, guard: &ProfilerGuard) {
        self.record(guard.stage, guard.start.elapsed());
    }

    pub fn timing(&self, stage: Stage) -> StageTiming {
        self.timings[stage.index()]
    }

    /// Entered stages in pipeline order.
    pub fn report(&self) -> Vec<(Stage, StageTiming)> {
        Stage::ALL
            .iter()
            .map(|&stage| (stage, self.timing(stage)))
            .filter(|(_, timing)| timing.calls > 0)
            .collect()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn log_and_clear(&mut self) {
        for (stage, timing) in self.report() {
            log::debug!("{:<12} {}", stage.label(), timing);
        }
        self.clear();
    }
}

pub struct ProfilerGuard {
    stage: Stage,
    start: Instant,
}

/// Start timing `stage`. The guard updates the global profiler when dropped.
pub fn start(stage: Stage) -> ProfilerGuard {
    ProfilerGuard { stage, start: Instant::now() }
}

#[cfg(feature = "profiling")]
impl Drop for ProfilerGuard {
    fn drop(&mut self) {
        crate::PROFILER.lock().finish(self);
    }
}

/// Time the rest of the enclosing scope as the named `Stage` when the
/// `profiling` feature is enabled, e.g. `profile_scope!(Refine)`.
#[macro_export]
macro_rules! profile_scope {
    ($stage:ident) => {
        #[cfg(feature = "profiling")]
        let _guard = $crate::profiler::start($crate::profiler::Stage::$stage);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_follows_pipeline_order_and_skips_idle_stages() {
        let mut profiler = Profiler::new();
        profiler.record(Stage::Refine, Duration::from_millis(9));
        profiler.record(Stage::FileLines, Duration::from_millis(2));
        profiler.record(Stage::FileLines, Duration::from_millis(1));
        let report = profiler.report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].0, Stage::FileLines);
        assert_eq!(
            report[0].1,
            StageTiming {
                total: Duration::from_millis(3),
                calls: 2
            }
        );
        assert_eq!(report[1].0, Stage::Refine);
    }

    #[test]
    fn log_and_clear_resets_every_stage() {
        let mut profiler = Profiler::new();
        profiler.record(Stage::Collect, Duration::from_millis(4));
        profiler.log_and_clear();
        assert!(profiler.report().is_empty());
        assert_eq!(profiler.timing(Stage::Collect), StageTiming::default());
    }

    #[test]
    fn finishing_a_guard_counts_one_call() {
        let mut profiler = Profiler::new();
        let guard = start(Stage::Tabulate);
        profiler.finish(&guard);
        assert_eq!(profiler.timing(Stage::Tabulate).calls, 1);
        assert_eq!(Stage::Tabulate.label(), "tabulate");
    }
}
