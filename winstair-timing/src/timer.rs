use serde::Serialize;
use std::time::{Duration, Instant};

const DEFAULT_TOLERANCE: Duration = Duration::from_millis(2);
const MAX_SAMPLES: usize = 1000;

fn deviation(a: Duration, b: Duration) -> Duration {
    if a > b { a - b } else { b - a }
}

/// Outcome of one requested wait. Used for diagnostics only; control flow
/// never branches on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitAccuracy {
    pub requested: Duration,
    pub actual: Duration,
    pub precise: bool,
}

impl WaitAccuracy {
    /// Signed difference `actual - requested` in nanoseconds.
    pub fn error_ns(&self) -> f64 {
        self.actual.as_nanos() as f64 - self.requested.as_nanos() as f64
    }
}

/// Aggregate of the wait errors seen by a timer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaitStats {
    pub waits: usize,
    pub imprecise: usize,
    pub mean_error_ns: f64,
    pub jitter_ns: f64,
    pub min_error_ns: f64,
    pub max_error_ns: f64,
}

/// Timing service consumed by the trial loop.
pub trait Timer {
    /// Nanoseconds since the timer was created.
    fn now(&self) -> u64;
    fn sleep(&mut self, d: Duration);
    /// Largest deviation from a requested wait still counted as precise.
    fn tolerance(&self) -> Duration;
    fn record_wait(&mut self, accuracy: &WaitAccuracy);
    fn wait_stats(&self) -> WaitStats;

    fn elapsed(&self, since: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(since))
    }

    /// Blocks for `d` and reports how closely the wait was met.
    fn wait(&mut self, d: Duration) -> WaitAccuracy {
        let start = self.now();
        self.sleep(d);
        let actual = self.elapsed(start);
        let accuracy = WaitAccuracy {
            requested: d,
            actual,
            precise: deviation(actual, d) <= self.tolerance(),
        };
        self.record_wait(&accuracy);
        accuracy
    }

    /// Opens a fixed-length period; work done before `complete` counts
    /// against it.
    fn start_period(&self, d: Duration) -> StaticPeriod {
        StaticPeriod {
            start_ns: self.now(),
            duration: d,
        }
    }
}

/// A fixed-duration window that absorbs whatever work happens inside it.
#[derive(Debug, Clone, Copy)]
pub struct StaticPeriod {
    start_ns: u64,
    duration: Duration,
}

impl StaticPeriod {
    /// Sleeps out the remainder of the period. Imprecise when the work inside
    /// the period overran it.
    pub fn complete<T: Timer + ?Sized>(self, timer: &mut T) -> WaitAccuracy {
        let spent = timer.elapsed(self.start_ns);
        if let Some(remaining) = self.duration.checked_sub(spent) {
            timer.sleep(remaining);
        }
        let actual = timer.elapsed(self.start_ns);
        let accuracy = WaitAccuracy {
            requested: self.duration,
            actual,
            precise: deviation(actual, self.duration) <= timer.tolerance(),
        };
        timer.record_wait(&accuracy);
        accuracy
    }
}

#[derive(Debug, Clone, Default)]
struct ErrorSamples {
    errors_ns: Vec<f64>,
    imprecise: usize,
    total: usize,
}

impl ErrorSamples {
    fn push(&mut self, accuracy: &WaitAccuracy) {
        if self.errors_ns.len() >= MAX_SAMPLES {
            self.errors_ns.remove(0);
        }
        self.errors_ns.push(accuracy.error_ns());
        self.total += 1;
        if !accuracy.precise {
            self.imprecise += 1;
        }
    }

    fn stats(&self) -> WaitStats {
        if self.errors_ns.is_empty() {
            return WaitStats::default();
        }
        let n = self.errors_ns.len() as f64;
        let mean = self.errors_ns.iter().sum::<f64>() / n;
        let var = self.errors_ns.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = self.errors_ns.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.errors_ns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        WaitStats {
            waits: self.total,
            imprecise: self.imprecise,
            mean_error_ns: mean,
            jitter_ns: var.sqrt(),
            min_error_ns: min,
            max_error_ns: max,
        }
    }
}

/// Wall-clock timer with platform-specific precise sleeping.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub tolerance: Duration,
    samples: ErrorSamples,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn sleep(&mut self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn tolerance(&self) -> Duration {
        self.tolerance
    }
    fn record_wait(&mut self, accuracy: &WaitAccuracy) {
        self.samples.push(accuracy);
    }
    fn wait_stats(&self) -> WaitStats {
        self.samples.stats()
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            tolerance: DEFAULT_TOLERANCE,
            samples: ErrorSamples::default(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

        if duration.as_nanos() < 100_000 {
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);

                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic clock that only moves when slept or advanced. Every wait is
/// exact, so dry runs finish instantly.
#[derive(Debug, Clone, Default)]
pub struct VirtualTimer {
    now_ns: u64,
    samples: ErrorSamples,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward as if work took `d`.
    pub fn advance(&mut self, d: Duration) {
        self.now_ns += d.as_nanos() as u64;
    }
}

impl Timer for VirtualTimer {
    fn now(&self) -> u64 {
        self.now_ns
    }
    fn sleep(&mut self, d: Duration) {
        self.advance(d);
    }
    fn tolerance(&self) -> Duration {
        DEFAULT_TOLERANCE
    }
    fn record_wait(&mut self, accuracy: &WaitAccuracy) {
        self.samples.push(accuracy);
    }
    fn wait_stats(&self) -> WaitStats {
        self.samples.stats()
    }
}
