use clock::Timestamp;
use std::sync::Mutex;

/// One rolling window: `bucket_count` buckets of `resolution_secs` seconds each, covering a
/// span of `bucket_count * resolution_secs` seconds.
#[derive(Clone, Copy, Debug)]
pub struct WindowSpec {
    pub label: &'static str,
    pub resolution_secs: i64,
    pub bucket_count: i64,
}

impl WindowSpec {
    pub const fn new(label: &'static str, resolution_secs: i64, bucket_count: i64) -> Self {
        WindowSpec {
            label,
            resolution_secs,
            bucket_count,
        }
    }
}

/// The three windows every `SlidingWindowCounter` tracks unless told otherwise: one minute in
/// one-second buckets, one hour in one-minute buckets, one day in one-hour buckets.
pub const DEFAULT_WINDOWS: [WindowSpec; 3] = [
    WindowSpec::new("1m", 1, 60),
    WindowSpec::new("1h", 60, 60),
    WindowSpec::new("1d", 3600, 24),
];

struct BucketState {
    epoch: i64,
    success: u64,
    failure: u64,
}

struct Bucket {
    state: Mutex<BucketState>,
}

impl Bucket {
    fn new() -> Self {
        Bucket {
            state: Mutex::new(BucketState {
                epoch: i64::MIN,
                success: 0,
                failure: 0,
            }),
        }
    }
}

/// One rolling window's ring of buckets.
///
/// Grounded on `metrics-rs-metrics`'s `AtomicWindowedHistogram`: a fixed ring of buckets keyed
/// by the current time divided into `resolution_secs`-wide slots, with stale buckets reset
/// lazily the next time they are touched rather than swept by a background task. Rendered here
/// with a per-bucket [Mutex] instead of a bare `AtomicU64`, since the specification allows a
/// coarse per-bucket lock as long as one counter's update never blocks on another counter's.
struct Window {
    spec: WindowSpec,
    buckets: Vec<Bucket>,
}

impl Window {
    fn new(spec: WindowSpec) -> Self {
        let buckets = (0..spec.bucket_count).map(|_| Bucket::new()).collect();
        Window { spec, buckets }
    }

    fn epoch_for(&self, now: Timestamp) -> i64 {
        now.unix_timestamp().div_euclid(self.spec.resolution_secs)
    }

    fn bucket_index(&self, epoch: i64) -> usize {
        epoch.rem_euclid(self.spec.bucket_count) as usize
    }

    fn increment(&self, success: bool, now: Timestamp) {
        let epoch = self.epoch_for(now);
        let mut state = self.buckets[self.bucket_index(epoch)]
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.epoch != epoch {
            state.epoch = epoch;
            state.success = 0;
            state.failure = 0;
        }
        if success {
            state.success += 1;
        } else {
            state.failure += 1;
        }
    }

    /// Sums every bucket whose stored epoch still falls within the live window, resetting
    /// (rather than merely skipping) buckets that have aged out so a long idle period does not
    /// leave stale counts behind for the next writer to find already primed.
    fn counts(&self, now: Timestamp) -> (u64, u64, i64) {
        let current_epoch = self.epoch_for(now);
        let min_epoch = current_epoch - self.spec.bucket_count + 1;
        let mut success = 0u64;
        let mut failure = 0u64;
        for bucket in &self.buckets {
            let mut state = bucket
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if state.epoch >= min_epoch && state.epoch <= current_epoch {
                success += state.success;
                failure += state.failure;
            } else if state.epoch != i64::MIN {
                state.epoch = i64::MIN;
                state.success = 0;
                state.failure = 0;
            }
        }
        let window_start_epoch_millis = min_epoch * self.spec.resolution_secs * 1000;
        (success, failure, window_start_epoch_millis)
    }
}

/// One count plus the epoch-millis timestamp its covering window started at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Measurement {
    pub count: u64,
    pub window_start_epoch_millis: i64,
}

/// Rolling success/failure counters over a fixed list of windows (defaults: one minute, one
/// hour, one day). `increment` is non-blocking with respect to any other counter: it only ever
/// touches one bucket of its own windows.
pub struct SlidingWindowCounter {
    windows: Vec<Window>,
}

impl SlidingWindowCounter {
    pub fn new() -> Self {
        Self::with_windows(&DEFAULT_WINDOWS)
    }

    pub fn with_windows(specs: &[WindowSpec]) -> Self {
        SlidingWindowCounter {
            windows: specs.iter().copied().map(Window::new).collect(),
        }
    }

    pub fn increment(&self, success: bool, now: Timestamp) {
        for window in &self.windows {
            window.increment(success, now);
        }
    }

    /// One `Measurement` per configured window, keyed by the window's label (`"1m"`, `"1h"`,
    /// `"1d"` by default), counting either the successes or the failures depending on
    /// `success`.
    pub fn measurement(&self, success: bool, now: Timestamp) -> Vec<(&'static str, Measurement)> {
        self.windows
            .iter()
            .map(|window| {
                let (s, f, window_start_epoch_millis) = window.counts(now);
                let count = if success { s } else { f };
                (
                    window.spec.label,
                    Measurement {
                        count,
                        window_start_epoch_millis,
                    },
                )
            })
            .collect()
    }
}

impl Default for SlidingWindowCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock::Clock;
    use time::Duration;

    #[test]
    fn counts_only_increments_within_the_configured_resolution() {
        let windows = [WindowSpec::new("test", 10, 3)];
        let counter = SlidingWindowCounter::with_windows(&windows);
        let t0 = clock::WallClock.now();

        counter.increment(true, t0);
        counter.increment(false, t0 + Duration::seconds(1));

        let measurements = counter.measurement(true, t0 + Duration::seconds(2));
        assert_eq!(measurements[0].1.count, 1);
        let failures = counter.measurement(false, t0 + Duration::seconds(2));
        assert_eq!(failures[0].1.count, 1);
    }

    #[test]
    fn buckets_older_than_the_window_do_not_count() {
        let windows = [WindowSpec::new("test", 1, 3)];
        let counter = SlidingWindowCounter::with_windows(&windows);
        let t0 = clock::WallClock.now();

        counter.increment(true, t0);
        let later = t0 + Duration::seconds(10);
        let measurements = counter.measurement(true, later);
        assert_eq!(measurements[0].1.count, 0);
    }

    #[test]
    fn a_stale_bucket_is_reused_correctly_after_full_rollover() {
        let windows = [WindowSpec::new("test", 1, 2)];
        let counter = SlidingWindowCounter::with_windows(&windows);
        let t0 = clock::WallClock.now();

        counter.increment(true, t0);
        counter.increment(true, t0 + Duration::seconds(4));
        let measurements = counter.measurement(true, t0 + Duration::seconds(4));
        assert_eq!(measurements[0].1.count, 1);
    }

    #[test]
    fn default_counter_reports_one_measurement_per_default_window() {
        let counter = SlidingWindowCounter::new();
        let now = clock::WallClock.now();
        counter.increment(true, now);
        let measurements = counter.measurement(true, now);
        assert_eq!(measurements.len(), DEFAULT_WINDOWS.len());
        assert!(measurements.iter().all(|(_, m)| m.count == 1));
    }
}
