//! Op timer: wall-clock latency of processed operations
//!
//! Thread-safe and shared by every worker. Keeps a rolling window of recent
//! latencies for percentiles plus per-operation counts and totals.
//!
//! ```
//! use std::sync::Arc;
//! use gremlin_op::server::timer::OpTimer;
//!
//! let timer = Arc::new(OpTimer::new());
//! {
//!     let _context = timer.time("bytecode");
//!     // ... execute ...
//! }
//! assert_eq!(timer.snapshot().count, 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Number of recent latencies kept for percentiles.
const LATENCY_WINDOW_SIZE: usize = 1000;

#[derive(Debug)]
pub struct OpTimer {
    count: AtomicU64,
    latencies_us: Mutex<VecDeque<u64>>,
    latency_sum_us: AtomicU64,
    /// op -> (count, total microseconds)
    per_op: Mutex<HashMap<String, (u64, u64)>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub count: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub avg_us: u64,
    /// (op, count, average microseconds), most frequent first
    pub ops: Vec<(String, u64, u64)>,
}

impl OpTimer {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            latencies_us: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW_SIZE)),
            latency_sum_us: AtomicU64::new(0),
            per_op: Mutex::new(HashMap::new()),
        }
    }

    /// Start timing `op`; the elapsed time is recorded when the returned
    /// context is dropped or stopped. The context may move to another thread.
    pub fn time(self: &Arc<Self>, op: &str) -> TimerContext {
        TimerContext {
            timer: Arc::clone(self),
            op: op.to_string(),
            started: Instant::now(),
            stopped: false,
        }
    }

    pub fn record(&self, op: &str, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);

        {
            let mut latencies = self.latencies_us.lock().unwrap_or_else(|e| e.into_inner());
            if latencies.len() >= LATENCY_WINDOW_SIZE {
                if let Some(old) = latencies.pop_front() {
                    self.latency_sum_us.fetch_sub(old, Ordering::Relaxed);
                }
            }
            latencies.push_back(micros);
            self.latency_sum_us.fetch_add(micros, Ordering::Relaxed);
        }

        let mut per_op = self.per_op.lock().unwrap_or_else(|e| e.into_inner());
        let entry = per_op.entry(op.to_string()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(micros);
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let (p50_us, p95_us, p99_us, avg_us) = {
            let latencies = self.latencies_us.lock().unwrap_or_else(|e| e.into_inner());
            if latencies.is_empty() {
                (0, 0, 0, 0)
            } else {
                let mut sorted: Vec<u64> = latencies.iter().copied().collect();
                sorted.sort_unstable();
                let len = sorted.len();
                (
                    sorted[len * 50 / 100],
                    sorted[len * 95 / 100],
                    sorted[len * 99 / 100],
                    self.latency_sum_us.load(Ordering::Relaxed) / len as u64,
                )
            }
        };

        let mut ops: Vec<(String, u64, u64)> = self
            .per_op
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(op, &(count, total))| (op.clone(), count, total / count.max(1)))
            .collect();
        ops.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        TimerSnapshot {
            count: self.count.load(Ordering::Relaxed),
            p50_us,
            p95_us,
            p99_us,
            avg_us,
            ops,
        }
    }
}

impl Default for OpTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Records into its timer exactly once.
pub struct TimerContext {
    timer: Arc<OpTimer>,
    op: String,
    started: Instant,
    stopped: bool,
}

impl TimerContext {
    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if !self.stopped {
            self.stopped = true;
            self.timer.record(&self.op, elapsed);
        }
        elapsed
    }
}

impl Drop for TimerContext {
    fn drop(&mut self) {
        self.finish();
    }
}
