//! Operational throughput log, appended every 100 blocks.
//!
//! Telemetry only, never authoritative state. Throughput derives from the
//! monotonic clock that timed the blocks, not from a fixed divisor.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;

/// Blocks between appended summary lines.
const CHECKPOINT_INTERVAL: u64 = 100;

/// Accumulates per-block metrics and appends a summary line to
/// `checkpoint.txt` every [`CHECKPOINT_INTERVAL`] blocks.
pub struct CheckpointLog {
    path: PathBuf,
    started: Instant,
    blocks: u64,
    transactions: u64,
    window_transactions: u64,
    window_execution: Duration,
}

impl CheckpointLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            started: Instant::now(),
            blocks: 0,
            transactions: 0,
            window_transactions: 0,
            window_execution: Duration::ZERO,
        }
    }

    /// Record one adopted or proposed block.
    pub fn record_block(&mut self, batch_size: usize, execution_time: Duration) {
        self.blocks += 1;
        self.transactions += batch_size as u64;
        self.window_transactions += batch_size as u64;
        self.window_execution += execution_time;

        if self.blocks % CHECKPOINT_INTERVAL == 0 {
            self.append();
            self.window_transactions = 0;
            self.window_execution = Duration::ZERO;
        }
    }

    fn append(&self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        let tps = if elapsed > 0.0 {
            self.transactions as f64 / elapsed
        } else {
            0.0
        };
        let line = format!(
            "blocks={} window_txs={} window_exec_ms={} cumulative_tps={:.2}\n",
            self.blocks,
            self.window_transactions,
            self.window_execution.as_millis(),
            tps
        );

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(err) = result {
            warn!("[rb-gen] checkpoint append failed: {}", err);
        }
    }
}
