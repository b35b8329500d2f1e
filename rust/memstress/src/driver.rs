//! The allocate-stamp-pause loop and the verify-release-pause loop.

use crate::block::BlockTable;
use crate::config::StressConfig;
use crate::error::StressError;
use crate::report::Reporter;
use crate::source::BlockSource;
use log::{debug, error, info, warn};
use std::io::Write;
use std::thread;

/// Why the allocation phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every slot in the table was filled.
    CapReached,
    /// The source refused the request for block `index`.
    Exhausted { index: usize, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub freed: usize,
    pub mismatches: usize,
    /// Blocks the source failed to take back. They still count as freed.
    pub release_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub allocated: usize,
    pub freed: usize,
    pub mismatches: usize,
    pub release_failures: usize,
    /// Progress lines that could not be written to the output.
    pub write_failures: usize,
    pub stop: StopReason,
}

/// Drives one stress run against a [`BlockSource`], reporting to `W`.
pub struct Driver<S: BlockSource, W: Write> {
    config: StressConfig,
    source: S,
    reporter: Reporter<W>,
}

impl<S: BlockSource, W: Write> Driver<S, W> {
    pub fn new(config: StressConfig, source: S, out: W) -> Result<Self, StressError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            reporter: Reporter::new(out),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs both phases and returns what happened.
    pub fn run(&mut self) -> RunSummary {
        info!(
            "Starting run: up to {} blocks of {} MiB, {:?} between steps",
            self.config.max_blocks, self.config.block_mib, self.config.delay
        );
        let (table, stop) = self.allocate_phase();
        let allocated = table.len();
        let released = self.release_phase(table);
        info!(
            "Run finished: {} allocated, {} freed, {} mismatches",
            allocated, released.freed, released.mismatches
        );

        RunSummary {
            allocated,
            freed: released.freed,
            mismatches: released.mismatches,
            release_failures: released.release_failures,
            write_failures: self.reporter.write_failures(),
            stop,
        }
    }

    /// Allocates and stamps blocks until the table is full or the source
    /// refuses a request. Never retries.
    pub fn allocate_phase(&mut self) -> (BlockTable, StopReason) {
        let size = self.config.block_bytes();
        let mut table = BlockTable::with_capacity(self.config.max_blocks);

        while !table.is_full() {
            let index = table.len();
            let region = match self.source.allocate(size) {
                Ok(region) => region,
                Err(e) => {
                    if e.is_exhaustion() {
                        warn!("Allocation of block {} failed, host is out of memory: {}", index, e);
                    } else {
                        warn!("Allocation of block {} failed: {}", index, e);
                    }
                    return (
                        table,
                        StopReason::Exhausted {
                            index,
                            reason: e.to_string(),
                        },
                    );
                }
            };

            let block = match table.stamp_next(region) {
                Ok(block) => block,
                Err(region) => {
                    // Only a full table refuses a region.
                    if let Err(e) = self.source.release(region) {
                        error!("Failed to release surplus block {}: {}", index, e);
                    }
                    break;
                }
            };
            debug!("Stamped block {} with '{}'", index, block.fill_byte() as char);

            self.reporter.allocated(self.config.megabytes(table.len()));
            self.pause();
        }

        info!("Allocation phase hit the {}-block cap", table.capacity());
        (table, StopReason::CapReached)
    }

    /// Verifies, releases and reports every block in allocation order.
    ///
    /// A mismatch or a failed release is counted and the loop moves on.
    pub fn release_phase(&mut self, mut table: BlockTable) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();

        for block in table.drain() {
            let index = block.index();
            if let Err(mismatch) = block.verify() {
                warn!(
                    "Block {} first byte is {:?}, expected '{}'",
                    index,
                    mismatch.found.map(char::from),
                    mismatch.expected as char
                );
                self.reporter.mismatch(mismatch.index, mismatch.expected);
                summary.mismatches += 1;
            }

            if let Err(e) = self.source.release(block.into_region()) {
                error!("Failed to release block {}: {}", index, e);
                summary.release_failures += 1;
            }

            summary.freed += 1;
            self.reporter.freed(self.config.megabytes(summary.freed));
            self.pause();
        }

        summary
    }

    /// Gives back the source and the output sink.
    pub fn into_parts(self) -> (S, W) {
        (self.source, self.reporter.into_inner())
    }

    fn pause(&self) {
        if !self.config.delay.is_zero() {
            thread::sleep(self.config.delay);
        }
    }
}
