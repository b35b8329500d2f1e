//! # memstress
//!
//! Allocates a run of large heap blocks one at a time, stamps each with a
//! recognizable letter, then verifies and releases them in the same order,
//! pausing after every step. Watching the process from an external monitor
//! shows resident memory climbing and falling in block-sized steps.
//!
//! Standard output carries only the progress lines:
//!
//! ```text
//! Allocated 25 MB
//! Allocated 50 MB
//! ...
//! Freed 25 MB
//! buffer[1][0] != b
//! Freed 50 MB
//! ```
//!
//! Blocks come from the global allocator ([`HeapSource`]), so whatever
//! `malloc` the process runs with is the one being exercised. [`PageSource`]
//! maps pages directly instead, for comparison. Diagnostics go through the
//! `log` facade.
//!
//! ## Example
//!
//! ```rust,no_run
//! use memstress::{Driver, HeapSource, StressConfig};
//! use std::time::Duration;
//!
//! let config = StressConfig {
//!     max_blocks: 4,
//!     block_mib: 1,
//!     delay: Duration::ZERO,
//! };
//! let mut driver = Driver::new(config, HeapSource::new(), std::io::sink())?;
//! let summary = driver.run();
//! assert_eq!(summary.allocated, summary.freed);
//! # Ok::<(), memstress::StressError>(())
//! ```

mod block;
pub mod config;
mod driver;
mod error;
mod pattern;
mod report;
mod source;

use std::io::Write;

pub use block::{Block, BlockTable, Mismatch, Region};
pub use config::StressConfig;
pub use driver::{Driver, ReleaseSummary, RunSummary, StopReason};
pub use error::StressError;
pub use pattern::{fill_byte, ALPHABET};
pub use report::Reporter;
pub use source::{BlockSource, HeapSource, PageSource};

/// Runs the fixed-parameter stress cycle against the system heap, writing
/// progress to standard output.
pub fn run() -> Result<RunSummary, StressError> {
    let stdout = std::io::stdout();
    run_to(StressConfig::default(), stdout.lock())
}

/// Runs one heap-backed cycle with `config`, writing progress to `out`.
pub fn run_to<W: Write>(config: StressConfig, out: W) -> Result<RunSummary, StressError> {
    let mut driver = Driver::new(config, HeapSource::new(), out)?;
    Ok(driver.run())
}
