//! Micro-benchmark regression guard.
//!
//! Times a unit of work, stores the first timing ever seen for a name as an immutable
//! baseline, and on later runs fails when the fresh timing is slower than the baseline
//! by more than a threshold ratio.
//!
//! ```no_run
//! use perf_baseline::{Baseline, Target};
//!
//! fn add(a: u64, b: u64) -> u64 {
//!     a + b
//! }
//!
//! let mut baseline = Baseline::open(".perf-baseline", Some(2.0))?;
//! baseline.set_or_compare(&mut Target::call(|| add(2, 3)), Some("add"))?;
//! # Ok::<(), perf_baseline::BaselineError>(())
//! ```
//!
//! Baselines are only meaningful on the machine that recorded them; do not commit
//! the store file. Delete it to recalibrate.

pub mod baseline;
pub mod cli;
pub mod comparison;
pub mod config;
pub mod errors;
pub mod expr;
pub mod record;
pub mod report;
pub mod store;
pub mod target;
pub mod timer;

pub use crate::baseline::{Baseline, current_test_name};
pub use crate::comparison::{Comparison, DEFAULT_THRESHOLD};
pub use crate::config::BaselineConfig;
pub use crate::errors::{BaselineError, BoxError, StorageError};
pub use crate::expr::Namespace;
pub use crate::record::{BaselineRecord, Insertion};
pub use crate::report::{MemoryReporter, Reporter, TracingReporter};
pub use crate::store::{BaselineStore, StoreOptions};
pub use crate::target::{Kwargs, Target, Value};
pub use crate::timer::{Measurement, Timer, TimerConfig};
