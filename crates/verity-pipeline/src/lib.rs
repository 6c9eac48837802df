//! Verity Pipeline
//!
//! The claim fan-out dispatcher: turn one validated query into extracted
//! claims, verify them in fixed-size concurrent batches, and feed an
//! in-memory results sink with immutable completion records.
//!
//! # Flow
//!
//! 1. Validate the query locally (no network on rejection)
//! 2. One extraction call; the query itself is the fallback claim
//! 3. Batches of three: all members of a batch in flight together, batches
//!    strictly in input order, one member's failure isolated from siblings
//! 4. Completion records appended to the sink in completion order
//! 5. Best-effort side calls (task-id attachment) go through an explicit
//!    queue that never blocks or fails the primary flow
//!
//! Cancellation is cooperative and coarse: the flag is polled between
//! batches, and a dispatched batch always runs to completion.

#![warn(missing_docs)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod sink;
pub mod tasks;


pub use config::PipelineConfig;
pub use dispatcher::{CancelFlag, DispatchSummary, Dispatcher};
pub use error::PipelineError;
pub use sink::{Progress, ResultsSink};
pub use tasks::{SideTask, SideTaskMetrics, SideTaskQueue};
