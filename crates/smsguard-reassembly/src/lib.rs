//! SMS Guard Reassembly
//!
//! Turns a stream of transport segments into complete logical messages.
//!
//! Segments fall into three groups:
//! - tagged: concatenation metadata (decoded, or parsed from the user data
//!   header) correlates them by sender and reference; they are joined in
//!   index order once all parts arrived or the timeout fired
//! - suspected splits: untagged but long and carrying truncation markers;
//!   correlated by sender and arrival time and joined in arrival order
//! - everything else passes straight through
//!
//! Malformed metadata never fails a segment; it is handled as untagged.

pub mod config;
pub mod heuristics;
pub mod reassembler;
pub mod udh;

pub use config::ReassemblyConfig;
pub use heuristics::SplitDetector;
pub use reassembler::{MessageKey, ReassemblyStats, SegmentReassembler};
