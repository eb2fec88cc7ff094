//! Blob content extraction: listing, line assembly, and event parsing.

pub mod assembler;
pub mod listing;
pub mod parser;

pub use assembler::LineAssembler;
pub use listing::{eligible_blobs, is_eligible};
pub use parser::{EventParser, LineOutcome, SkippedLine};
