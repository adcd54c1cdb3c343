//! Hierarchical report documents for loadeval.
//!
//! Reports are assembled incrementally by several components: the run
//! coordinator opens `run_info`, system probes append their own blocks, and
//! the load group hands over a finished `loads` subtree. The
//! [`ReportBuilder`] keeps an explicit stack of open nodes so that every
//! opened block must be closed before the document can be finalized.
//!
//! # Example
//!
//! ```
//! use report_doc::ReportBuilder;
//!
//! let mut builder = ReportBuilder::new();
//! builder.new_document("loadeval", [("version", "0.1.0")])?;
//! builder.open_block_with("run_info", [("days", "0"), ("hours", "1")])?;
//! builder.tagged_value("date", "2024-01-01")?;
//! builder.close_block()?;
//! builder.close()?;
//!
//! let mut out = Vec::new();
//! builder.serialize(&mut out, None)?;
//! assert!(String::from_utf8(out).unwrap().contains("<run_info days=\"0\" hours=\"1\">"));
//! # Ok::<(), report_doc::DocError>(())
//! ```

pub mod builder;
pub mod error;
pub mod node;
pub mod transform;
mod xml;

pub use builder::ReportBuilder;
pub use error::DocError;
pub use node::Node;
pub use transform::{JsonTransform, Transform};
