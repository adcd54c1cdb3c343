//! Output transforms applied at serialization time.

use crate::error::DocError;
use crate::node::Node;
use std::io::Write;

/// Renders a closed document into another representation.
///
/// Template-based renderers live outside this crate; they only need to
/// implement this trait to be handed to [`crate::ReportBuilder::serialize`].
pub trait Transform {
    fn transform(&self, root: &Node, out: &mut dyn Write) -> Result<(), DocError>;
}

/// Writes the document tree as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransform {
    pub pretty: bool,
}

impl Transform for JsonTransform {
    fn transform(&self, root: &Node, out: &mut dyn Write) -> Result<(), DocError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, root)?;
        } else {
            serde_json::to_writer(&mut *out, root)?;
        }
        writeln!(out)?;
        Ok(())
    }
}
