//! Stack-disciplined document builder.

use crate::error::DocError;
use crate::node::Node;
use crate::transform::Transform;
use crate::xml;
use std::io::Write;
use tracing::{debug, warn};

#[derive(Debug)]
enum DocState {
    Empty,
    /// Open nodes, root first. The last entry is the current node.
    Open(Vec<Node>),
    Closed(Node),
}

/// Builds one report document at a time.
///
/// Blocks opened with [`open_block`](Self::open_block) stay current until the
/// matching [`close_block`](Self::close_block), which lets unrelated call sites
/// add children to a block another component opened. [`close`](Self::close)
/// only succeeds once every block is closed.
#[derive(Debug)]
pub struct ReportBuilder {
    state: DocState,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            state: DocState::Empty,
        }
    }

    /// Start a fresh document with the given root element.
    ///
    /// Fails if a previous document from this builder has not been closed yet.
    /// A closed document is discarded.
    pub fn new_document<I, K, V>(&mut self, root: &str, attrs: I) -> Result<(), DocError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        if matches!(self.state, DocState::Open(_)) {
            return Err(DocError::AlreadyOpen);
        }
        let node = element(root, attrs)?;
        debug!("New report document <{}>", root);
        self.state = DocState::Open(vec![node]);
        Ok(())
    }

    /// Open a block without attributes.
    pub fn open_block(&mut self, tag: &str) -> Result<(), DocError> {
        self.open_block_with(tag, std::iter::empty::<(String, String)>())
    }

    /// Open a block as a child of the current node and make it current.
    pub fn open_block_with<I, K, V>(&mut self, tag: &str, attrs: I) -> Result<(), DocError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let node = element(tag, attrs)?;
        self.open_stack()?.push(node);
        Ok(())
    }

    /// Close the current block and make its parent current.
    pub fn close_block(&mut self) -> Result<(), DocError> {
        let stack = self.open_stack()?;
        if stack.len() < 2 {
            return Err(DocError::NoOpenBlock);
        }
        if let Some(done) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.push_child(done);
            }
        }
        Ok(())
    }

    /// Append a text leaf without attributes to the current node.
    pub fn tagged_value(&mut self, tag: &str, value: impl Into<String>) -> Result<(), DocError> {
        self.tagged_value_with(tag, value, std::iter::empty::<(String, String)>())
    }

    /// Append a text leaf with attributes to the current node.
    pub fn tagged_value_with<I, K, V>(
        &mut self,
        tag: &str,
        value: impl Into<String>,
        attrs: I,
    ) -> Result<(), DocError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let leaf = element(tag, attrs)?.with_text(value);
        self.current()?.push_child(leaf);
        Ok(())
    }

    /// Graft a finished subtree as a child of the current node.
    pub fn append_subtree(&mut self, node: Node) -> Result<(), DocError> {
        check_names(&node)?;
        self.current()?.push_child(node);
        Ok(())
    }

    /// Number of blocks opened below the root and not yet closed.
    pub fn depth(&self) -> usize {
        match &self.state {
            DocState::Open(stack) => stack.len().saturating_sub(1),
            _ => 0,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DocState::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, DocState::Closed(_))
    }

    /// Freeze the document. Fails while blocks are still open.
    pub fn close(&mut self) -> Result<(), DocError> {
        match std::mem::replace(&mut self.state, DocState::Empty) {
            DocState::Open(mut stack) => {
                if stack.len() > 1 {
                    let depth = stack.len() - 1;
                    self.state = DocState::Open(stack);
                    return Err(DocError::UnclosedBlocks(depth));
                }
                match stack.pop() {
                    Some(root) => {
                        self.state = DocState::Closed(root);
                        Ok(())
                    }
                    None => Err(DocError::NoDocument),
                }
            }
            DocState::Closed(root) => {
                self.state = DocState::Closed(root);
                Err(DocError::AlreadyClosed)
            }
            DocState::Empty => Err(DocError::NoDocument),
        }
    }

    /// The frozen document, once closed.
    pub fn document(&self) -> Option<&Node> {
        match &self.state {
            DocState::Closed(root) => Some(root),
            _ => None,
        }
    }

    /// Write the closed document as XML, or through `transform` when given.
    pub fn serialize<W: Write>(
        &self,
        out: &mut W,
        transform: Option<&dyn Transform>,
    ) -> Result<(), DocError> {
        let root = match &self.state {
            DocState::Closed(root) => root,
            _ => return Err(DocError::NotClosed),
        };
        match transform {
            Some(t) => t.transform(root, out)?,
            None => xml::write_document(root, out)?,
        }
        out.flush()?;
        Ok(())
    }

    fn open_stack(&mut self) -> Result<&mut Vec<Node>, DocError> {
        match &mut self.state {
            DocState::Open(stack) => Ok(stack),
            DocState::Closed(_) => Err(DocError::AlreadyClosed),
            DocState::Empty => Err(DocError::NoDocument),
        }
    }

    fn current(&mut self) -> Result<&mut Node, DocError> {
        self.open_stack()?.last_mut().ok_or(DocError::NoDocument)
    }
}

/// Node with checked tag and attribute names.
fn element<I, K, V>(tag: &str, attrs: I) -> Result<Node, DocError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    let mut node = Node::new(tag);
    node.extend_attributes(attrs);
    check_node(&node)?;
    Ok(node)
}

fn check_node(node: &Node) -> Result<(), DocError> {
    let names = std::iter::once(node.name()).chain(node.attributes().iter().map(|(k, _)| k.as_str()));
    for name in names {
        if !xml::is_name(name) {
            return Err(DocError::InvalidName(name.to_string()));
        }
    }
    Ok(())
}

fn check_names(node: &Node) -> Result<(), DocError> {
    check_node(node)?;
    node.children().iter().try_for_each(check_names)
}

impl Drop for ReportBuilder {
    fn drop(&mut self) {
        let depth = self.depth();
        if depth > 0 {
            warn!("Report document dropped with {} open block(s)", depth);
        }
    }
}
