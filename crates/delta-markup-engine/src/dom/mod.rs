//! # Tree Construction Capability
//!
//! The builder never touches a concrete tree type. It is handed a [`Dom`]
//! and only ever creates, attaches, replaces, and serializes nodes through
//! it. Custom format callbacks receive the same capability, so whatever
//! surgery they perform stays within one tree implementation.
//!
//! [`crate::convert`] builds into html5ever's [`RcDom`].

pub mod html;

pub use markup5ever_rcdom::{Handle, RcDom};

use crate::error::ConvertError;

pub trait Dom {
    /// A handle to a node owned by the tree. Clones refer to the same node.
    type Node: Clone;

    fn create_element(&mut self, tag: &str) -> Self::Node;

    fn create_text(&mut self, text: &str) -> Self::Node;

    /// A container whose children are spliced into the target when it is
    /// appended or used as a replacement. The fragment itself is left empty.
    fn create_fragment(&mut self) -> Self::Node;

    /// Sets (or overwrites) an attribute. No effect on non-element nodes.
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);

    /// Appends `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);

    /// Puts `new` where `old` is. `old` ends up detached. No effect when
    /// `old` has no parent.
    fn replace_node(&mut self, old: &Self::Node, new: &Self::Node);

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn is_element(&self, node: &Self::Node) -> bool;

    /// Identity, not structural equality.
    fn same_node(&self, a: &Self::Node, b: &Self::Node) -> bool;

    /// Deep copy; the copy starts detached.
    fn clone_node(&mut self, node: &Self::Node) -> Self::Node;

    /// Concatenated text of the node and all its descendants.
    fn text_content(&self, node: &Self::Node) -> String;

    /// Markup for a forest of root nodes, in order.
    fn serialize(&self, roots: &[Self::Node]) -> Result<String, ConvertError>;
}
