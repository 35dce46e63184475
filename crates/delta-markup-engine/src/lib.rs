//! Renders rich-text deltas (ordered insert operations with formatting
//! attributes) as markup.
//!
//! Conversion is two passes over borrowed data: [`segment`] groups inserts
//! into lines, then [`builder`] turns lines into elements through a
//! [`Dom`] capability, driven by a caller-supplied [`FormatSpec`].

pub mod builder;
pub mod convert;
pub mod delta;
pub mod dom;
pub mod error;
pub mod format;
pub mod segment;

// Re-export key types for easier usage
pub use builder::{TreeBuilder, build};
pub use convert::{ConvertOptions, DEFAULT_BLOCK_TAG, convert, convert_to_tree};
pub use delta::{AttributeValue, Attributes, Delta, InsertContent, InsertOp, Op};
pub use dom::{Dom, Handle, RcDom};
pub use error::{CallbackError, ConvertError};
pub use format::{CustomFormat, Format, FormatDescriptor, FormatSpec, FormatSpecError, FormatType};
pub use segment::{InlineRun, Line, RunContent, segment};
