//! Public entry points.

use serde::{Deserialize, Serialize};

use crate::builder::build;
use crate::delta::Delta;
use crate::dom::{Dom, RcDom};
use crate::error::ConvertError;
use crate::format::FormatSpec;
use crate::segment::segment;

pub const DEFAULT_BLOCK_TAG: &str = "div";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Tag for lines without an active line format.
    #[serde(alias = "blockTag")]
    pub block_tag: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            block_tag: DEFAULT_BLOCK_TAG.to_string(),
        }
    }
}

impl ConvertOptions {
    pub fn with_block_tag(block_tag: impl Into<String>) -> Self {
        Self {
            block_tag: block_tag.into(),
        }
    }
}

/// Renders `delta` to an HTML string, building into a fresh [`RcDom`].
pub fn convert(
    delta: &Delta,
    formats: &FormatSpec,
    options: &ConvertOptions,
) -> Result<String, ConvertError> {
    let mut dom = RcDom::default();
    let forest = convert_to_tree(&mut dom, delta, formats, options)?;
    dom.serialize(&forest)
}

/// Builds the output forest in `dom` without serializing it.
///
/// On error nothing is returned; nodes already created are dropped with
/// their handles.
pub fn convert_to_tree<D: Dom>(
    dom: &mut D,
    delta: &Delta,
    formats: &FormatSpec<D>,
    options: &ConvertOptions,
) -> Result<Vec<D::Node>, ConvertError> {
    let lines = segment(delta)?;
    build(dom, &lines, formats, options)
}
