//! # Tree Building
//!
//! Turns segmented lines into a forest of block elements.
//!
//! Per line:
//!
//! 1. Pick the block tag (first matching line format, else the default)
//! 2. Append each run: text wrapped by its inline formats, or an embed leaf
//! 3. Run custom formats on each run, then on the block (skipping any that
//!    already ran on a run cut from the newline's own op)
//! 4. Place the block: into the open group when the merge key matches,
//!    into a fresh group when the line format has a parent tag, or straight
//!    into the forest
//!
//! The open group is only ever the last forest entry, so merging is an
//! adjacency check and never a search.

use serde_json::Value;

use crate::convert::ConvertOptions;
use crate::delta::{AttributeValue, Attributes};
use crate::dom::Dom;
use crate::error::ConvertError;
use crate::format::{CustomFormat, Format, FormatSpec};
use crate::segment::{InlineRun, Line, RunContent};

/// Attribute name + value that adjacent lines must share to be grouped.
#[derive(Debug, Clone, PartialEq)]
struct MergeKey {
    name: String,
    value: AttributeValue,
}

struct OpenGroup<N> {
    key: MergeKey,
    node: N,
}

/// The line format that applies to a line, if any.
struct ActiveLineFormat<'f> {
    name: &'f str,
    tag: &'f str,
    parent_tag: Option<&'f str>,
}

pub struct TreeBuilder<'s, D: Dom> {
    formats: &'s FormatSpec<D>,
    options: &'s ConvertOptions,
    forest: Vec<D::Node>,
    open_group: Option<OpenGroup<D::Node>>,
}

impl<'s, D: Dom> TreeBuilder<'s, D> {
    pub fn new(formats: &'s FormatSpec<D>, options: &'s ConvertOptions) -> Self {
        Self {
            formats,
            options,
            forest: vec![],
            open_group: None,
        }
    }

    pub fn push(&mut self, dom: &mut D, line: &Line<'_>) -> Result<(), ConvertError> {
        self.trace_unknown(line.attributes);

        let active = self.active_line_format(line.attributes);
        let tag = active.as_ref().map_or(self.options.block_tag.as_str(), |a| a.tag);
        let mut block = dom.create_element(tag);

        // A run cut from the op that also holds the newline shares the
        // line's attribute map; its custom formats have already run.
        let mut applied: Vec<&'s str> = vec![];
        for run in &line.runs {
            let run_applied = self.push_run(dom, &block, run)?;
            if std::ptr::eq(run.attributes, line.attributes) {
                applied.extend(run_applied);
            }
        }

        let formats: &'s FormatSpec<D> = self.formats;
        for (name, format) in formats.iter() {
            if let Format::Custom(custom) = format
                && let Some(value) = line.attributes.get(name)
                && !applied.contains(&name)
            {
                block = apply_block_custom(dom, name, custom, block, value)?;
            }
        }

        let group = active.and_then(|a| {
            let parent_tag = a.parent_tag?;
            let value = line.attributes.get(a.name)?.clone();
            Some((
                MergeKey {
                    name: a.name.to_string(),
                    value,
                },
                parent_tag,
            ))
        });
        self.place(dom, block, group);
        Ok(())
    }

    pub fn finish(self) -> Vec<D::Node> {
        log::debug!("built {} top-level nodes", self.forest.len());
        self.forest
    }

    fn active_line_format(&self, attributes: &Attributes) -> Option<ActiveLineFormat<'s>> {
        let formats: &'s FormatSpec<D> = self.formats;
        formats.iter().find_map(|(name, format)| match format {
            Format::Line { tag, parent_tag } if attributes.contains_key(name) => {
                Some(ActiveLineFormat {
                    name,
                    tag,
                    parent_tag: parent_tag.as_deref(),
                })
            }
            _ => None,
        })
    }

    /// Appends one run to `block` and returns the custom formats that ran
    /// on it.
    fn push_run(
        &self,
        dom: &mut D,
        block: &D::Node,
        run: &InlineRun<'_>,
    ) -> Result<Vec<&'s str>, ConvertError> {
        self.trace_unknown(run.attributes);

        let mut node = match run.content {
            RunContent::Text(text) => {
                let text_node = dom.create_text(text);
                dom.append_child(block, &text_node);
                self.apply_inline_formats(dom, text_node, run.attributes)
            }
            RunContent::Embed(value) => match self.embed_element(dom, run.attributes, value) {
                Some(element) => {
                    dom.append_child(block, &element);
                    element
                }
                None => {
                    log::trace!("no embed format matches {value}; skipping");
                    return Ok(vec![]);
                }
            },
        };

        let formats: &'s FormatSpec<D> = self.formats;
        let mut applied = vec![];
        for (name, format) in formats.iter() {
            let Format::Custom(custom) = format else {
                continue;
            };
            let Some(value) = run.attributes.get(name) else {
                continue;
            };
            node = apply_custom(dom, name, custom, node, value)?;
            applied.push(name);
            if dom.parent(&node).is_none() {
                // e.g. a fragment whose children were spliced in: nothing
                // left in the tree for further formats to act on.
                log::trace!("custom format {name} left its node detached");
                break;
            }
        }
        Ok(applied)
    }

    fn apply_inline_formats(
        &self,
        dom: &mut D,
        mut node: D::Node,
        attributes: &Attributes,
    ) -> D::Node {
        for (name, format) in self.formats.iter() {
            let Format::Inline { tag, attribute } = format else {
                continue;
            };
            let Some(value) = attributes.get(name) else {
                continue;
            };
            let wrapper = dom.create_element(tag);
            if let Some(attribute) = attribute {
                dom.set_attribute(&wrapper, attribute, &value.to_string());
            }
            dom.replace_node(&node, &wrapper);
            dom.append_child(&wrapper, &node);
            node = wrapper;
        }
        node
    }

    /// Leaf element for an embed insert.
    ///
    /// The first embed format (in declaration order) that the run names
    /// wins, either through an attribute (`{insert: 1, attributes: {image:
    /// url}}`) or through the embed object itself (`{insert: {image: url}}`).
    fn embed_element(
        &self,
        dom: &mut D,
        attributes: &Attributes,
        value: &Value,
    ) -> Option<D::Node> {
        self.formats.iter().find_map(|(name, format)| {
            let Format::Embed { tag, attribute } = format else {
                return None;
            };
            let source = match (attributes.get(name), value.get(name)) {
                (Some(AttributeValue::Bool(_)), inner) => embed_string(inner.unwrap_or(value)),
                (Some(attr), _) => attr.to_string(),
                (None, Some(inner)) => embed_string(inner),
                (None, None) => return None,
            };
            let element = dom.create_element(tag);
            if let Some(attribute) = attribute {
                dom.set_attribute(&element, attribute, &source);
            }
            Some(element)
        })
    }

    fn place(&mut self, dom: &mut D, block: D::Node, group: Option<(MergeKey, &str)>) {
        let Some((key, parent_tag)) = group else {
            self.open_group = None;
            self.forest.push(block);
            return;
        };

        if let Some(open) = &self.open_group
            && open.key == key
        {
            dom.append_child(&open.node, &block);
            return;
        }

        log::trace!("opening <{parent_tag}> group for {}={}", key.name, key.value);
        let container = dom.create_element(parent_tag);
        dom.append_child(&container, &block);
        self.forest.push(container.clone());
        self.open_group = Some(OpenGroup {
            key,
            node: container,
        });
    }

    fn trace_unknown(&self, attributes: &Attributes) {
        if log::log_enabled!(log::Level::Trace) {
            for name in attributes.keys().filter(|name| !self.formats.contains(name)) {
                log::trace!("ignoring attribute {name} with no format");
            }
        }
    }
}

/// Runs a custom format and puts its result where `node` was.
///
/// A callback may already have done the replacement itself, or may have
/// returned a node that is attached elsewhere; in both cases the tree is
/// left as the callback arranged it.
fn apply_custom<D: Dom>(
    dom: &mut D,
    name: &str,
    custom: &CustomFormat<D>,
    node: D::Node,
    value: &AttributeValue,
) -> Result<D::Node, ConvertError> {
    let replacement = call_custom(dom, name, custom, node.clone(), value)?;

    if !dom.same_node(&replacement, &node)
        && dom.parent(&node).is_some()
        && dom.parent(&replacement).is_none()
    {
        dom.replace_node(&node, &replacement);
    }
    Ok(replacement)
}

/// Runs a custom format on a line's block, which is not yet in the tree.
///
/// Only a detached element may stand in for the block; anything else
/// (text, a fragment, a node already placed elsewhere) keeps the block.
fn apply_block_custom<D: Dom>(
    dom: &mut D,
    name: &str,
    custom: &CustomFormat<D>,
    block: D::Node,
    value: &AttributeValue,
) -> Result<D::Node, ConvertError> {
    let replacement = call_custom(dom, name, custom, block.clone(), value)?;

    if dom.same_node(&replacement, &block) {
        return Ok(block);
    }
    if dom.is_element(&replacement) && dom.parent(&replacement).is_none() {
        return Ok(replacement);
    }
    log::debug!("custom format {name} returned no usable block; keeping the original");
    Ok(block)
}

fn call_custom<D: Dom>(
    dom: &mut D,
    name: &str,
    custom: &CustomFormat<D>,
    node: D::Node,
    value: &AttributeValue,
) -> Result<D::Node, ConvertError> {
    custom
        .call(dom, node, value)
        .map_err(|source| ConvertError::Callback {
            attribute: name.to_string(),
            source,
        })
}

fn embed_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Builds the forest for `lines` in one pass.
pub fn build<D: Dom>(
    dom: &mut D,
    lines: &[Line<'_>],
    formats: &FormatSpec<D>,
    options: &ConvertOptions,
) -> Result<Vec<D::Node>, ConvertError> {
    let mut builder = TreeBuilder::new(formats, options);
    for line in lines {
        builder.push(dom, line)?;
    }
    Ok(builder.finish())
}
