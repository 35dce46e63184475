//! # Format Specification
//!
//! Maps attribute names to the rule that renders them. Declarative rules
//! arrive as [`FormatDescriptor`]s (from code or configuration) and are
//! validated once, when they enter a [`FormatSpec`], into the closed
//! [`Format`] enum the builder matches on.
//!
//! ## Ordering
//!
//! A spec remembers declaration order and the builder walks it in that
//! order. This is what decides:
//!
//! - nesting of several inline formats on one run (first declared is
//!   innermost)
//! - which line format wins when a line carries two (first declared)
//! - the order custom callbacks run in

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::delta::AttributeValue;
use crate::dom::{Dom, RcDom};
use crate::error::CallbackError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatSpecError {
    #[error("Format `{name}` has an empty tag")]
    EmptyTag { name: String },

    #[error("Format `{name}` has an invalid tag name `{tag}`")]
    InvalidTag { name: String, tag: String },

    #[error("Format `{name}` has an empty attribute name")]
    EmptyAttribute { name: String },

    #[error("Format `{name}` declares a parent tag but is not a line format")]
    ParentTagOnNonLine { name: String },

    #[error("Line format `{name}` cannot set an attribute")]
    AttributeOnLine { name: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    #[default]
    Inline,
    Line,
    Embed,
}

/// Unvalidated, serializable shape of a declarative format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub tag: String,
    #[serde(default, rename = "type")]
    pub kind: FormatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, alias = "parentTag", skip_serializing_if = "Option::is_none")]
    pub parent_tag: Option<String>,
}

impl FormatDescriptor {
    fn new(kind: FormatType, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            kind,
            attribute: None,
            parent_tag: None,
        }
    }

    pub fn inline(tag: impl Into<String>) -> Self {
        Self::new(FormatType::Inline, tag)
    }

    pub fn line(tag: impl Into<String>) -> Self {
        Self::new(FormatType::Line, tag)
    }

    pub fn embed(tag: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::new(FormatType::Embed, tag).with_attribute(attribute)
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_parent_tag(mut self, parent_tag: impl Into<String>) -> Self {
        self.parent_tag = Some(parent_tag.into());
        self
    }

    /// Checks the descriptor and turns it into the builder's [`Format`].
    pub fn validate<D: Dom>(self, name: &str) -> Result<Format<D>, FormatSpecError> {
        validate_tag(name, &self.tag)?;
        if let Some(parent_tag) = &self.parent_tag {
            if self.kind != FormatType::Line {
                return Err(FormatSpecError::ParentTagOnNonLine { name: name.into() });
            }
            validate_tag(name, parent_tag)?;
        }
        if let Some(attribute) = &self.attribute {
            if self.kind == FormatType::Line {
                return Err(FormatSpecError::AttributeOnLine { name: name.into() });
            }
            if attribute.trim().is_empty() {
                return Err(FormatSpecError::EmptyAttribute { name: name.into() });
            }
        }

        Ok(match self.kind {
            FormatType::Inline => Format::Inline {
                tag: self.tag,
                attribute: self.attribute,
            },
            FormatType::Line => Format::Line {
                tag: self.tag,
                parent_tag: self.parent_tag,
            },
            FormatType::Embed => Format::Embed {
                tag: self.tag,
                attribute: self.attribute,
            },
        })
    }
}

fn validate_tag(name: &str, tag: &str) -> Result<(), FormatSpecError> {
    let mut chars = tag.chars();
    let Some(first) = chars.next() else {
        return Err(FormatSpecError::EmptyTag { name: name.into() });
    };
    if !first.is_ascii_alphabetic() || !chars.all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(FormatSpecError::InvalidTag {
            name: name.into(),
            tag: tag.into(),
        });
    }
    Ok(())
}

type CustomFn<D> = dyn Fn(
        &mut D,
        <D as Dom>::Node,
        &AttributeValue,
    ) -> Result<<D as Dom>::Node, CallbackError>
    + Send
    + Sync;

/// A caller-supplied transform: receives the node built for the attribute
/// and the attribute's value, returns the node that should stand in its
/// place.
pub struct CustomFormat<D: Dom>(Arc<CustomFn<D>>);

impl<D: Dom> CustomFormat<D> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut D, D::Node, &AttributeValue) -> Result<D::Node, CallbackError>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(
        &self,
        dom: &mut D,
        node: D::Node,
        value: &AttributeValue,
    ) -> Result<D::Node, CallbackError> {
        (self.0)(dom, node, value)
    }
}

impl<D: Dom> Clone for CustomFormat<D> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<D: Dom> fmt::Debug for CustomFormat<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomFormat(..)")
    }
}

/// A validated rule for one attribute name.
pub enum Format<D: Dom = RcDom> {
    /// Wraps inline content in `tag`, optionally copying the attribute
    /// value onto it (e.g. `href`).
    Inline {
        tag: String,
        attribute: Option<String>,
    },
    /// Replaces the line's block tag; with a parent tag, adjacent lines
    /// carrying the same attribute value share one container.
    Line {
        tag: String,
        parent_tag: Option<String>,
    },
    /// Renders an embed insert as a leaf element.
    Embed {
        tag: String,
        attribute: Option<String>,
    },
    Custom(CustomFormat<D>),
}

impl<D: Dom> Clone for Format<D> {
    fn clone(&self) -> Self {
        match self {
            Format::Inline { tag, attribute } => Format::Inline {
                tag: tag.clone(),
                attribute: attribute.clone(),
            },
            Format::Line { tag, parent_tag } => Format::Line {
                tag: tag.clone(),
                parent_tag: parent_tag.clone(),
            },
            Format::Embed { tag, attribute } => Format::Embed {
                tag: tag.clone(),
                attribute: attribute.clone(),
            },
            Format::Custom(custom) => Format::Custom(custom.clone()),
        }
    }
}

impl<D: Dom> fmt::Debug for Format<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Inline { tag, attribute } => f
                .debug_struct("Inline")
                .field("tag", tag)
                .field("attribute", attribute)
                .finish(),
            Format::Line { tag, parent_tag } => f
                .debug_struct("Line")
                .field("tag", tag)
                .field("parent_tag", parent_tag)
                .finish(),
            Format::Embed { tag, attribute } => f
                .debug_struct("Embed")
                .field("tag", tag)
                .field("attribute", attribute)
                .finish(),
            Format::Custom(custom) => f.debug_tuple("Custom").field(custom).finish(),
        }
    }
}

/// Ordered attribute name → [`Format`] table.
pub struct FormatSpec<D: Dom = RcDom> {
    formats: Vec<(String, Format<D>)>,
}

impl<D: Dom> FormatSpec<D> {
    pub fn new() -> Self {
        Self { formats: vec![] }
    }

    /// Builds a spec from declarative descriptors, failing on the first
    /// invalid one.
    pub fn from_descriptors<N, I>(descriptors: I) -> Result<Self, FormatSpecError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, FormatDescriptor)>,
    {
        let mut spec = Self::new();
        for (name, descriptor) in descriptors {
            spec.insert_descriptor(name, descriptor)?;
        }
        Ok(spec)
    }

    /// Registers a format. Re-registering a name replaces the earlier rule
    /// but keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, format: Format<D>) {
        let name = name.into();
        match self.formats.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = format,
            None => self.formats.push((name, format)),
        }
    }

    pub fn insert_descriptor(
        &mut self,
        name: impl Into<String>,
        descriptor: FormatDescriptor,
    ) -> Result<(), FormatSpecError> {
        let name = name.into();
        let format = descriptor.validate(&name)?;
        self.insert(name, format);
        Ok(())
    }

    pub fn with_descriptor(
        mut self,
        name: impl Into<String>,
        descriptor: FormatDescriptor,
    ) -> Result<Self, FormatSpecError> {
        self.insert_descriptor(name, descriptor)?;
        Ok(self)
    }

    pub fn custom<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut D, D::Node, &AttributeValue) -> Result<D::Node, CallbackError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(name, Format::Custom(CustomFormat::new(f)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Format<D>> {
        self.formats
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, format)| format)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Formats in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Format<D>)> {
        self.formats.iter().map(|(name, format)| (name.as_str(), format))
    }
}

impl<D: Dom> Default for FormatSpec<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dom> Clone for FormatSpec<D> {
    fn clone(&self) -> Self {
        Self {
            formats: self.formats.clone(),
        }
    }
}

impl<D: Dom> fmt::Debug for FormatSpec<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.formats.iter().map(|(name, format)| (name, format)))
            .finish()
    }
}
