//! [`Dom`] over html5ever's reference-counted tree.
//!
//! Parents own their children; children point back through a weak
//! reference. Fragments are `NodeData::Document` nodes, a kind the builder
//! never creates otherwise, and are serialized children-only.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::{Attribute, LocalName, QualName, ns, serialize};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use super::Dom;
use crate::error::ConvertError;

fn new_node(data: NodeData) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data,
    })
}

fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(Weak::upgrade);
    node.parent.set(weak);
    parent
}

fn adopt(parent: &Handle, child: &Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
}

fn is_fragment(node: &Handle) -> bool {
    matches!(node.data, NodeData::Document)
}

/// True when `ancestor` is `node` or one of its parents.
fn is_inclusive_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(handle) = current {
        if Rc::ptr_eq(&handle, ancestor) {
            return true;
        }
        current = parent_of(&handle);
    }
    false
}

fn detach(node: &Handle) {
    if let Some(weak) = node.parent.take()
        && let Some(parent) = weak.upgrade()
    {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
}

/// The nodes that actually get attached when `node` is inserted
/// somewhere: a fragment's children, or the node itself.
fn take_incoming(node: &Handle) -> Vec<Handle> {
    if is_fragment(node) {
        let children = std::mem::take(&mut *node.children.borrow_mut());
        for child in &children {
            child.parent.set(None);
        }
        children
    } else {
        detach(node);
        vec![node.clone()]
    }
}

fn copy_data(data: &NodeData) -> NodeData {
    match data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element { name, attrs, .. } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    }
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

impl Dom for RcDom {
    type Node = Handle;

    fn create_element(&mut self, tag: &str) -> Handle {
        new_node(NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(tag.to_ascii_lowercase())),
            attrs: RefCell::new(Vec::new()),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        })
    }

    fn create_text(&mut self, text: &str) -> Handle {
        new_node(NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        })
    }

    fn create_fragment(&mut self) -> Handle {
        new_node(NodeData::Document)
    }

    fn set_attribute(&mut self, node: &Handle, name: &str, value: &str) {
        let NodeData::Element { attrs, .. } = &node.data else {
            log::trace!("ignoring attribute {name} on a non-element node");
            return;
        };
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|attr| &*attr.name.local == name) {
            Some(existing) => existing.value = value.to_string().into(),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(name)),
                value: value.to_string().into(),
            }),
        }
    }

    fn append_child(&mut self, parent: &Handle, child: &Handle) {
        if is_inclusive_ancestor(child, parent) {
            log::trace!("refusing to append a node inside its own subtree");
            return;
        }
        for node in take_incoming(child) {
            adopt(parent, &node);
            parent.children.borrow_mut().push(node);
        }
    }

    fn replace_node(&mut self, old: &Handle, new: &Handle) {
        if Rc::ptr_eq(old, new) || parent_of(old).is_none() {
            return;
        }
        if is_inclusive_ancestor(new, old) {
            log::trace!("refusing to replace a node with its own ancestor");
            return;
        }

        let incoming = take_incoming(new);
        // `new` may have been a sibling of `old`, so look the position up
        // only after it has been detached.
        let Some(parent) = parent_of(old) else {
            return;
        };
        old.parent.set(None);
        let mut siblings = parent.children.borrow_mut();
        let Some(index) = siblings.iter().position(|child| Rc::ptr_eq(child, old)) else {
            return;
        };
        for node in &incoming {
            adopt(&parent, node);
        }
        siblings.splice(index..=index, incoming);
    }

    fn parent(&self, node: &Handle) -> Option<Handle> {
        parent_of(node)
    }

    fn is_element(&self, node: &Handle) -> bool {
        matches!(node.data, NodeData::Element { .. })
    }

    fn same_node(&self, a: &Handle, b: &Handle) -> bool {
        Rc::ptr_eq(a, b)
    }

    fn clone_node(&mut self, node: &Handle) -> Handle {
        let copy = new_node(copy_data(&node.data));
        for child in node.children.borrow().iter() {
            let child_copy = self.clone_node(child);
            adopt(&copy, &child_copy);
            copy.children.borrow_mut().push(child_copy);
        }
        copy
    }

    fn text_content(&self, node: &Handle) -> String {
        let mut out = String::new();
        collect_text(node, &mut out);
        out
    }

    fn serialize(&self, roots: &[Handle]) -> Result<String, ConvertError> {
        let mut output = Vec::new();
        for root in roots {
            let traversal_scope = if is_fragment(root) {
                TraversalScope::ChildrenOnly(None)
            } else {
                TraversalScope::IncludeNode
            };
            let opts = SerializeOpts {
                traversal_scope,
                ..Default::default()
            };
            serialize(&mut output, &SerializableHandle::from(root.clone()), opts)
                .map_err(|e| ConvertError::Serialization(e.to_string()))?;
        }
        String::from_utf8(output).map_err(|e| ConvertError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paragraph(dom: &mut RcDom, texts: &[&str]) -> (Handle, Vec<Handle>) {
        let p = dom.create_element("P");
        let children = texts
            .iter()
            .map(|t| {
                let node = dom.create_text(t);
                dom.append_child(&p, &node);
                node
            })
            .collect();
        (p, children)
    }

    fn children(node: &Handle) -> Vec<Handle> {
        node.children.borrow().clone()
    }

    fn same_list(a: &[Handle], b: &[Handle]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Rc::ptr_eq(x, y))
    }

    fn html(dom: &RcDom, roots: &[Handle]) -> String {
        dom.serialize(roots).unwrap()
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut dom = RcDom::default();
        let a = dom.create_element("A");
        dom.set_attribute(&a, "href", "http://x.com/?a=1&b=\"2\"");
        let text = dom.create_text("<1 & 2>");
        dom.append_child(&a, &text);

        insta::assert_snapshot!(
            html(&dom, &[a]),
            @r#"<a href="http://x.com/?a=1&amp;b=&quot;2&quot;">&lt;1 &amp; 2&gt;</a>"#
        );
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let mut dom = RcDom::default();
        let div = dom.create_element("div");
        let img = dom.create_element("IMG");
        dom.set_attribute(&img, "src", "a.gif");
        dom.append_child(&div, &img);

        insta::assert_snapshot!(html(&dom, &[div]), @r#"<div><img src="a.gif"></div>"#);
    }

    #[test]
    fn fragment_roots_serialize_their_children() {
        let mut dom = RcDom::default();
        let fragment = dom.create_fragment();
        let one = dom.create_element("b");
        let two = dom.create_text("tail");
        dom.append_child(&fragment, &one);
        dom.append_child(&fragment, &two);

        insta::assert_snapshot!(html(&dom, &[fragment]), @"<b></b>tail");
    }

    #[test]
    fn set_attribute_overwrites_in_place() {
        let mut dom = RcDom::default();
        let a = dom.create_element("a");
        dom.set_attribute(&a, "href", "one");
        dom.set_attribute(&a, "title", "t");
        dom.set_attribute(&a, "href", "two");

        assert_eq!(html(&dom, &[a]), r#"<a href="two" title="t"></a>"#);
    }

    #[test]
    fn append_moves_node_between_parents() {
        let mut dom = RcDom::default();
        let (p, texts) = paragraph(&mut dom, &["x"]);
        let other = dom.create_element("div");

        dom.append_child(&other, &texts[0]);

        assert!(children(&p).is_empty());
        assert!(same_list(&children(&other), &texts));
        assert!(dom.parent(&texts[0]).is_some_and(|parent| Rc::ptr_eq(&parent, &other)));
    }

    #[test]
    fn replace_keeps_sibling_order() {
        let mut dom = RcDom::default();
        let (p, texts) = paragraph(&mut dom, &["a", "b", "c"]);
        let b = dom.create_element("b");

        dom.replace_node(&texts[1], &b);

        assert!(same_list(
            &children(&p),
            &[texts[0].clone(), b.clone(), texts[2].clone()]
        ));
        assert!(dom.parent(&texts[1]).is_none());
        assert!(dom.parent(&b).is_some_and(|parent| Rc::ptr_eq(&parent, &p)));
    }

    #[test]
    fn replace_with_fragment_splices_children() {
        let mut dom = RcDom::default();
        let (p, texts) = paragraph(&mut dom, &["a", "b", "c"]);
        let fragment = dom.create_fragment();
        let x = dom.create_text("x");
        let y = dom.create_text("y");
        dom.append_child(&fragment, &x);
        dom.append_child(&fragment, &y);

        dom.replace_node(&texts[1], &fragment);

        assert!(same_list(
            &children(&p),
            &[texts[0].clone(), x, y, texts[2].clone()]
        ));
        assert!(children(&fragment).is_empty());
        assert_eq!(dom.text_content(&p), "axyc");
    }

    #[test]
    fn replace_with_later_sibling() {
        let mut dom = RcDom::default();
        let (p, texts) = paragraph(&mut dom, &["a", "b", "c"]);

        dom.replace_node(&texts[0], &texts[2]);

        assert!(same_list(
            &children(&p),
            &[texts[2].clone(), texts[1].clone()]
        ));
    }

    #[test]
    fn replace_detached_node_is_noop() {
        let mut dom = RcDom::default();
        let lonely = dom.create_text("a");
        let other = dom.create_text("b");

        dom.replace_node(&lonely, &other);

        assert!(dom.parent(&other).is_none());
    }

    #[test]
    fn cycles_are_refused() {
        let mut dom = RcDom::default();
        let outer = dom.create_element("div");
        let inner = dom.create_element("span");
        dom.append_child(&outer, &inner);

        dom.append_child(&inner, &outer);
        dom.replace_node(&inner, &outer);

        assert!(dom.parent(&outer).is_none());
        assert!(same_list(&children(&outer), &[inner]));
    }

    #[test]
    fn clone_is_deep_and_detached() {
        let mut dom = RcDom::default();
        let (p, _) = paragraph(&mut dom, &["a", "b"]);
        dom.set_attribute(&p, "class", "intro");
        let wrapper = dom.create_element("div");
        dom.append_child(&wrapper, &p);

        let copy = dom.clone_node(&p);

        assert!(!dom.same_node(&copy, &p));
        assert!(dom.parent(&copy).is_none());
        assert_eq!(html(&dom, &[copy.clone()]), r#"<p class="intro">ab</p>"#);
        assert!(
            children(&copy)
                .iter()
                .all(|child| dom.parent(child).is_some_and(|parent| Rc::ptr_eq(&parent, &copy)))
        );
    }

    #[test]
    fn only_elements_are_elements() {
        let mut dom = RcDom::default();
        let element = dom.create_element("span");
        let text = dom.create_text("t");
        let fragment = dom.create_fragment();

        assert!(dom.is_element(&element));
        assert!(!dom.is_element(&text));
        assert!(!dom.is_element(&fragment));
    }
}
