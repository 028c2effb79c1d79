//! Fluent element construction
//!
//! ```rust
//! use aria_dom::{el, Document};
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let menu = doc
//!     .insert(
//!         root,
//!         el("ui-menu").children([
//!             el("ui-menu-item").text("Open"),
//!             el("ui-menu-item").text("Save").attr("disabled", ""),
//!         ]),
//!     )
//!     .unwrap();
//! assert_eq!(doc.children(menu).len(), 2);
//! ```

use crate::document::{Document, NodeId};
use crate::error::Result;
use crate::geometry::Rect;

/// Create an element builder for `tag`
pub fn el(tag: &str) -> ElementBuilder {
    ElementBuilder::new(tag)
}

/// Description of an element subtree, materialized by [`Document::insert`]
#[derive(Clone, Debug)]
pub struct ElementBuilder {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    bounds: Option<Rect>,
    children: Vec<ElementBuilder>,
    shadow: Option<Vec<ElementBuilder>>,
}

impl ElementBuilder {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: None,
            bounds: None,
            children: Vec::new(),
            shadow: None,
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    /// Append a class to the `class` attribute
    pub fn class(mut self, class: &str) -> Self {
        match self.attributes.iter_mut().find(|(n, _)| n == "class") {
            Some((_, value)) => {
                value.push(' ');
                value.push_str(class);
            }
            None => self.attributes.push(("class".to_string(), class.to_string())),
        }
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn child(mut self, child: ElementBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = ElementBuilder>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attach a shadow root holding `children`
    pub fn shadow(mut self, children: impl IntoIterator<Item = ElementBuilder>) -> Self {
        self.shadow.get_or_insert_with(Vec::new).extend(children);
        self
    }
}

impl Document {
    /// Build `builder` and append it under `parent`
    pub fn insert(&mut self, parent: NodeId, builder: ElementBuilder) -> Result<NodeId> {
        let node = self.create_element(&builder.tag);
        for (name, value) in builder.attributes {
            self.set_attribute(node, &name, value);
        }
        if let Some(text) = builder.text {
            self.set_text(node, text);
        }
        if let Some(bounds) = builder.bounds {
            self.set_bounds(node, bounds);
        }
        self.append_child(parent, node)?;
        if let Some(shadow_children) = builder.shadow {
            let shadow = self.attach_shadow(node)?;
            for child in shadow_children {
                self.insert(shadow, child)?;
            }
        }
        for child in builder.children {
            self.insert(node, child)?;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_tree() {
        let mut doc = Document::new();
        let root = doc.root();
        let slider = doc
            .insert(
                root,
                el("ui-slider")
                    .id("volume")
                    .class("a")
                    .class("b")
                    .bounds(Rect::new(0.0, 0.0, 200.0, 20.0))
                    .child(el("ui-slider-thumb"))
                    .shadow([el("div").class("track")]),
            )
            .unwrap();

        assert_eq!(doc.element_by_id("volume"), Some(slider));
        assert_eq!(doc.attribute(slider, "class"), Some("a b"));
        assert_eq!(doc.bounds(slider).map(|b| b.width), Some(200.0));
        assert_eq!(doc.children(slider).len(), 1);
        let shadow = doc.shadow_root(slider).unwrap();
        assert_eq!(doc.children(shadow).len(), 1);
    }
}
