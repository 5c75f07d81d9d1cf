//! In-memory page model: the rendering target for every component.
//!
//! The page is an arena of element and text nodes addressed by generational
//! `NodeId`s. A removed subtree frees its slots; an id kept across a removal
//! (for example a glitch node cleared after a timer) simply stops resolving
//! instead of pointing at whatever reused the slot.
//!
//! Browser side effects with no tree representation (downloads, new tabs,
//! `mailto:` navigation, scroll-into-view) are appended to an ordered
//! effect log.

pub mod parse;
mod serialize;
pub mod view;

use serde::Serialize;

pub use parse::ParseError;
pub use view::{El, View};

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A browser side effect recorded instead of performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// A direct file download (anchor with `download` clicked programmatically).
    Download { url: String },
    /// `window.open(url, target)`.
    OpenWindow { url: String, target: String },
    /// Top-level navigation, e.g. `mailto:` links.
    Navigate { url: String },
    /// `element.scrollIntoView()` on the element with this id or tag.
    ScrollIntoView { target: String },
}

/// The capability set the renderers depend on. `Document` is the in-memory
/// implementation; anything able to rewrite keyed text, swap a container's
/// content and set custom properties can stand in for it.
pub trait RenderTarget {
    /// Rewrites every `[data-key]` element under `scope` whose key resolves.
    /// Returns the rewritten elements.
    fn render_locale_text(
        &mut self,
        scope: NodeId,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Vec<NodeId>;

    /// Replaces the children of the element with `container_id`.
    /// Returns `None` when the container does not exist.
    fn render_section(&mut self, container_id: &str, views: &[View]) -> Option<NodeId>;

    /// Writes CSS custom properties on the root element.
    fn set_theme_variables(&mut self, vars: &[(String, String)]);
}

#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    effects: Vec<Effect>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty `<html><head></head><body></body></html>` page.
    pub fn new() -> Self {
        let mut doc = Self::bare();
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root, head);
        doc.append_child(doc.root, body);
        doc
    }

    fn bare() -> Self {
        let mut doc = Document {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            effects: Vec::new(),
        };
        doc.root = doc.create_element("html");
        doc
    }

    /// Parses a full page. Missing `<head>`/`<body>` are created; content
    /// outside an `<html>` element lands in `<body>`.
    pub fn from_html(html: &str) -> Result<Self, ParseError> {
        let mut scratch = Self::bare();
        let holder = scratch.create_element("template");
        let top = parse::parse_into(&mut scratch, holder, html)?;

        let html_el = top.iter().copied().find(|&id| scratch.tag(id) == Some("html"));
        let mut doc = Self::new();
        match html_el {
            Some(html_el) => {
                for (name, value) in scratch.attrs(html_el).to_vec() {
                    doc.set_attr(doc.root, &name, &value);
                }
                for child in scratch.children(html_el).to_vec() {
                    match scratch.tag(child) {
                        Some("head") => {
                            let head = doc.head();
                            doc.adopt_children(&scratch, child, head);
                            for (name, value) in scratch.attrs(child).to_vec() {
                                doc.set_attr(head, &name, &value);
                            }
                        }
                        Some("body") => {
                            let body = doc.body();
                            doc.adopt_children(&scratch, child, body);
                            for (name, value) in scratch.attrs(child).to_vec() {
                                doc.set_attr(body, &name, &value);
                            }
                        }
                        _ => {
                            let body = doc.body();
                            let copied = doc.copy_from(&scratch, child);
                            doc.append_child(body, copied);
                        }
                    }
                }
            }
            None => {
                let body = doc.body();
                doc.adopt_children(&scratch, holder, body);
            }
        }
        Ok(doc)
    }

    fn adopt_children(&mut self, other: &Document, from: NodeId, into: NodeId) {
        for child in other.children(from).to_vec() {
            let copied = self.copy_from(other, child);
            self.append_child(into, copied);
        }
    }

    fn copy_from(&mut self, other: &Document, id: NodeId) -> NodeId {
        let kind = match other.node(id) {
            Some(node) => node.kind.clone(),
            None => NodeKind::Text(String::new()),
        };
        let new_id = self.alloc(kind);
        for child in other.children(id).to_vec() {
            let copied = self.copy_from(other, child);
            self.append_child(new_id, copied);
        }
        new_id
    }

    // ────────────────────────────────────────────────────────────────────────
    // Arena
    // ────────────────────────────────────────────────────────────────────────

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: self.slots.len() - 1,
                generation: 0,
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn release(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.release(child);
        }
        if let Some(slot) = self.slots.get_mut(id.index) {
            if slot.generation == id.generation && slot.node.take().is_some() {
                self.free.push(id.index);
            }
        }
    }


    // ────────────────────────────────────────────────────────────────────────
    // Construction & structure
    // ────────────────────────────────────────────────────────────────────────

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.child_by_tag(self.root, "head").unwrap_or(self.root)
    }

    pub fn body(&self) -> NodeId {
        self.child_by_tag(self.root, "body").unwrap_or(self.root)
    }

    fn child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.tag(c) == Some(tag))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Element children only.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.tag(c).is_some())
            .collect()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.node_mut(parent) {
                node.children.retain(|&c| c != id);
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Detaches and frees a subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        self.release(id);
    }

    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Builds a view tree and appends it under `parent`.
    pub fn append_view(&mut self, parent: NodeId, view: &View) -> NodeId {
        let id = self.build_view(view);
        self.append_child(parent, id);
        id
    }

    fn build_view(&mut self, view: &View) -> NodeId {
        match view {
            View::Text(text) => self.create_text(text),
            View::Element(el) => {
                let id = self.alloc(NodeKind::Element {
                    tag: el.tag.to_string(),
                    attrs: el.attrs.clone(),
                });
                for child in &el.children {
                    let child_id = self.build_view(child);
                    self.append_child(id, child_id);
                }
                id
            }
        }
    }

    /// Replaces all children of `parent` with freshly built views.
    pub fn replace_children(&mut self, parent: NodeId, views: &[View]) -> Vec<NodeId> {
        self.clear_children(parent);
        views.iter().map(|v| self.append_view(parent, v)).collect()
    }

    /// Parses `html` and appends the result under `parent` verbatim.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, ParseError> {
        parse::parse_into(self, parent, html)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Element accessors
    // ────────────────────────────────────────────────────────────────────────

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs.as_slice(),
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.node_mut(id).map(|n| &mut n.kind) {
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.node_mut(id).map(|n| &mut n.kind) {
            attrs.retain(|(k, _)| k != name);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.tag(id).is_none() || self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(existing) = self.attr(id, "class") else {
            return;
        };
        let value = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        if value.is_empty() {
            self.remove_attr(id, "class");
        } else {
            self.set_attr(id, "class", &value);
        }
    }

    pub fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(id, class);
        } else {
            self.remove_class(id, class);
        }
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element { .. }) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// Replaces the children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if self.tag(id).is_none() {
            return;
        }
        self.clear_children(id);
        let text_id = self.create_text(text);
        self.append_child(id, text_id);
    }

    /// Sets one declaration inside the inline `style` attribute.
    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) {
        let mut decls: Vec<(String, String)> = self
            .attr(id, "style")
            .unwrap_or_default()
            .split(';')
            .filter_map(|decl| {
                let (name, val) = decl.split_once(':')?;
                Some((name.trim().to_string(), val.trim().to_string()))
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();
        match decls.iter_mut().find(|(name, _)| name == property) {
            Some((_, v)) => *v = value.to_string(),
            None => decls.push((property.to_string(), value.to_string())),
        }
        let style = decls
            .iter()
            .map(|(name, val)| format!("{name}: {val}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attr(id, "style", &style);
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<String> {
        self.attr(id, "style")?.split(';').find_map(|decl| {
            let (name, val) = decl.split_once(':')?;
            (name.trim() == property).then(|| val.trim().to_string())
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Queries
    // ────────────────────────────────────────────────────────────────────────

    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.find_first(self.root, |doc, id| doc.attr(id, "id") == Some(element_id))
    }

    /// Elements under `scope` (inclusive) matching `pred`, in document order.
    pub fn find_all<F>(&self, scope: NodeId, pred: F) -> Vec<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        let mut out = Vec::new();
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            if self.tag(id).is_none() {
                continue;
            }
            if pred(self, id) {
                out.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn find_first<F>(&self, scope: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            if self.tag(id).is_none() {
                continue;
            }
            if pred(self, id) {
                return Some(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        None
    }

    pub fn find_by_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.find_all(scope, |doc, id| doc.has_class(id, class))
    }

    pub fn find_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.find_all(scope, |doc, id| doc.tag(id) == Some(tag))
    }

    pub fn find_with_attr(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.find_all(scope, |doc, id| doc.has_attr(id, name))
    }

    /// `id` and its ancestors, innermost first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(id).map(|_| id);
        while let Some(cur) = current {
            out.push(cur);
            current = self.parent(cur);
        }
        out
    }

    // ────────────────────────────────────────────────────────────────────────
    // Effects & output
    // ────────────────────────────────────────────────────────────────────────

    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Full page serialization, including the doctype.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        serialize::write_node(self, self.root, &mut out);
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::write_node(self, id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            serialize::write_node(self, child, &mut out);
        }
        out
    }

    pub(crate) fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }
}

impl RenderTarget for Document {
    fn render_locale_text(
        &mut self,
        scope: NodeId,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Vec<NodeId> {
        let mut changed = Vec::new();
        for id in self.find_with_attr(scope, "data-key") {
            let Some(key) = self.attr(id, "data-key").map(str::to_string) else {
                continue;
            };
            if let Some(value) = lookup(&key) {
                self.set_text(id, &value);
                changed.push(id);
            }
        }
        changed
    }

    fn render_section(&mut self, container_id: &str, views: &[View]) -> Option<NodeId> {
        let container = self.get_element_by_id(container_id)?;
        self.replace_children(container, views);
        Some(container)
    }

    fn set_theme_variables(&mut self, vars: &[(String, String)]) {
        let root = self.root;
        for (name, value) in vars {
            self.set_style_property(root, name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_head_and_body() {
        let doc = Document::new();
        assert_eq!(doc.tag(doc.head()), Some("head"));
        assert_eq!(doc.tag(doc.body()), Some("body"));
        assert_eq!(doc.to_html(), "<!DOCTYPE html><html><head></head><body></body></html>");
    }

    #[test]
    fn test_class_helpers_do_not_duplicate() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.add_class(body, "collapsed");
        doc.add_class(body, "collapsed");
        doc.add_class(body, "theme-dark");
        assert_eq!(doc.attr(body, "class"), Some("collapsed theme-dark"));
        doc.remove_class(body, "collapsed");
        assert_eq!(doc.attr(body, "class"), Some("theme-dark"));
        doc.remove_class(body, "theme-dark");
        assert!(!doc.has_attr(body, "class"));
    }

    #[test]
    fn test_removed_ids_stop_resolving_after_slot_reuse() {
        let mut doc = Document::new();
        let body = doc.body();
        let old = doc.create_element("span");
        doc.append_child(body, old);
        doc.remove(old);
        let fresh = doc.create_element("div");
        doc.append_child(body, fresh);

        assert_eq!(doc.tag(old), None, "stale id must not alias the reused slot");
        doc.add_class(old, "glitch");
        assert!(!doc.has_class(fresh, "glitch"));
    }

    #[test]
    fn test_style_properties_update_in_place() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.set_style_property(root, "--blob-1", "rgba(1,2,3,0.92)");
        doc.set_style_property(root, "--blob-2", "red");
        doc.set_style_property(root, "--blob-1", "blue");
        assert_eq!(doc.attr(root, "style"), Some("--blob-1: blue; --blob-2: red"));
        assert_eq!(doc.style_property(root, "--blob-2").as_deref(), Some("red"));
    }

    #[test]
    fn test_render_locale_text_keeps_unresolved_keys() {
        let mut doc = Document::from_html(
            r#"<body><h1 data-key="greeting">old</h1><p data-key="missing">stale</p></body>"#,
        )
        .unwrap();
        let root = doc.root();
        let changed = doc.render_locale_text(root, &|key| {
            (key == "greeting").then(|| "Hola".to_string())
        });
        assert_eq!(changed.len(), 1);
        let html = doc.inner_html(doc.body());
        assert!(html.contains(r#"<h1 data-key="greeting">Hola</h1>"#));
        assert!(html.contains(r#"<p data-key="missing">stale</p>"#));
    }

    #[test]
    fn test_render_section_replaces_container_children() {
        let mut doc =
            Document::from_html(r#"<body><ul id="list"><li>old</li></ul></body>"#).unwrap();
        let views = [El::new("li").text("a").build(), El::new("li").text("b").build()];
        let list = doc.render_section("list", &views).unwrap();
        assert_eq!(doc.inner_html(list), "<li>a</li><li>b</li>");
        assert_eq!(doc.render_section("list", &[]), Some(list));
        assert!(doc.children(list).is_empty());
        assert_eq!(doc.render_section("absent", &views), None);
    }

    #[test]
    fn test_from_html_keeps_html_and_body_attributes() {
        let doc = Document::from_html(
            r#"<!DOCTYPE html><html lang="es"><head><title>x</title></head><body class="home"><div id="a"></div></body></html>"#,
        )
        .unwrap();
        assert_eq!(doc.attr(doc.root(), "lang"), Some("es"));
        assert!(doc.has_class(doc.body(), "home"));
        assert!(doc.get_element_by_id("a").is_some());
        assert_eq!(doc.text_content(doc.head()), "x");
    }
}
