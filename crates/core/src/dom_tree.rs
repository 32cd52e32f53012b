//! Owned, index-addressed document tree.
//!
//! Every node lives in a flat arena and refers to its parent and children by
//! [`NodeId`]. Detached nodes stay in the arena until the tree is dropped, so
//! ids handed out by a tree remain valid for its whole lifetime. Cloning a
//! [`DomTree`] produces a fully independent working copy; the extraction
//! pipelines rely on that to leave the caller's tree untouched.

use crate::{ReadmarkError, Result};

/// Index of a node inside its [`DomTree`].
pub type NodeId = usize;

/// Void elements never have children or closing tags.
pub const VOID_ELEMENTS: [&str; 16] = [
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Payload of a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The tree root. Exactly one per tree, always at id 0.
    Document,
    /// An element with a lowercase tag name and ordered, unique attributes.
    Element { tag: String, attrs: Vec<(String, String)> },
    /// A text leaf.
    Text(String),
}

/// A node in the DOM tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomNode {
    /// What this node is
    pub data: NodeData,
    /// Parent node ID (if any)
    pub parent_id: Option<NodeId>,
    /// Child node IDs
    pub child_ids: Vec<NodeId>,
}

/// A DOM tree structure that tracks parent-child relationships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomTree {
    nodes: Vec<DomNode>,
}

impl DomTree {
    /// Creates a tree holding only the document root.
    pub fn new() -> Self {
        Self { nodes: vec![DomNode { data: NodeData::Document, parent_id: None, child_ids: Vec::new() }] }
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        0
    }

    /// Total number of nodes in the arena, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].child_ids.is_empty()
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DomNode { data, parent_id: None, child_ids: Vec::new() });
        id
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element { tag: tag.to_ascii_lowercase(), attrs: Vec::new() })
    }

    /// Creates a detached element carrying the given attributes.
    ///
    /// Later duplicates of an attribute name are dropped.
    pub fn create_element_with_attrs<I, K, V>(&mut self, tag: &str, attrs: I) -> NodeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut unique: Vec<(String, String)> = Vec::new();
        for (name, value) in attrs {
            let name = name.into().to_ascii_lowercase();
            if !unique.iter().any(|(existing, _)| *existing == name) {
                unique.push((name, value.into()));
            }
        }
        self.push(NodeData::Element { tag: tag.to_ascii_lowercase(), attrs: unique })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id).map(|n| &n.data), Some(NodeData::Text(_)))
    }

    /// True when `id` is an element with the given (lowercase) tag.
    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    /// Text payload of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Replaces the payload of a text node. Other nodes are left alone.
    pub fn set_text(&mut self, id: NodeId, value: String) {
        if let Some(DomNode { data: NodeData::Text(text), .. }) = self.nodes.get_mut(id) {
            *text = value;
        }
    }

    /// Attributes of an element, empty for anything else.
    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id).iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Sets an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(DomNode { data: NodeData::Element { attrs, .. }, .. }) = self.nodes.get_mut(id) {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.retain_attrs(id, |key, _| key != name);
    }

    /// Keeps only the attributes for which `keep` returns true.
    pub fn retain_attrs(&mut self, id: NodeId, mut keep: impl FnMut(&str, &str) -> bool) {
        if let Some(DomNode { data: NodeData::Element { attrs, .. }, .. }) = self.nodes.get_mut(id) {
            attrs.retain(|(key, value)| keep(key, value));
        }
    }

    /// Renames an element, keeping its attributes and children.
    pub fn set_tag(&mut self, id: NodeId, new_tag: &str) {
        if let Some(DomNode { data: NodeData::Element { tag, .. }, .. }) = self.nodes.get_mut(id) {
            *tag = new_tag.to_ascii_lowercase();
        }
    }

    /// `class` and `id` joined by a space, the string heuristics match against.
    pub fn class_and_id(&self, id: NodeId) -> String {
        format!("{} {}", self.attr(id, "class").unwrap_or(""), self.attr(id, "id").unwrap_or(""))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent_id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.child_ids.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().copied().filter(|child| self.is_element(*child))
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.element_children(id).next()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent)[index + 1..].iter().copied().find(|n| self.is_element(*n))
    }

    /// Walks from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors { tree: self, next: self.parent(id) }
    }

    /// True when `ancestor` is `id` itself or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// True when the node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == 0 || self.ancestors(id).any(|a| a == 0)
    }

    /// Preorder descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Descendant elements with the given tag in document order; `"*"` matches all.
    pub fn elements_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| match self.tag_name(*n) {
                Some(name) => tag == "*" || name == tag,
                None => false,
            })
            .collect()
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Next element in document order, optionally skipping the subtree of `id`.
    pub fn next_node(&self, id: NodeId, skip_children: bool) -> Option<NodeId> {
        if !skip_children && let Some(child) = self.first_element_child(id) {
            return Some(child);
        }
        if let Some(sibling) = self.next_element_sibling(id) {
            return Some(sibling);
        }
        let mut current = self.parent(id);
        while let Some(node) = current {
            if let Some(sibling) = self.next_element_sibling(node) {
                return Some(sibling);
            }
            current = self.parent(node);
        }
        None
    }

    /// Number of elements reachable from the root.
    pub fn element_count(&self) -> usize {
        self.descendants(0).into_iter().filter(|n| self.is_element(*n)).count()
    }

    /// Unlinks a node from its parent. Detached nodes are a no-op.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent].child_ids.retain(|child| *child != id);
            self.nodes[id].parent_id = None;
        }
    }

    /// Removes a node from the tree.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::DetachedNode`] when the node has no parent
    /// or does not exist.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if self.parent(id).is_none() {
            return Err(ReadmarkError::DetachedNode(id));
        }
        self.detach(id);
        Ok(())
    }

    /// Appends `child` as the last child of `parent`, moving it if attached.
    ///
    /// Refuses to create a cycle: appending a node under itself or one of
    /// its descendants is a no-op.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if child >= self.nodes.len() || parent >= self.nodes.len() || self.is_inclusive_ancestor(child, parent) {
            return;
        }
        self.detach(child);
        self.nodes[parent].child_ids.push(child);
        self.nodes[child].parent_id = Some(parent);
    }

    /// Inserts `child` right before `reference` under the reference's parent.
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        if child >= self.nodes.len() || self.is_inclusive_ancestor(child, parent) || child == reference {
            return;
        }
        self.detach(child);
        if let Some(index) = self.index_in_parent(reference) {
            self.nodes[parent].child_ids.insert(index, child);
            self.nodes[child].parent_id = Some(parent);
        }
    }

    /// Puts `new` where `old` was and detaches `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        if old == new {
            return;
        }
        self.insert_before(old, new);
        if self.parent(new) == Some(parent) {
            self.detach(old);
        }
    }

    /// Moves every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = self.children(from).to_vec();
        for child in children {
            self.append_child(to, child);
        }
    }

    /// Replaces an element with its children.
    pub fn unwrap_node(&mut self, id: NodeId) {
        if self.parent(id).is_none() {
            return;
        }
        let children = self.children(id).to_vec();
        for child in children {
            self.insert_before(id, child);
        }
        self.detach(id);
    }

    /// Deep-copies the subtree at `id` into a fresh tree.
    ///
    /// Copying the root copies its children; copying any other node makes it
    /// the only child of the new root.
    pub fn copy_subtree(&self, id: NodeId) -> DomTree {
        let mut out = DomTree::new();
        if id == 0 {
            for child in self.children(0) {
                out.import(self, *child, 0);
            }
        } else if id < self.nodes.len() {
            out.import(self, id, 0);
        }
        out
    }

    /// Deep-copies `id` from `other` and appends it under `parent`.
    pub fn import(&mut self, other: &DomTree, id: NodeId, parent: NodeId) -> Option<NodeId> {
        let node = other.get_node(id)?;
        let copy = self.push(node.data.clone());
        self.append_child(parent, copy);
        let mut stack: Vec<(NodeId, NodeId)> = vec![(id, copy)];
        while let Some((source, target)) = stack.pop() {
            for child in other.children(source) {
                let data = other.nodes[*child].data.clone();
                let new_child = self.push(data);
                self.nodes[target].child_ids.push(new_child);
                self.nodes[new_child].parent_id = Some(target);
                stack.push((*child, new_child));
            }
        }
        Some(copy)
    }

    /// Serializes a node and its subtree as HTML.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Serializes the children of a node as HTML.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => {
                for child in &node.child_ids {
                    self.write_html(*child, out);
                }
            }
            NodeData::Text(text) => {
                let raw = self.parent(id).and_then(|p| self.tag_name(p)).is_some_and(|tag| {
                    matches!(tag, "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext")
                });
                if raw {
                    out.push_str(text);
                } else {
                    escape_html(text, false, out);
                }
            }
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_html(value, true, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in &node.child_ids {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the ancestors of a node, nearest first.
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

fn escape_html(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element_with_attrs("DIV", [("class", "wrap"), ("CLASS", "dup")]);
        let p = tree.create_element("p");
        let text = tree.create_text("Hello <world> & co");
        tree.append_child(0, div);
        tree.append_child(div, p);
        tree.append_child(p, text);
        (tree, div, p, text)
    }

    #[test]
    fn test_create_and_serialize() {
        let (tree, div, _, _) = sample();
        assert_eq!(tree.tag_name(div), Some("div"));
        assert_eq!(tree.attrs(div).len(), 1);
        assert_eq!(
            tree.outer_html(div),
            "<div class=\"wrap\"><p>Hello &lt;world&gt; &amp; co</p></div>"
        );
    }

    #[test]
    fn test_parent_child_relationships() {
        let (tree, div, p, text) = sample();
        assert_eq!(tree.parent(p), Some(div));
        assert_eq!(tree.ancestors(text).collect::<Vec<_>>(), vec![p, div, 0]);
        assert!(tree.is_attached(text));
        assert_eq!(tree.text_content(div), "Hello <world> & co");
    }

    #[test]
    fn test_append_refuses_cycles() {
        let (mut tree, div, p, _) = sample();
        tree.append_child(p, div);
        assert_eq!(tree.parent(div), Some(0));
        assert_eq!(tree.parent(p), Some(div));
    }

    #[test]
    fn test_remove_detached_node_is_error() {
        let (mut tree, _, p, _) = sample();
        assert!(tree.remove(p).is_ok());
        assert!(!tree.is_attached(p));
        assert!(matches!(tree.remove(p), Err(ReadmarkError::DetachedNode(id)) if id == p));
    }

    #[test]
    fn test_replace_and_unwrap() {
        let (mut tree, div, p, text) = sample();
        let span = tree.create_element("span");
        tree.replace(p, span);
        assert_eq!(tree.children(div), &[span]);
        tree.append_child(span, text);
        tree.unwrap_node(span);
        assert_eq!(tree.children(div), &[text]);
    }

    #[test]
    fn test_next_node_walks_elements_in_order() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        let d = tree.create_element("d");
        tree.append_child(0, a);
        tree.append_child(a, b);
        tree.append_child(b, c);
        tree.append_child(a, d);

        assert_eq!(tree.next_node(a, false), Some(b));
        assert_eq!(tree.next_node(b, false), Some(c));
        assert_eq!(tree.next_node(c, false), Some(d));
        assert_eq!(tree.next_node(b, true), Some(d));
        assert_eq!(tree.next_node(d, false), None);
    }

    #[test]
    fn test_copy_subtree_is_independent() {
        let (tree, div, _, _) = sample();
        let mut copy = tree.copy_subtree(div);
        let copied_div = copy.children(0)[0];
        copy.set_attr(copied_div, "class", "changed");
        assert_eq!(tree.attr(div, "class"), Some("wrap"));
        assert_eq!(copy.text_content(0), "Hello <world> & co");
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let mut tree = DomTree::new();
        let img = tree.create_element_with_attrs("img", [("src", "a.png"), ("alt", "say \"hi\"")]);
        tree.append_child(0, img);
        assert_eq!(tree.outer_html(img), "<img src=\"a.png\" alt=\"say &quot;hi&quot;\">");
    }
}
