use std::collections::HashMap;

use crate::error::{CoreError, CoreErrorCode};

/// Attribute used to address components inside a behavior tree.
pub const ID_ATTRIBUTE: &str = "ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable element tree stored in an arena.
///
/// Detached nodes stay allocated but are unreachable from the root and are
/// dropped from the `ID` index, so lookups only ever see attached elements.
#[derive(Debug, Clone)]
pub struct ElementTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    id_index: HashMap<String, Vec<NodeId>>,
}

impl ElementTree {
    pub fn new(root_name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            id_index: HashMap::new(),
        };
        let root = tree.alloc(
            NodeKind::Element {
                name: root_name.into(),
                attributes,
            },
            None,
        );
        tree.index_node(root);
        tree.root = root;
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.0].kind
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self, node: NodeId) -> &[Attribute] {
        match self.kind(node) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Element { .. })
    }

    pub fn first_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|&child| self.is_element(child))
    }

    pub fn element_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
    }

    /// Concatenated text of `node` and all of its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    /// Every attached element whose `ID` attribute equals `id`.
    pub fn nodes_with_id(&self, id: &str) -> &[NodeId] {
        self.id_index.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolves `id` to exactly one attached element.
    pub fn find_by_id(&self, id: &str) -> Result<NodeId, CoreError> {
        match self.nodes_with_id(id) {
            [] => Err(CoreError::new(
                CoreErrorCode::NodeNotFound,
                format!("no node with ID '{id}'"),
            )),
            [node] => Ok(*node),
            many => Err(CoreError::new(
                CoreErrorCode::DuplicateNodeId,
                format!("ID '{id}' matches {} nodes", many.len()),
            )),
        }
    }

    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let node = self.alloc(kind, Some(parent));
        self.nodes[parent.0].children.push(node);
        if self.is_attached(node) {
            self.index_node(node);
        }
        node
    }

    pub fn append_element(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        self.append_child(
            parent,
            NodeKind::Element {
                name: name.into(),
                attributes: Vec::new(),
            },
        )
    }

    /// Appends `<name>text</name>` under `parent`. The text node is kept even
    /// when empty so the element is written with an explicit end tag.
    pub fn append_text_element(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> NodeId {
        let element = self.append_element(parent, name);
        self.append_child(element, NodeKind::Text(text.into()));
        element
    }

    /// Removes `node` from its parent's child list. The root cannot be detached.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };
        if self.is_attached(node) {
            self.unindex_subtree(node);
        }
        self.nodes[parent.0].children.retain(|&child| child != node);
        self.nodes[node.0].parent = None;
    }

    /// Drops every attribute and child of `node`, leaving an empty element.
    pub fn clear(&mut self, node: NodeId) {
        let attached = self.is_attached(node);
        if attached {
            self.unindex_node(node);
        }
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node.0].kind {
            attributes.clear();
        }

        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            if attached {
                self.unindex_subtree(child);
            }
            self.nodes[child.0].parent = None;
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let attached = self.is_attached(node);
        if attached && name == ID_ATTRIBUTE {
            self.unindex_node(node);
        }

        let value = value.into();
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node.0].kind {
            match attributes.iter_mut().find(|attr| attr.name == name) {
                Some(attr) => attr.value = value,
                None => attributes.push(Attribute {
                    name: name.to_string(),
                    value,
                }),
            }
        }

        if attached && name == ID_ATTRIBUTE {
            self.index_node(node);
        }
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let node = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent,
            children: Vec::new(),
        });
        node
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        while let Some(parent) = self.nodes[current.0].parent {
            current = parent;
        }
        current == self.root
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in self.children(node) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    fn index_node(&mut self, node: NodeId) {
        let Some(id) = self.attribute(node, ID_ATTRIBUTE).map(str::to_string) else {
            return;
        };
        self.id_index.entry(id).or_default().push(node);
    }

    fn unindex_node(&mut self, node: NodeId) {
        let Some(id) = self.attribute(node, ID_ATTRIBUTE).map(str::to_string) else {
            return;
        };
        if let Some(nodes) = self.id_index.get_mut(&id) {
            nodes.retain(|&n| n != node);
            if nodes.is_empty() {
                self.id_index.remove(&id);
            }
        }
    }

    fn unindex_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.unindex_node(current);
            stack.extend(self.nodes[current.0].children.iter().copied());
        }
    }
}
