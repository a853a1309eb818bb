//! Arena-backed construct tree.
//!
//! Every declared resource lives at a node of the tree. Nodes hold a parent
//! back-reference, so questions like "which stage deploys this construct?"
//! are answered by walking up from a [`ConstructId`] handle, without any
//! global registry.
//!
//! ```text
//! App (my-app)                         <- deployable unit
//! ├── MyAppPipeline          (stack)
//! └── Production             (stage)   <- deployable unit
//!     └── production         (stack)
//!         └── db             (construct)
//!             └── host-output
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a node in a [`ConstructTree`].
///
/// A handle is only valid for the tree that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstructId {
    tree: u64,
    index: usize,
}

impl ConstructId {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl std::fmt::Display for ConstructId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Kind of construct stored at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructKind {
    /// Tree root. Top-level stacks are deployed as part of the app itself.
    App,
    /// A group of stacks deployed together.
    Stage,
    /// A single deployment template.
    Stack,
    /// Any resource or grouping inside a stack.
    Construct,
}

impl ConstructKind {
    /// Whether nodes of this kind delimit a deployable unit.
    pub fn is_unit(&self) -> bool {
        matches!(self, ConstructKind::App | ConstructKind::Stage)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructKind::App => "app",
            ConstructKind::Stage => "stage",
            ConstructKind::Stack => "stack",
            ConstructKind::Construct => "construct",
        }
    }
}

impl std::fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Node {
    id: String,
    kind: ConstructKind,
    parent: Option<ConstructId>,
    children: Vec<ConstructId>,
}

/// The construct tree of one application.
#[derive(Debug, Clone)]
pub struct ConstructTree {
    id: u64,
    nodes: Vec<Node>,
}

impl ConstructTree {
    /// Create a tree holding only the app root.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: vec![Node {
                id: app_id.into(),
                kind: ConstructKind::App,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The app root.
    pub fn root(&self) -> ConstructId {
        self.handle(0)
    }

    fn handle(&self, index: usize) -> ConstructId {
        ConstructId {
            tree: self.id,
            index,
        }
    }

    /// Add a stage under `parent`.
    pub fn add_stage(&mut self, parent: ConstructId, id: impl Into<String>) -> CoreResult<ConstructId> {
        self.add(parent, id.into(), ConstructKind::Stage)
    }

    /// Add a stack under `parent`.
    pub fn add_stack(&mut self, parent: ConstructId, id: impl Into<String>) -> CoreResult<ConstructId> {
        self.add(parent, id.into(), ConstructKind::Stack)
    }

    /// Add a plain construct under `parent`.
    pub fn add_construct(
        &mut self,
        parent: ConstructId,
        id: impl Into<String>,
    ) -> CoreResult<ConstructId> {
        self.add(parent, id.into(), ConstructKind::Construct)
    }

    fn add(&mut self, parent: ConstructId, id: String, kind: ConstructKind) -> CoreResult<ConstructId> {
        self.node(parent)?;

        if self.child(parent, &id).is_some() {
            return Err(CoreError::DuplicateConstruct {
                parent: self.path(parent)?,
                id,
            });
        }

        let handle = self.handle(self.nodes.len());
        self.nodes.push(Node {
            id,
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index].children.push(handle);

        debug!("Registered {} {}", kind, self.path(handle)?);
        Ok(handle)
    }

    fn node(&self, handle: ConstructId) -> CoreResult<&Node> {
        if handle.tree != self.id {
            return Err(CoreError::UnknownConstruct(handle.index));
        }
        self.nodes
            .get(handle.index)
            .ok_or(CoreError::UnknownConstruct(handle.index))
    }

    /// Whether `handle` belongs to this tree.
    pub fn contains(&self, handle: ConstructId) -> bool {
        self.node(handle).is_ok()
    }

    /// Local id of a construct.
    pub fn id(&self, handle: ConstructId) -> CoreResult<&str> {
        Ok(self.node(handle)?.id.as_str())
    }

    pub fn kind(&self, handle: ConstructId) -> CoreResult<ConstructKind> {
        Ok(self.node(handle)?.kind)
    }

    pub fn parent(&self, handle: ConstructId) -> CoreResult<Option<ConstructId>> {
        Ok(self.node(handle)?.parent)
    }

    pub fn children(&self, handle: ConstructId) -> CoreResult<&[ConstructId]> {
        Ok(self.node(handle)?.children.as_slice())
    }

    /// Find a direct child by id.
    pub fn child(&self, parent: ConstructId, id: &str) -> Option<ConstructId> {
        self.node(parent).ok().and_then(|node| {
            node.children
                .iter()
                .copied()
                .find(|c| self.nodes[c.index].id == id)
        })
    }

    /// Handles from `handle` up to the root, starting with `handle` itself.
    pub fn ancestors(&self, handle: ConstructId) -> CoreResult<Vec<ConstructId>> {
        let mut chain = vec![handle];
        let mut current = self.node(handle)?.parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes[parent.index].parent;
        }
        Ok(chain)
    }

    /// Slash-separated path from the root, e.g. `my-app/Production/production/db`.
    pub fn path(&self, handle: ConstructId) -> CoreResult<String> {
        let mut ids: Vec<&str> = self
            .ancestors(handle)?
            .into_iter()
            .map(|c| self.nodes[c.index].id.as_str())
            .collect();
        ids.reverse();
        Ok(ids.join("/"))
    }

    /// Ids on the path from `ancestor` (exclusive) down to `handle` (inclusive).
    pub fn path_below(&self, ancestor: ConstructId, handle: ConstructId) -> CoreResult<Vec<&str>> {
        let mut ids = Vec::new();
        for c in self.ancestors(handle)? {
            if c == ancestor {
                ids.reverse();
                return Ok(ids);
            }
            ids.push(self.nodes[c.index].id.as_str());
        }
        Err(CoreError::InvalidConfig(format!(
            "{} is not below {}",
            self.path(handle)?,
            self.path(ancestor)?
        )))
    }

    /// Nearest enclosing deployable unit (a stage, or the app root).
    ///
    /// A stage or app is its own enclosing unit.
    pub fn enclosing_unit(&self, handle: ConstructId) -> CoreResult<ConstructId> {
        for c in self.ancestors(handle)? {
            if self.nodes[c.index].kind.is_unit() {
                return Ok(c);
            }
        }
        // The root is always an App, so the walk above always terminates on it.
        Ok(self.root())
    }

    /// Nearest enclosing stack.
    pub fn enclosing_stack(&self, handle: ConstructId) -> CoreResult<ConstructId> {
        for c in self.ancestors(handle)? {
            match self.nodes[c.index].kind {
                ConstructKind::Stack => return Ok(c),
                ConstructKind::Stage | ConstructKind::App => break,
                ConstructKind::Construct => {}
            }
        }
        Err(CoreError::NotInStack {
            path: self.path(handle)?,
        })
    }

    /// Cloud assembly artifact id of a stack.
    ///
    /// Stacks inside a stage are prefixed with the stage id
    /// (`Production-production`); top-level stacks use their own id.
    pub fn artifact_id(&self, stack: ConstructId) -> CoreResult<String> {
        let stack = self.enclosing_stack(stack)?;
        let unit = self.enclosing_unit(stack)?;
        let own = self.nodes[stack.index].id.as_str();

        if self.nodes[unit.index].kind == ConstructKind::App {
            return Ok(own.to_string());
        }
        Ok(format!("{}-{}", self.nodes[unit.index].id, own))
    }

    /// Number of constructs, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (ConstructTree, ConstructId, ConstructId, ConstructId) {
        let mut tree = ConstructTree::new("my-app");
        let root = tree.root();
        let pipeline = tree.add_stack(root, "MyAppPipeline").unwrap();
        let stage = tree.add_stage(root, "Production").unwrap();
        let stack = tree.add_stack(stage, "production").unwrap();
        let db = tree.add_construct(stack, "db").unwrap();
        (tree, pipeline, stack, db)
    }

    #[test]
    fn test_path_and_parents() {
        let (tree, _, stack, db) = sample();

        assert_eq!(tree.path(db).unwrap(), "my-app/Production/production/db");
        assert_eq!(tree.parent(db).unwrap(), Some(stack));
        assert_eq!(tree.kind(db).unwrap(), ConstructKind::Construct);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let (mut tree, _, stack, _) = sample();

        let err = tree.add_construct(stack, "db").unwrap_err();
        assert!(matches!(err, CoreError::DuplicateConstruct { .. }));
        assert!(err.to_string().contains("my-app/Production/production"));
    }

    #[test]
    fn test_enclosing_unit() {
        let (tree, pipeline, stack, db) = sample();

        let stage = tree.parent(stack).unwrap().unwrap();
        assert_eq!(tree.enclosing_unit(db).unwrap(), stage);
        assert_eq!(tree.enclosing_unit(stage).unwrap(), stage);
        assert_eq!(tree.enclosing_unit(pipeline).unwrap(), tree.root());
    }

    #[test]
    fn test_artifact_ids() {
        let (tree, pipeline, stack, db) = sample();

        assert_eq!(tree.artifact_id(stack).unwrap(), "Production-production");
        assert_eq!(tree.artifact_id(db).unwrap(), "Production-production");
        assert_eq!(tree.artifact_id(pipeline).unwrap(), "MyAppPipeline");
    }

    #[test]
    fn test_enclosing_stack_outside_stack() {
        let (tree, _, stack, _) = sample();

        let stage = tree.parent(stack).unwrap().unwrap();
        assert!(matches!(
            tree.enclosing_stack(stage),
            Err(CoreError::NotInStack { .. })
        ));
    }

    #[test]
    fn test_unknown_handle() {
        let (tree, ..) = sample();

        let foreign = tree.handle(42);
        assert!(!tree.contains(foreign));
        assert!(matches!(tree.path(foreign), Err(CoreError::UnknownConstruct(42))));
    }

    #[test]
    fn test_handle_from_other_tree() {
        let (tree, _, stack, _) = sample();
        let (other, _, other_stack, other_db) = sample();

        assert_eq!(stack.index(), other_stack.index());
        assert!(!tree.contains(other_stack));
        assert!(matches!(tree.path(other_db), Err(CoreError::UnknownConstruct(_))));
        assert!(tree.child(other.root(), "Production").is_none());
    }

    #[test]
    fn test_path_below() {
        let (mut tree, _, stack, db) = sample();
        let output = tree.add_construct(db, "host-output").unwrap();

        assert_eq!(tree.path_below(stack, output).unwrap(), vec!["db", "host-output"]);
        assert!(tree.path_below(output, stack).is_err());
    }
}
