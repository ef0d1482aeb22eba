use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runner::context::{Failure, RunContext};

/// The callable unit carried by case and hook nodes.
///
/// A body receives the execution-context handle and either returns success
/// or raises a [`Failure`]. Bodies may also panic; the engine captures
/// panics and converts them into failures.
pub type Body = Box<dyn Fn(&mut RunContext) -> Result<(), Failure>>;

/// The six node kinds of a test plan tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Group,
    Case,
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl NodeKind {
    /// Whether this kind carries an executable body (everything but Group).
    pub fn has_body(self) -> bool {
        self != Self::Group
    }

    /// Whether this is a per-case hook (BeforeEach/AfterEach).
    pub fn is_each_hook(self) -> bool {
        matches!(self, Self::BeforeEach | Self::AfterEach)
    }

    /// Whether this is a per-group hook (BeforeAll/AfterAll).
    pub fn is_all_hook(self) -> bool {
        matches!(self, Self::BeforeAll | Self::AfterAll)
    }

    /// Whether this kind produces its own result record.
    pub fn is_recorded(self) -> bool {
        matches!(self, Self::Case | Self::BeforeAll | Self::AfterAll)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group"),
            Self::Case => write!(f, "case"),
            Self::BeforeAll => write!(f, "before all"),
            Self::AfterAll => write!(f, "after all"),
            Self::BeforeEach => write!(f, "before each"),
            Self::AfterEach => write!(f, "after each"),
        }
    }
}

/// Per-node inclusion override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modifier {
    #[default]
    None,
    Skip,
    Focus,
}

/// Stable identity of a node within one sealed [`TestPlan`].
///
/// Ids are assigned in pre-order when the plan is sealed and double as the
/// key for result records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of a plan tree.
///
/// Built through the constructors (or [`crate::plan::builder::declare`]) and
/// sealed into a [`TestPlan`], which validates structure and assigns ids.
pub struct PlanNode {
    pub(crate) id: NodeId,
    pub kind: NodeKind,
    pub modifier: Modifier,
    pub label: String,
    pub body: Option<Body>,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Create a group node with the given children in declared order.
    pub fn group(label: impl Into<String>, children: Vec<PlanNode>) -> Self {
        Self {
            id: NodeId(0),
            kind: NodeKind::Group,
            modifier: Modifier::None,
            label: label.into(),
            body: None,
            children,
        }
    }

    /// Create a test case node.
    pub fn case(
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) -> Self {
        Self::leaf(NodeKind::Case, label, body)
    }

    /// Create a hook that runs once before the first running child of its group.
    pub fn before_all(
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) -> Self {
        Self::leaf(NodeKind::BeforeAll, label, body)
    }

    /// Create a hook that runs once after the last child of its group.
    pub fn after_all(
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) -> Self {
        Self::leaf(NodeKind::AfterAll, label, body)
    }

    /// Create a hook that runs before every case in its group's subtree.
    pub fn before_each(
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) -> Self {
        Self::leaf(NodeKind::BeforeEach, label, body)
    }

    /// Create a hook that runs after every case in its group's subtree.
    pub fn after_each(
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) -> Self {
        Self::leaf(NodeKind::AfterEach, label, body)
    }

    fn leaf(
        kind: NodeKind,
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) -> Self {
        Self {
            id: NodeId(0),
            kind,
            modifier: Modifier::None,
            label: label.into(),
            body: Some(Box::new(body)),
            children: Vec::new(),
        }
    }

    /// Replace this node's modifier.
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = modifier;
        self
    }

    /// Mark this node focused.
    pub fn focused(self) -> Self {
        self.with_modifier(Modifier::Focus)
    }

    /// Mark this node skipped.
    pub fn skipped(self) -> Self {
        self.with_modifier(Modifier::Skip)
    }

    /// The node's identity within its sealed plan.
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl fmt::Debug for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("modifier", &self.modifier)
            .field("label", &self.label)
            .field("body", &self.body.as_ref().map(|_| "<body>"))
            .field("children", &self.children)
            .finish()
    }
}

/// A sealed, validated plan tree: the read-only input to the engine.
#[derive(Debug)]
pub struct TestPlan {
    root: PlanNode,
    node_count: usize,
}

impl TestPlan {
    /// Seal a root node into a runnable plan.
    ///
    /// Validates the structural invariants and assigns pre-order node ids.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] if the root is not a group, a group carries a
    /// body, a leaf kind carries children, or a body is missing.
    pub fn new(mut root: PlanNode) -> Result<Self, PlanError> {
        if root.kind != NodeKind::Group {
            return Err(PlanError {
                kind: PlanErrorKind::RootNotGroup,
                message: format!("root node \"{}\" is a {}", root.label, root.kind),
            });
        }
        validate_node(&root)?;
        let node_count = assign_ids(&mut root, 0);
        Ok(Self { root, node_count })
    }

    pub fn root(&self) -> &PlanNode {
        &self.root
    }

    /// Total number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        self.node_count
    }
}

fn validate_node(node: &PlanNode) -> Result<(), PlanError> {
    if node.kind == NodeKind::Group {
        if node.body.is_some() {
            return Err(PlanError {
                kind: PlanErrorKind::BodyOnGroup,
                message: format!("group \"{}\" carries a body", node.label),
            });
        }
        for child in &node.children {
            validate_node(child)?;
        }
        return Ok(());
    }

    if !node.children.is_empty() {
        return Err(PlanError {
            kind: PlanErrorKind::ChildrenOnLeaf,
            message: format!(
                "{} \"{}\" carries {} children",
                node.kind,
                node.label,
                node.children.len()
            ),
        });
    }
    if node.body.is_none() {
        return Err(PlanError {
            kind: PlanErrorKind::MissingBody,
            message: format!("{} \"{}\" has no body", node.kind, node.label),
        });
    }
    Ok(())
}

/// Number nodes in pre-order, returning the count of ids handed out.
fn assign_ids(node: &mut PlanNode, next: usize) -> usize {
    node.id = NodeId(next);
    let mut next = next + 1;
    for child in &mut node.children {
        next = assign_ids(child, next);
    }
    next
}

/// A structural defect in a declared plan tree.
///
/// This is a defect in the declaration front-end, distinct from any test
/// failure; the engine never attributes it to a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanError {
    pub kind: PlanErrorKind,
    pub message: String,
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PlanError {}

/// Classification of plan construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanErrorKind {
    /// The root node is not a group.
    RootNotGroup,
    /// A group node carries an executable body.
    BodyOnGroup,
    /// A case or hook node carries children.
    ChildrenOnLeaf,
    /// A case or hook node has no body.
    MissingBody,
    /// Focus and skip were both requested for one node.
    ConflictingModifiers,
}

impl fmt::Display for PlanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotGroup => write!(f, "root is not a group"),
            Self::BodyOnGroup => write!(f, "body on group"),
            Self::ChildrenOnLeaf => write!(f, "children on leaf node"),
            Self::MissingBody => write!(f, "missing body"),
            Self::ConflictingModifiers => write!(f, "conflicting modifiers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_body(_: &mut RunContext) -> Result<(), Failure> {
        Ok(())
    }

    #[test]
    fn group_constructor_has_no_body() {
        let node = PlanNode::group("root", vec![]);
        assert_eq!(node.kind, NodeKind::Group);
        assert_eq!(node.modifier, Modifier::None);
        assert!(node.body.is_none());
        assert!(node.children.is_empty());
    }

    #[test]
    fn leaf_constructors_set_kind_and_body() {
        let case = PlanNode::case("adds", ok_body);
        assert_eq!(case.kind, NodeKind::Case);
        assert!(case.body.is_some());

        assert_eq!(PlanNode::before_all("b", ok_body).kind, NodeKind::BeforeAll);
        assert_eq!(PlanNode::after_all("a", ok_body).kind, NodeKind::AfterAll);
        assert_eq!(
            PlanNode::before_each("b", ok_body).kind,
            NodeKind::BeforeEach
        );
        assert_eq!(PlanNode::after_each("a", ok_body).kind, NodeKind::AfterEach);
    }

    #[test]
    fn modifier_chainers() {
        assert_eq!(
            PlanNode::case("c", ok_body).focused().modifier,
            Modifier::Focus
        );
        assert_eq!(
            PlanNode::group("g", vec![]).skipped().modifier,
            Modifier::Skip
        );
    }

    #[test]
    fn seal_assigns_preorder_ids() {
        let plan = TestPlan::new(PlanNode::group(
            "root",
            vec![
                PlanNode::case("first", ok_body),
                PlanNode::group("inner", vec![PlanNode::case("second", ok_body)]),
                PlanNode::case("third", ok_body),
            ],
        ))
        .unwrap();

        assert_eq!(plan.node_count(), 5);
        let root = plan.root();
        assert_eq!(root.id().index(), 0);
        assert_eq!(root.children[0].id().index(), 1);
        assert_eq!(root.children[1].id().index(), 2);
        assert_eq!(root.children[1].children[0].id().index(), 3);
        assert_eq!(root.children[2].id().index(), 4);
    }

    #[test]
    fn seal_rejects_non_group_root() {
        let err = TestPlan::new(PlanNode::case("lonely", ok_body)).unwrap_err();
        assert_eq!(err.kind, PlanErrorKind::RootNotGroup);
        assert!(err.message.contains("lonely"));
    }

    #[test]
    fn seal_rejects_group_with_body() {
        let mut group = PlanNode::group("root", vec![]);
        group.body = Some(Box::new(ok_body));
        let err = TestPlan::new(group).unwrap_err();
        assert_eq!(err.kind, PlanErrorKind::BodyOnGroup);
    }

    #[test]
    fn seal_rejects_hook_with_children() {
        let mut hook = PlanNode::before_each("setup", ok_body);
        hook.children.push(PlanNode::case("nested", ok_body));
        let err = TestPlan::new(PlanNode::group("root", vec![hook])).unwrap_err();
        assert_eq!(err.kind, PlanErrorKind::ChildrenOnLeaf);
        assert!(err.message.contains("setup"));
    }

    #[test]
    fn seal_rejects_leaf_without_body() {
        let mut case = PlanNode::case("adds", ok_body);
        case.body = None;
        let err = TestPlan::new(PlanNode::group("root", vec![case])).unwrap_err();
        assert_eq!(err.kind, PlanErrorKind::MissingBody);
    }

    #[test]
    fn validation_descends_into_nested_groups() {
        let mut bad = PlanNode::case("deep", ok_body);
        bad.body = None;
        let plan = PlanNode::group("root", vec![PlanNode::group("inner", vec![bad])]);
        assert!(TestPlan::new(plan).is_err());
    }

    #[test]
    fn node_kind_display() {
        assert_eq!(NodeKind::Group.to_string(), "group");
        assert_eq!(NodeKind::Case.to_string(), "case");
        assert_eq!(NodeKind::BeforeAll.to_string(), "before all");
        assert_eq!(NodeKind::AfterAll.to_string(), "after all");
        assert_eq!(NodeKind::BeforeEach.to_string(), "before each");
        assert_eq!(NodeKind::AfterEach.to_string(), "after each");
    }

    #[test]
    fn node_kind_predicates() {
        assert!(!NodeKind::Group.has_body());
        assert!(NodeKind::Case.has_body());
        assert!(NodeKind::BeforeEach.is_each_hook());
        assert!(NodeKind::AfterEach.is_each_hook());
        assert!(NodeKind::BeforeAll.is_all_hook());
        assert!(NodeKind::AfterAll.is_all_hook());
        assert!(NodeKind::Case.is_recorded());
        assert!(NodeKind::BeforeAll.is_recorded());
        assert!(!NodeKind::BeforeEach.is_recorded());
        assert!(!NodeKind::Group.is_recorded());
    }

    #[test]
    fn plan_error_display() {
        let err = PlanError {
            kind: PlanErrorKind::MissingBody,
            message: "case \"adds\" has no body".into(),
        };
        assert_eq!(err.to_string(), "missing body: case \"adds\" has no body");
    }

    #[test]
    fn siblings_may_share_a_label() {
        let plan = TestPlan::new(PlanNode::group(
            "root",
            vec![PlanNode::case("dup", ok_body), PlanNode::case("dup", ok_body)],
        ))
        .unwrap();
        assert_eq!(plan.node_count(), 3);
    }
}
