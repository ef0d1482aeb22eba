use crate::plan::node::{Modifier, PlanError, PlanErrorKind, PlanNode, TestPlan};
use crate::runner::context::{Failure, RunContext};

/// Declare a test plan.
///
/// The closure receives the root [`GroupScope`]; nested groups receive their
/// own scope. Focus/skip are requested through the scope handle of the node
/// being declared, so they cannot leak into siblings or ancestors and there
/// is no global declaration state.
///
/// ```
/// use spectree::plan::builder::declare;
///
/// let plan = declare("calculator", |g| {
///     g.before_each("reset", |_| Ok(()));
///     g.group("addition", |g| {
///         g.case("adds small numbers", |_| Ok(()));
///     });
/// })
/// .unwrap();
/// assert_eq!(plan.node_count(), 4);
/// ```
///
/// # Errors
///
/// Returns a [`PlanError`] if a scope requested both focus and skip, or if
/// the finished tree fails structural validation.
pub fn declare(
    root_label: impl Into<String>,
    f: impl FnOnce(&mut GroupScope),
) -> Result<TestPlan, PlanError> {
    let mut scope = GroupScope::new(root_label.into(), Modifier::None);
    f(&mut scope);
    let (root, errors) = scope.finish();
    if let Some(error) = errors.into_iter().next() {
        return Err(error);
    }
    TestPlan::new(root)
}

/// Mutable handle for the group currently being declared.
pub struct GroupScope {
    label: String,
    modifier: Modifier,
    children: Vec<PlanNode>,
    errors: Vec<PlanError>,
}

impl GroupScope {
    fn new(label: String, modifier: Modifier) -> Self {
        Self {
            label,
            modifier,
            children: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> (PlanNode, Vec<PlanError>) {
        let node = PlanNode::group(self.label, self.children).with_modifier(self.modifier);
        (node, self.errors)
    }

    /// Mark the group being declared as focused.
    ///
    /// Requesting focus on a scope already marked skip is a declaration
    /// error surfaced by [`declare`].
    pub fn focus(&mut self) {
        if self.modifier == Modifier::Skip {
            self.push_conflict();
        } else {
            self.modifier = Modifier::Focus;
        }
    }

    /// Mark the group being declared as skipped.
    ///
    /// Requesting skip on a scope already marked focus is a declaration
    /// error surfaced by [`declare`].
    pub fn skip(&mut self) {
        if self.modifier == Modifier::Focus {
            self.push_conflict();
        } else {
            self.modifier = Modifier::Skip;
        }
    }

    fn push_conflict(&mut self) {
        self.errors.push(PlanError {
            kind: PlanErrorKind::ConflictingModifiers,
            message: format!(
                "group \"{}\" requested both focus and skip",
                self.label
            ),
        });
    }

    /// Declare a nested group.
    pub fn group(&mut self, label: impl Into<String>, f: impl FnOnce(&mut GroupScope)) {
        self.child_group(label.into(), Modifier::None, f);
    }

    /// Declare a nested group that is focused from the start.
    pub fn focused_group(&mut self, label: impl Into<String>, f: impl FnOnce(&mut GroupScope)) {
        self.child_group(label.into(), Modifier::Focus, f);
    }

    /// Declare a nested group that is skipped from the start.
    pub fn skipped_group(&mut self, label: impl Into<String>, f: impl FnOnce(&mut GroupScope)) {
        self.child_group(label.into(), Modifier::Skip, f);
    }

    fn child_group(&mut self, label: String, modifier: Modifier, f: impl FnOnce(&mut GroupScope)) {
        let mut child = GroupScope::new(label, modifier);
        f(&mut child);
        let (node, errors) = child.finish();
        self.errors.extend(errors);
        self.children.push(node);
    }

    /// Declare a test case.
    pub fn case(
        &mut self,
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) {
        self.children.push(PlanNode::case(label, body));
    }

    /// Declare a focused test case.
    pub fn focused_case(
        &mut self,
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) {
        self.children.push(PlanNode::case(label, body).focused());
    }

    /// Declare a skipped test case.
    pub fn skipped_case(
        &mut self,
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) {
        self.children.push(PlanNode::case(label, body).skipped());
    }

    /// Declare a hook that runs once before this group's first running child.
    pub fn before_all(
        &mut self,
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) {
        self.children.push(PlanNode::before_all(label, body));
    }

    /// Declare a hook that runs once after this group's last child.
    pub fn after_all(
        &mut self,
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) {
        self.children.push(PlanNode::after_all(label, body));
    }

    /// Declare a hook that runs before every case in this group's subtree.
    pub fn before_each(
        &mut self,
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) {
        self.children.push(PlanNode::before_each(label, body));
    }

    /// Declare a hook that runs after every case in this group's subtree.
    pub fn after_each(
        &mut self,
        label: impl Into<String>,
        body: impl Fn(&mut RunContext) -> Result<(), Failure> + 'static,
    ) {
        self.children.push(PlanNode::after_each(label, body));
    }
}
