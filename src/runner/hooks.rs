use crate::plan::node::{NodeKind, PlanNode};

/// The lifecycle hooks in scope for one branch of the traversal.
///
/// Holds the BeforeEach/AfterEach hooks accumulated from the root down to
/// the current group, plus the current group's own BeforeAll/AfterAll.
/// Each-hooks are inherited by the whole subtree; all-hooks are not: a
/// descent replaces them with the child group's own.
///
/// Values are immutable snapshots: [`LifecycleHooks::layered`] copies the
/// inherited sequences, so extending one branch can never be observed by a
/// sibling branch.
pub struct LifecycleHooks<'p> {
    before_each: Vec<&'p PlanNode>,
    after_each: Vec<&'p PlanNode>,
    before_all: Vec<&'p PlanNode>,
    after_all: Vec<&'p PlanNode>,
}

impl<'p> LifecycleHooks<'p> {
    /// The hook scope above the root group: nothing in scope.
    pub fn empty() -> Self {
        Self {
            before_each: Vec::new(),
            after_each: Vec::new(),
            before_all: Vec::new(),
            after_all: Vec::new(),
        }
    }

    /// The scope for descending into `group`: inherited each-hooks plus the
    /// group's own, and the group's own all-hooks only.
    pub fn layered(&self, group: &'p PlanNode) -> Self {
        let mut scoped = Self {
            before_each: self.before_each.clone(),
            after_each: self.after_each.clone(),
            before_all: Vec::new(),
            after_all: Vec::new(),
        };
        for child in &group.children {
            match child.kind {
                NodeKind::BeforeEach => scoped.before_each.push(child),
                NodeKind::AfterEach => scoped.after_each.push(child),
                NodeKind::BeforeAll => scoped.before_all.push(child),
                NodeKind::AfterAll => scoped.after_all.push(child),
                NodeKind::Group | NodeKind::Case => {}
            }
        }
        scoped
    }

    /// BeforeEach hooks in execution order: ancestor to descendant.
    pub fn before_each_outermost_first(&self) -> impl Iterator<Item = &'p PlanNode> + '_ {
        self.before_each.iter().copied()
    }

    /// AfterEach hooks in execution order: descendant to ancestor.
    pub fn after_each_innermost_first(&self) -> impl Iterator<Item = &'p PlanNode> + '_ {
        self.after_each.iter().rev().copied()
    }

    /// The current group's BeforeAll hooks in declared order.
    pub fn before_all(&self) -> &[&'p PlanNode] {
        &self.before_all
    }

    /// The current group's AfterAll hooks in declared order.
    pub fn after_all(&self) -> &[&'p PlanNode] {
        &self.after_all
    }
}
