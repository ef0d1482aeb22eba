use crate::plan::node::{Modifier, NodeId, NodeKind, PlanNode, TestPlan};

/// The run/skip decision for a node after applying inheritance and
/// focus-dominance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveState {
    Run,
    Skip,
}

/// The resolved effective state of every node in a plan, computed as a pure
/// pre-pass before anything executes.
#[derive(Debug, Clone)]
pub struct Resolution {
    states: Vec<EffectiveState>,
    has_focused_nodes: bool,
}

impl Resolution {
    pub fn state(&self, id: NodeId) -> EffectiveState {
        self.states[id.index()]
    }

    pub fn is_run(&self, id: NodeId) -> bool {
        self.state(id) == EffectiveState::Run
    }

    /// Whether any node anywhere in the plan carries a focus modifier.
    pub fn has_focused_nodes(&self) -> bool {
        self.has_focused_nodes
    }
}

/// Resolve focus/skip for a whole plan.
///
/// Skip is inherited and always wins along a path: a descendant's focus
/// cannot override it. If any node anywhere carries focus, the run is in
/// focus mode: a case runs only if it is focused or inherits focus from an
/// ancestor, and a group is entered only if it is focused or contains an
/// effectively-running descendant. Hooks are not focus-filtered; they follow
/// their owning group, except that a hook's own skip modifier holds it out.
pub fn resolve(plan: &TestPlan) -> Resolution {
    let has_focused_nodes = contains_focus(plan.root());
    let mut states = vec![EffectiveState::Skip; plan.node_count()];
    resolve_node(plan.root(), false, false, has_focused_nodes, &mut states);
    Resolution {
        states,
        has_focused_nodes,
    }
}

fn contains_focus(node: &PlanNode) -> bool {
    node.modifier == Modifier::Focus || node.children.iter().any(contains_focus)
}

/// Resolve one node, returning whether its subtree contains anything that
/// effectively runs (used by ancestor groups to decide entry).
fn resolve_node(
    node: &PlanNode,
    ancestor_skip: bool,
    ancestor_focus: bool,
    focus_mode: bool,
    states: &mut [EffectiveState],
) -> bool {
    let skipped = ancestor_skip || node.modifier == Modifier::Skip;
    let focused = ancestor_focus || node.modifier == Modifier::Focus;

    match node.kind {
        NodeKind::Group => {
            let mut any_content_runs = false;
            for child in &node.children {
                if child.kind.is_each_hook() || child.kind.is_all_hook() {
                    continue;
                }
                any_content_runs |=
                    resolve_node(child, skipped, focused, focus_mode, states);
            }

            let runs = !skipped && (!focus_mode || focused || any_content_runs);
            states[node.id().index()] = run_state(runs);

            // Hooks follow the group's entry decision; only their own skip
            // modifier holds them out.
            for child in &node.children {
                if child.kind.is_each_hook() || child.kind.is_all_hook() {
                    let hook_runs = runs && child.modifier != Modifier::Skip;
                    states[child.id().index()] = run_state(hook_runs);
                }
            }

            runs
        }
        _ => {
            let runs = !skipped && (!focus_mode || focused);
            states[node.id().index()] = run_state(runs);
            runs
        }
    }
}

fn run_state(runs: bool) -> EffectiveState {
    if runs {
        EffectiveState::Run
    } else {
        EffectiveState::Skip
    }
}
