use std::panic::{self, AssertUnwindSafe};

use crate::plan::node::{NodeKind, PlanNode, TestPlan};
use crate::plan::resolve::resolve;
use crate::runner::context::Failure;
use crate::runner::hooks::LifecycleHooks;
use crate::runner::result::{FailureDetail, FailureKind, RecordedResult, TestResults};
use crate::runner::session::TestSession;

/// What a node visit reports back to its parent: the node's label and
/// whether anything in its subtree failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSignal {
    pub label: String,
    pub failed: bool,
}

/// The execution engine. Walks a resolved plan depth-first, single-threaded
/// and strictly synchronous: no node executes concurrently with another,
/// children run in declared order, and a body must fully resolve before the
/// traversal moves on.
#[derive(Debug, Default)]
pub struct TestRunner;

impl TestRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run a full plan and return the assembled result tree.
    ///
    /// Total over any well-formed plan: every body/hook failure, including
    /// a panic, is captured into the results; nothing propagates out.
    /// Running the same plan twice with deterministic bodies yields
    /// structurally identical results from two independent sessions.
    pub fn run_plan(&self, plan: &TestPlan) -> TestResults {
        let mut session = TestSession::new(resolve(plan));
        self.run_plan_node(&mut session, plan.root(), &LifecycleHooks::empty());
        TestResults::assemble(plan, &session)
    }

    /// Run one plan node and its descendants, recording into `session`.
    ///
    /// This is the recursive primitive behind [`Self::run_plan`], public
    /// for composability and testing. `hooks` is the scope inherited from
    /// the node's ancestors, excluding the node's own group hooks.
    pub fn run_plan_node<'p>(
        &self,
        session: &mut TestSession,
        node: &'p PlanNode,
        hooks: &LifecycleHooks<'p>,
    ) -> NodeSignal {
        if !session.is_run(node.id()) {
            // A skipped group still propagates Skipped records into every
            // descendant's own record.
            self.record_skipped_subtree(session, node);
            return NodeSignal {
                label: node.label.clone(),
                failed: false,
            };
        }

        match node.kind {
            NodeKind::Group => self.run_group(session, node, hooks),
            NodeKind::Case => self.run_case(session, node, hooks),
            NodeKind::BeforeAll | NodeKind::AfterAll => {
                let failed = self.run_all_hook(session, node);
                NodeSignal {
                    label: node.label.clone(),
                    failed,
                }
            }
            // Each-hooks never carry individual records; invoked directly
            // they still execute and report their signal.
            NodeKind::BeforeEach | NodeKind::AfterEach => {
                let failed = invoke_body(session, node).is_err();
                NodeSignal {
                    label: node.label.clone(),
                    failed,
                }
            }
        }
    }

    fn run_group<'p>(
        &self,
        session: &mut TestSession,
        node: &'p PlanNode,
        inherited: &LifecycleHooks<'p>,
    ) -> NodeSignal {
        let scoped = inherited.layered(node);
        session.context_mut().push(&node.label);

        let any_child_runs = node
            .children
            .iter()
            .any(|c| matches!(c.kind, NodeKind::Group | NodeKind::Case) && session.is_run(c.id()));

        // A group with nothing to run never invokes its own BeforeAll or
        // AfterAll; everything below is recorded Skipped.
        if !any_child_runs {
            for child in &node.children {
                self.record_skipped_subtree(session, child);
            }
            session.context_mut().pop();
            return NodeSignal {
                label: node.label.clone(),
                failed: false,
            };
        }

        let mut failed = false;
        let mut setup_failed = false;
        for hook in scoped.before_all() {
            if setup_failed || !session.is_run(hook.id()) {
                session.record(RecordedResult::skipped(hook));
                continue;
            }
            match invoke_body(session, hook) {
                Ok(()) => session.record(RecordedResult::success(hook)),
                Err(failure) => {
                    session.record(RecordedResult::failed(
                        hook,
                        FailureDetail {
                            kind: FailureKind::BeforeAllFailed,
                            message: failure.message,
                            detail: failure.detail,
                        },
                    ));
                    setup_failed = true;
                    failed = true;
                }
            }
        }

        if setup_failed {
            // Setup never completed: remaining children are recorded
            // Skipped and AfterAll is not attempted.
            for child in &node.children {
                if matches!(child.kind, NodeKind::Group | NodeKind::Case) {
                    self.record_skipped_subtree(session, child);
                }
            }
            for hook in scoped.after_all() {
                session.record(RecordedResult::skipped(hook));
            }
            session.context_mut().pop();
            return NodeSignal {
                label: node.label.clone(),
                failed: true,
            };
        }

        for child in &node.children {
            if matches!(child.kind, NodeKind::Group | NodeKind::Case) {
                let signal = self.run_plan_node(session, child, &scoped);
                failed |= signal.failed;
            }
        }

        for hook in scoped.after_all() {
            if !session.is_run(hook.id()) {
                session.record(RecordedResult::skipped(hook));
                continue;
            }
            match invoke_body(session, hook) {
                Ok(()) => session.record(RecordedResult::success(hook)),
                Err(failure) => {
                    session.record(RecordedResult::failed(
                        hook,
                        FailureDetail {
                            kind: FailureKind::AfterAllFailed,
                            message: failure.message,
                            detail: failure.detail,
                        },
                    ));
                    failed = true;
                }
            }
        }

        session.context_mut().pop();
        NodeSignal {
            label: node.label.clone(),
            failed,
        }
    }

    fn run_case<'p>(
        &self,
        session: &mut TestSession,
        node: &'p PlanNode,
        hooks: &LifecycleHooks<'p>,
    ) -> NodeSignal {
        session.context_mut().push(&node.label);
        let mut first_failure: Option<FailureDetail> = None;

        for hook in hooks.before_each_outermost_first() {
            if !session.is_run(hook.id()) {
                continue;
            }
            if let Err(failure) = invoke_body(session, hook) {
                first_failure = Some(FailureDetail {
                    kind: FailureKind::BeforeEachFailed,
                    message: format!(
                        "before each hook \"{}\" failed: {}",
                        hook.label, failure.message
                    ),
                    detail: failure.detail,
                });
                break;
            }
        }

        if first_failure.is_none() {
            if let Err(failure) = invoke_body(session, node) {
                first_failure = Some(FailureDetail {
                    kind: FailureKind::CaseFailed,
                    message: failure.message,
                    detail: failure.detail,
                });
            }
        }

        // Cleanup-first: every AfterEach in scope still runs after a
        // failure; only the first failure is recorded.
        for hook in hooks.after_each_innermost_first() {
            if !session.is_run(hook.id()) {
                continue;
            }
            if let Err(failure) = invoke_body(session, hook) {
                if first_failure.is_none() {
                    first_failure = Some(FailureDetail {
                        kind: FailureKind::AfterEachFailed,
                        message: format!(
                            "after each hook \"{}\" failed: {}",
                            hook.label, failure.message
                        ),
                        detail: failure.detail,
                    });
                }
            }
        }

        session.context_mut().pop();
        let failed = first_failure.is_some();
        match first_failure {
            Some(error) => session.record(RecordedResult::failed(node, error)),
            None => session.record(RecordedResult::success(node)),
        }
        NodeSignal {
            label: node.label.clone(),
            failed,
        }
    }

    fn run_all_hook(&self, session: &mut TestSession, node: &PlanNode) -> bool {
        let kind = if node.kind == NodeKind::BeforeAll {
            FailureKind::BeforeAllFailed
        } else {
            FailureKind::AfterAllFailed
        };
        match invoke_body(session, node) {
            Ok(()) => {
                session.record(RecordedResult::success(node));
                false
            }
            Err(failure) => {
                session.record(RecordedResult::failed(
                    node,
                    FailureDetail {
                        kind,
                        message: failure.message,
                        detail: failure.detail,
                    },
                ));
                true
            }
        }
    }

    /// Record every Case/BeforeAll/AfterAll in a subtree as Skipped without
    /// executing anything.
    fn record_skipped_subtree(&self, session: &mut TestSession, node: &PlanNode) {
        match node.kind {
            NodeKind::Group => {
                for child in &node.children {
                    self.record_skipped_subtree(session, child);
                }
            }
            NodeKind::Case | NodeKind::BeforeAll | NodeKind::AfterAll => {
                session.record(RecordedResult::skipped(node));
            }
            NodeKind::BeforeEach | NodeKind::AfterEach => {}
        }
    }
}

/// Invoke a node's body, converting a panic into a [`Failure`].
fn invoke_body(session: &mut TestSession, node: &PlanNode) -> Result<(), Failure> {
    let Some(body) = node.body.as_ref() else {
        return Ok(());
    };
    let context = session.context_mut();
    match panic::catch_unwind(AssertUnwindSafe(|| body(context))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(Failure::new(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "body panicked".to_owned()
    }
}
