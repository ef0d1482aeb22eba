use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plan::node::{NodeId, NodeKind, PlanNode, TestPlan};
use crate::runner::session::TestSession;

/// The outcome of one executed (or skipped) plan node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Failure,
    Skipped,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Which part of a node's execution produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The case body itself failed.
    CaseFailed,
    /// A BeforeEach hook wrapping the case failed.
    BeforeEachFailed,
    /// An AfterEach hook wrapping the case failed.
    AfterEachFailed,
    /// A group's BeforeAll hook failed.
    BeforeAllFailed,
    /// A group's AfterAll hook failed.
    AfterAllFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaseFailed => write!(f, "case failed"),
            Self::BeforeEachFailed => write!(f, "before each hook failed"),
            Self::AfterEachFailed => write!(f, "after each hook failed"),
            Self::BeforeAllFailed => write!(f, "before all hook failed"),
            Self::AfterAllFailed => write!(f, "after all hook failed"),
        }
    }
}

/// Failure information attached to a result record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// One recorded outcome, produced exactly once per executed/skipped Case,
/// BeforeAll, or AfterAll node.
#[derive(Debug, Clone)]
pub struct RecordedResult {
    pub node_id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    pub status: TestStatus,
    pub error: Option<FailureDetail>,
}

impl RecordedResult {
    /// Record a successful execution of `node`.
    pub fn success(node: &PlanNode) -> Self {
        Self::with_status(node, TestStatus::Success, None)
    }

    /// Record a failed execution of `node`.
    pub fn failed(node: &PlanNode, error: FailureDetail) -> Self {
        Self::with_status(node, TestStatus::Failure, Some(error))
    }

    /// Record `node` as skipped without executing it.
    pub fn skipped(node: &PlanNode) -> Self {
        Self::with_status(node, TestStatus::Skipped, None)
    }

    fn with_status(node: &PlanNode, status: TestStatus, error: Option<FailureDetail>) -> Self {
        Self {
            node_id: node.id(),
            label: node.label.clone(),
            kind: node.kind,
            status,
            error,
        }
    }
}

/// One node of the assembled result tree.
///
/// Groups carry an aggregate status over their recorded descendants;
/// Case/BeforeAll/AfterAll leaves carry their own record. BeforeEach and
/// AfterEach hooks do not appear; their failures are attributed to the
/// case they wrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultNode {
    pub label: String,
    pub kind: NodeKind,
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureDetail>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResultNode>,
}

/// The complete output of one `run_plan` call: a tree isomorphic to the
/// plan (restricted to recorded kinds) plus summary counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResults {
    pub root: ResultNode,
    pub summary: RunSummary,
}

impl TestResults {
    /// Assemble the result tree from a finished session.
    pub fn assemble(plan: &TestPlan, session: &TestSession) -> Self {
        let index: HashMap<NodeId, &RecordedResult> = session
            .records()
            .iter()
            .map(|r| (r.node_id, r))
            .collect();
        let root = build_node(plan.root(), &index);
        let summary = RunSummary::from_records(session.records());
        Self { root, summary }
    }

    /// All failed leaves, in execution order.
    pub fn failures(&self) -> Vec<&ResultNode> {
        let mut out = Vec::new();
        collect_failures(&self.root, &mut out);
        out
    }
}

fn collect_failures<'r>(node: &'r ResultNode, out: &mut Vec<&'r ResultNode>) {
    if node.kind == NodeKind::Group {
        for child in &node.children {
            collect_failures(child, out);
        }
    } else if node.status == TestStatus::Failure {
        out.push(node);
    }
}

fn build_node(node: &PlanNode, index: &HashMap<NodeId, &RecordedResult>) -> ResultNode {
    if node.kind == NodeKind::Group {
        let children: Vec<ResultNode> = node
            .children
            .iter()
            .filter(|c| !c.kind.is_each_hook())
            .map(|c| build_node(c, index))
            .collect();
        let status = aggregate_status(&children);
        return ResultNode {
            label: node.label.clone(),
            kind: NodeKind::Group,
            status,
            error: None,
            children,
        };
    }

    match index.get(&node.id()) {
        Some(record) => ResultNode {
            label: record.label.clone(),
            kind: record.kind,
            status: record.status,
            error: record.error.clone(),
            children: Vec::new(),
        },
        // Every recorded kind gets a record on every path through the
        // engine; an absent one can only mean the node never ran.
        None => ResultNode {
            label: node.label.clone(),
            kind: node.kind,
            status: TestStatus::Skipped,
            error: None,
            children: Vec::new(),
        },
    }
}

/// Failure if anything below failed, Skipped if everything below was
/// skipped (vacuously true for an empty group), Success otherwise.
fn aggregate_status(children: &[ResultNode]) -> TestStatus {
    if children.iter().any(|c| c.status == TestStatus::Failure) {
        TestStatus::Failure
    } else if children.iter().all(|c| c.status == TestStatus::Skipped) {
        TestStatus::Skipped
    } else {
        TestStatus::Success
    }
}

/// Summary counts over every recorded leaf of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    /// Whether the run had no failures.
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Build a summary from recorded results.
    pub fn from_records(records: &[RecordedResult]) -> Self {
        let mut summary = Self {
            total: records.len(),
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };
        for r in records {
            match r.status {
                TestStatus::Success => summary.succeeded += 1,
                TestStatus::Failure => summary.failed += 1,
                TestStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}
