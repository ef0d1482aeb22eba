use crate::plan::node::NodeId;
use crate::plan::resolve::Resolution;
use crate::runner::context::RunContext;
use crate::runner::result::RecordedResult;

/// Mutable state for one full run of a plan.
///
/// Created at the start of `run_plan`, exclusively owned and mutated by the
/// engine for the call's duration, and consumed into the assembled results.
/// Records are kept in insertion order, which is execution order.
#[derive(Debug)]
pub struct TestSession {
    resolution: Resolution,
    context: RunContext,
    records: Vec<RecordedResult>,
}

impl TestSession {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            context: RunContext::new(),
            records: Vec::new(),
        }
    }

    /// The focus/skip resolution computed for this run.
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Whether any node in the plan carries a focus modifier.
    pub fn has_focused_nodes(&self) -> bool {
        self.resolution.has_focused_nodes()
    }

    /// Whether `id` resolved to Run.
    pub fn is_run(&self, id: NodeId) -> bool {
        self.resolution.is_run(id)
    }

    /// The execution-context handle threaded into bodies.
    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.context
    }

    /// Append a result record. Each Case/BeforeAll/AfterAll node is
    /// recorded exactly once per run.
    pub fn record(&mut self, record: RecordedResult) {
        debug_assert!(
            self.find(record.node_id).is_none(),
            "node {:?} recorded twice",
            record.node_id
        );
        self.records.push(record);
    }

    /// All records so far, in execution order.
    pub fn records(&self) -> &[RecordedResult] {
        &self.records
    }

    /// Look up the record for a node, if one exists yet.
    pub fn find(&self, id: NodeId) -> Option<&RecordedResult> {
        self.records.iter().find(|r| r.node_id == id)
    }
}
