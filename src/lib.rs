//! Behavior-driven test execution engine.
//!
//! A test run starts from a declaratively built [`plan::node::TestPlan`]: a
//! tree of groups, cases, and lifecycle hooks. The engine resolves focus and
//! skip modifiers over the whole tree, walks it depth-first executing cases
//! wrapped in their inherited hooks, and returns a structured
//! [`runner::result::TestResults`] tree for reporting.

pub mod plan;
pub mod runner;
