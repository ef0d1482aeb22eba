use std::fmt;

/// The failure signal raised by a case or hook body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Human-readable failure description.
    pub message: String,
    /// Optional longer detail (e.g. a diff or captured output).
    pub detail: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Failure {}

/// Execution-context handle passed to every case and hook body.
///
/// Exposes the label path from the plan root to the node currently
/// executing. Hook bodies see the path of the case (or group) they are
/// wrapping, not their own label.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    path: Vec<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels from the root group down to the current node.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The innermost label on the path, if any.
    pub fn current_label(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    /// The full path joined for display, e.g. `root / math / adds`.
    pub fn full_name(&self) -> String {
        self.path.join(" / ")
    }

    pub(crate) fn push(&mut self, label: &str) {
        self.path.push(label.to_owned());
    }

    pub(crate) fn pop(&mut self) {
        self.path.pop();
    }
}
