/// Default limit on nested `eval` invocations.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Per-engine settings handed to every session the engine opens.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum nesting of `eval` before a run fails with `RecursionLimit`.
    pub max_depth: usize,
    /// Name attached to log events of sessions, typically the script path.
    pub label: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            label: None,
        }
    }
}

impl EngineConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
