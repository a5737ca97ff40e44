use std::sync::Arc;

use tracing::debug;

use crate::{
    config::EngineConfig,
    diagnostics::Result,
    node::Node,
    parser,
    signaler::{Signaler, SlotRegistry},
};

/// Shareable entry point: the native slot registry plus configuration.
///
/// An engine is `Send + Sync` and can be used from many threads at once.
/// Each run gets its own [`Signaler`], so slots a program defines never leak
/// into another run.
#[derive(Debug, Clone)]
pub struct Engine {
    natives: Arc<SlotRegistry>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_registry(SlotRegistry::with_builtins())
    }

    pub fn with_registry(registry: SlotRegistry) -> Self {
        Self {
            natives: Arc::new(registry),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.natives
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A fresh run: no user slots, empty resource stacks.
    pub fn session(&self) -> Signaler {
        Signaler::new(Arc::clone(&self.natives), self.config.clone())
    }

    /// Evaluates `root` in a fresh session.
    pub fn run(&self, root: &Node) -> Result<()> {
        self.session().signal("eval", root)
    }

    /// Parses `source` and evaluates it in a fresh session, returning the
    /// root of the evaluated tree.
    pub fn eval_source(&self, source: &str) -> Result<Node> {
        let root = parser::parse(source)?;
        debug!(nodes = root.child_count(), "program parsed");
        self.run(&root)?;
        Ok(root)
    }
}
