use crate::{Config, Grammar, NeverTransformable, TransformOracle};
use std::rc::Rc;

/// Per-pass options given on the command line as `-x pass:opt=val`.
pub type ExtraOpts = Vec<String>;

/// Everything a pass may read or rewrite.
pub struct Context {
    pub grammar: Grammar,
    pub config: Config,
    /// Options for individual passes, written `pass:opt=val`.
    pub extra_opts: ExtraOpts,
    /// Decides which directly left-recursive productions are rewritten
    /// into iterations.
    pub oracle: Rc<dyn TransformOracle>,
}

impl Context {
    pub fn new(grammar: Grammar, config: Config) -> Self {
        Context {
            grammar,
            config,
            extra_opts: ExtraOpts::new(),
            oracle: Rc::new(NeverTransformable),
        }
    }

    pub fn with_oracle(mut self, oracle: Rc<dyn TransformOracle>) -> Self {
        self.oracle = oracle;
        self
    }
}
