//! Flags that switch individual optimizations on and off.
use packrat_utils::{Error, PackratResult};

/// Optimization and output flags consulted by the passes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Inline cheap productions.
    pub optimize_cost: bool,
    /// Fold duplicate productions and inline transient aliases.
    pub optimize_choices1: bool,
    /// Expand the alternatives of wrapper productions in place.
    pub optimize_choices2: bool,
    pub optimize_left_recursions: bool,
    pub optimize_left_iterations: bool,
    /// Desugar one-or-more repetitions of memoized productions.
    pub optimize_repeated: bool,
    pub optimize_optional: bool,
    /// Remove dead productions.
    pub optimize_grammar: bool,
    pub optimize_prefixes: bool,
    pub optimize_terminals: bool,
    /// Mark productions referenced at most once as transient.
    pub optimize_non_transient: bool,
    pub option_variant: bool,
    /// Report what the passes do at info level.
    pub option_verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            optimize_cost: true,
            optimize_choices1: true,
            optimize_choices2: true,
            optimize_left_recursions: true,
            optimize_left_iterations: true,
            optimize_repeated: true,
            optimize_optional: true,
            optimize_grammar: true,
            optimize_prefixes: true,
            optimize_terminals: true,
            optimize_non_transient: true,
            option_variant: false,
            option_verbose: false,
        }
    }
}

impl Config {
    /// Flag names as accepted on the command line.
    pub const FLAGS: [&'static str; 13] = [
        "optimizeCost",
        "optimizeChoices1",
        "optimizeChoices2",
        "optimizeLeftRecursions",
        "optimizeLeftIterations",
        "optimizeRepeated",
        "optimizeOptional",
        "optimizeGrammar",
        "optimizePrefixes",
        "optimizeTerminals",
        "optimizeNonTransient",
        "optionVariant",
        "optionVerbose",
    ];

    fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
        Some(match name {
            "optimizeCost" => &mut self.optimize_cost,
            "optimizeChoices1" => &mut self.optimize_choices1,
            "optimizeChoices2" => &mut self.optimize_choices2,
            "optimizeLeftRecursions" => &mut self.optimize_left_recursions,
            "optimizeLeftIterations" => &mut self.optimize_left_iterations,
            "optimizeRepeated" => &mut self.optimize_repeated,
            "optimizeOptional" => &mut self.optimize_optional,
            "optimizeGrammar" => &mut self.optimize_grammar,
            "optimizePrefixes" => &mut self.optimize_prefixes,
            "optimizeTerminals" => &mut self.optimize_terminals,
            "optimizeNonTransient" => &mut self.optimize_non_transient,
            "optionVariant" => &mut self.option_variant,
            "optionVerbose" => &mut self.option_verbose,
            _ => return None,
        })
    }

    /// Set the flag called `name`.
    pub fn set(&mut self, name: &str, value: bool) -> PackratResult<()> {
        match self.flag_mut(name) {
            Some(flag) => {
                *flag = value;
                Ok(())
            }
            None => Err(Error::misc(format!(
                "Unknown flag `{name}'. Known flags: {}",
                Self::FLAGS.join(", ")
            ))),
        }
    }

    /// Parse and apply a `name=bool` assignment. A bare name sets the flag.
    pub fn apply(&mut self, assignment: &str) -> PackratResult<()> {
        let (name, value) = match assignment.split_once('=') {
            Some((name, value)) => {
                let value = value.parse::<bool>().map_err(|_| {
                    Error::misc(format!(
                        "Flag `{name}' expects true or false, found `{value}'"
                    ))
                })?;
                (name, value)
            }
            None => (assignment, true),
        };
        self.set(name, value)
    }

    pub fn verbose(&self) -> bool {
        self.option_verbose
    }
}
