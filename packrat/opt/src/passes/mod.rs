//! Passes of the grammar optimizer.

/// Report what a pass does: at info level when the grammar is processed
/// verbosely, at debug level otherwise.
macro_rules! trace {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            log::info!($($arg)+)
        } else {
            log::debug!($($arg)+)
        }
    };
}

mod choice_expander;
mod cost_estimator;
mod dead_production_eliminator;
mod duplicate_production_folder;
mod element_voider;
mod generic_voider;
mod generifier;
mod inliner;
mod left_recurser;
mod list_maker;
mod meta_data_creator;
mod meta_data_setter;
mod prefix_folder;
mod production_voider;
mod reachability_checker;
mod reference_counter;
mod root_finder;
mod simplifier;
mod terminal_optimizer;
mod text_tester;
mod tokenizer;
mod transient_marker;
mod tree_extractor;
mod value_checker;

#[cfg(test)]
mod testing;

pub use choice_expander::ChoiceExpander;
pub use cost_estimator::CostEstimator;
pub use dead_production_eliminator::DeadProductionEliminator;
pub use duplicate_production_folder::DuplicateProductionFolder;
pub use element_voider::ElementVoider;
pub use generic_voider::GenericVoider;
pub use generifier::{Generifier, is_generic, is_generic_node};
pub use inliner::Inliner;
pub use left_recurser::LeftRecurser;
pub use list_maker::ListMaker;
pub use meta_data_creator::MetaDataCreator;
pub use meta_data_setter::MetaDataSetter;
pub use prefix_folder::PrefixFolder;
pub use production_voider::ProductionVoider;
pub use reachability_checker::ReachabilityChecker;
pub use reference_counter::ReferenceCounter;
pub use root_finder::RootFinder;
pub use simplifier::Simplifier;
pub use terminal_optimizer::TerminalOptimizer;
pub use text_tester::TextTester;
pub use tokenizer::Tokenizer;
pub use transient_marker::TransientMarker;
pub use tree_extractor::TreeExtractor;
pub use value_checker::ValueChecker;
