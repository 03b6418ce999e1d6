//! Defines the default passes available to [PassManager].
use crate::pass_manager::PassResult;
use crate::passes::{
    ChoiceExpander, CostEstimator, DeadProductionEliminator,
    DuplicateProductionFolder, ElementVoider, GenericVoider, Generifier,
    Inliner, LeftRecurser, ListMaker, MetaDataCreator, MetaDataSetter,
    PrefixFolder, ProductionVoider, ReachabilityChecker, ReferenceCounter,
    RootFinder, Simplifier, TerminalOptimizer, TextTester, Tokenizer,
    TransientMarker, TreeExtractor, ValueChecker,
};
use crate::traversal::Named;
use crate::{pass_manager::PassManager, register_alias};

impl PassManager {
    pub fn default_passes() -> PassResult<Self> {
        // Construct the pass manager and register all passes.
        let mut pm = PassManager::default();

        // Classification passes
        pm.register_pass::<TextTester>()?;
        pm.register_pass::<LeftRecurser>()?;
        pm.register_diagnostic::<ReachabilityChecker>()?;
        pm.register_pass::<RootFinder>()?;
        pm.register_pass::<CostEstimator>()?;
        pm.register_pass::<MetaDataCreator>()?;
        pm.register_pass::<ReferenceCounter>()?;
        pm.register_pass::<TransientMarker>()?;

        // Rewriting passes
        pm.register_diagnostic::<GenericVoider>()?;
        pm.register_pass::<Simplifier>()?;
        pm.register_pass::<DeadProductionEliminator>()?;
        pm.register_diagnostic::<ElementVoider>()?;
        pm.register_pass::<DuplicateProductionFolder>()?;
        pm.register_pass::<PrefixFolder>()?;
        pm.register_pass::<Inliner>()?;
        pm.register_pass::<ChoiceExpander>()?;
        pm.register_pass::<ProductionVoider>()?;
        pm.register_pass::<TerminalOptimizer>()?;

        // Value synthesis
        pm.register_pass::<Tokenizer>()?;
        pm.register_diagnostic::<ListMaker>()?;
        pm.register_pass::<Generifier>()?;
        pm.register_diagnostic::<ValueChecker>()?;
        pm.register_pass::<MetaDataSetter>()?;

        // Views
        pm.register_pass::<TreeExtractor>()?;

        register_alias!(
            pm,
            "classify",
            [TextTester, LeftRecurser, ReachabilityChecker]
        );
        register_alias!(
            pm,
            "pre-opt",
            [
                GenericVoider,
                RootFinder,
                Simplifier,
                DeadProductionEliminator,
                ElementVoider,
                DuplicateProductionFolder,
                PrefixFolder,
                Inliner,
                Simplifier, // Inlining exposes nested choices and sequences.
                DeadProductionEliminator,
                PrefixFolder,
                MetaDataCreator,
                ReferenceCounter,
                TransientMarker,
            ]
        );
        register_alias!(
            pm,
            "values",
            [Tokenizer, ListMaker, Generifier, ValueChecker]
        );
        register_alias!(
            pm,
            "post-opt",
            [
                MetaDataCreator,
                ReferenceCounter,
                ChoiceExpander,
                ProductionVoider,
                TerminalOptimizer,
                PrefixFolder,
                DeadProductionEliminator,
                DuplicateProductionFolder,
                ReachabilityChecker,
                MetaDataCreator,
                ReferenceCounter, // Counts changed while folding.
                TransientMarker,
                MetaDataSetter,
            ]
        );
        register_alias!(
            pm,
            "all",
            ["classify", "pre-opt", "values", "post-opt"]
        );
        register_alias!(pm, "tree", [TreeExtractor]);
        register_alias!(pm, "none", []);

        Ok(pm)
    }
}
