//! Implements a visitor for grammar modules.
//! Passes implemented as a Visitor are directly invoked on an
//! [`ir::Context`] to process every [`ir::Module`] of its grammar.
use super::action::{Action, VisResult};
use super::{ConstructVisitor, Named};
use packrat_ir::{self as ir, RRC};
use packrat_utils::PackratResult;
use std::rc::Rc;

/// The visiting interface for a grammar.
/// Contains three kinds of functions:
/// 1. start: Called before the productions of a module are visited.
/// 2. production: Called on every full production, in module order.
/// 3. finish: Called after the productions of a module were visited.
///
/// Passes that work on the module as a whole (fixed points over all
/// productions, adding or removing productions) do their work in
/// [Visitor::start] and return [Action::Stop].
pub trait Visitor {
    /// Precondition for this pass to run on the grammar. If this function
    /// returns None, the pass triggers. Otherwise it aborts and logs the
    /// string as the reason.
    fn precondition(_ctx: &ir::Context) -> Option<String>
    where
        Self: Sized,
    {
        None
    }

    /// Define the traversal over a module.
    /// Calls [Visitor::start], visits each full production, and finally
    /// calls [Visitor::finish]. The analyzer is indexed over the module
    /// once and shared by all three.
    fn traverse_module(&mut self, module: &mut ir::Module) -> PackratResult<()>
    where
        Self: Sized,
    {
        let mut analyzer = ir::Analyzer::new(module);
        self.start(module, &mut analyzer)?
            .and_then(|| {
                // The handles are cloned so that the visit may borrow the
                // module.
                let prods: Vec<RRC<ir::Production>> =
                    module.productions.iter().map(Rc::clone).collect();
                for prod in prods {
                    if !prod.borrow().is_full() {
                        continue;
                    }
                    analyzer.process(&prod.borrow());
                    let action = self
                        .production(&prod, module, &mut analyzer)?
                        .apply_change(&mut prod.borrow_mut().choice);
                    if let Action::Stop = action {
                        return Ok(Action::Stop);
                    }
                }
                Ok(Action::Continue)
            })?
            .pop()
            .and_then(|| self.finish(module, &mut analyzer))?;
        Ok(())
    }

    /// Run the visitor on a given [`ir::Context`].
    ///
    /// After visiting a module, it calls [ConstructVisitor::clear_data] to
    /// reset the struct.
    fn do_pass(&mut self, context: &mut ir::Context) -> PackratResult<()>
    where
        Self: Sized + ConstructVisitor + Named,
    {
        if let Some(msg) = Self::precondition(&*context) {
            log::info!("Skipping `{}': {msg}", Self::name());
            return Ok(());
        }

        // Temporarily take ownership of the modules from the context.
        let mut modules = std::mem::take(&mut context.grammar.modules);
        let res = modules.iter_mut().try_for_each(|module| {
            self.traverse_module(module)?;
            self.clear_data();
            Ok(())
        });
        context.grammar.modules = modules;
        res
    }

    /// Build a [Default] implementation of this pass and call [Visitor::do_pass]
    /// using it.
    #[inline(always)]
    fn do_pass_default(context: &mut ir::Context) -> PackratResult<Self>
    where
        Self: ConstructVisitor + Sized + Named,
    {
        let mut visitor = Self::from(&*context)?;
        visitor.do_pass(context)?;
        Ok(visitor)
    }

    /// Executed before the productions are visited.
    fn start(
        &mut self,
        _module: &mut ir::Module,
        _analyzer: &mut ir::Analyzer,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed on every full production. The analyzer has already been
    /// told to [process](ir::Analyzer::process) it. Returning
    /// [Action::Change] replaces the production's choice.
    fn production(
        &mut self,
        _prod: &RRC<ir::Production>,
        _module: &ir::Module,
        _analyzer: &mut ir::Analyzer,
    ) -> VisResult {
        Ok(Action::Continue)
    }

    /// Executed after the productions were visited, unless the traversal
    /// was stopped.
    fn finish(
        &mut self,
        _module: &mut ir::Module,
        _analyzer: &mut ir::Analyzer,
    ) -> VisResult {
        Ok(Action::Continue)
    }
}
