use crate::traversal::{Action, ConstructVisitor, Named, VisResult, Visitor};
use packrat_ir::{self as ir, Analyzer, Attribute, RRC};
use packrat_utils::PackratResult;

/// Marks productions that are referenced at most once as transient, since
/// memoizing their results cannot pay off. Requires up-to-date reference
/// counts.
pub struct TransientMarker {
    verbose: bool,
}

impl ConstructVisitor for TransientMarker {
    fn from(ctx: &ir::Context) -> PackratResult<Self> {
        Ok(TransientMarker {
            verbose: ctx.config.verbose(),
        })
    }

    fn clear_data(&mut self) {}
}

impl Named for TransientMarker {
    fn name() -> &'static str {
        "transient-marker"
    }

    fn description() -> &'static str {
        "mark productions referenced at most once as transient"
    }
}

impl Visitor for TransientMarker {
    fn precondition(ctx: &ir::Context) -> Option<String> {
        if ctx.config.optimize_non_transient {
            None
        } else {
            Some("optimizeNonTransient is disabled".to_string())
        }
    }

    fn production(
        &mut self,
        prod: &RRC<ir::Production>,
        _module: &ir::Module,
        _analyzer: &mut Analyzer,
    ) -> VisResult {
        let mut p = prod.borrow_mut();
        let Some(usage) = p.props.meta_data.as_ref().map(|md| md.usage_count)
        else {
            return Ok(Action::Continue);
        };
        if usage <= 1
            && !p.has_attribute(Attribute::Transient)
            && !p.has_attribute(Attribute::Inline)
            && !p.has_attribute(Attribute::Memoized)
        {
            trace!(self.verbose, "[Marking {} as transient]", p.qualified_name());
            p.attributes.insert(Attribute::Transient);
        }
        Ok(Action::Continue)
    }
}
