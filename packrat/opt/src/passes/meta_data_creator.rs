use crate::traversal::{Action, Named, VisResult, Visitor};
use packrat_ir::{self as ir, Analyzer, MetaData};

/// Attaches an empty [MetaData] record to every production lacking one.
#[derive(Default)]
pub struct MetaDataCreator;

impl Named for MetaDataCreator {
    fn name() -> &'static str {
        "meta-data-creator"
    }

    fn description() -> &'static str {
        "attach empty meta-data to every production"
    }
}

impl Visitor for MetaDataCreator {
    fn start(
        &mut self,
        module: &mut ir::Module,
        _analyzer: &mut Analyzer,
    ) -> VisResult {
        for prod in &module.productions {
            prod.borrow_mut()
                .props
                .meta_data
                .get_or_insert_with(MetaData::default);
        }
        Ok(Action::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::testing::*;
    use packrat_ir::Type;

    #[test]
    fn keeps_existing_records() {
        let mut ctx = context(vec![
            prod("A", Type::Void, vec![vec![lit('a')]]),
            prod("B", Type::Void, vec![vec![lit('b')]]),
        ]);
        get(&ctx, "B").borrow_mut().props.meta_data = Some(MetaData {
            usage_count: 3,
            ..Default::default()
        });
        run::<MetaDataCreator>(&mut ctx);
        let a = get(&ctx, "A");
        assert_eq!(a.borrow().props.meta_data.as_ref().unwrap().usage_count, 0);
        let b = get(&ctx, "B");
        assert_eq!(b.borrow().props.meta_data.as_ref().unwrap().usage_count, 3);
    }
}
