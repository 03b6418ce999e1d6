//! Implements a formatter for the in-memory representation of grammars.
//! Printing does not mutate the grammar.
use crate::{self as ir, Element, ProductionKind};
use itertools::Itertools;
use std::io;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    /// Format attributes as a space separated prefix. Returns the empty
    /// string if there are none.
    fn format_attributes(attrs: &ir::Attributes) -> String {
        attrs.iter().map(|a| format!("{a} ")).collect()
    }

    /// The properties derived by the passes, as a comment.
    fn format_props(props: &ir::Props) -> Option<String> {
        let mut notes = Vec::new();
        if props.text_only {
            notes.push("text-only".to_string());
        }
        if props.token {
            notes.push("token".to_string());
        } else if props.lexical {
            notes.push("lexical".to_string());
        }
        match props.generic {
            Some(ir::GenericKind::Node) => notes.push("generic".to_string()),
            Some(ir::GenericKind::Recursion) => {
                notes.push("generic recursion".to_string())
            }
            None => (),
        }
        if props.voided {
            notes.push("voided".to_string());
        }
        if props.recursive {
            notes.push("left-recursive".to_string());
        }
        if props.option {
            notes.push("option".to_string());
        }
        if let Some(cost) = props.cost {
            notes.push(format!("cost {cost}"));
        }
        if let Some(meta) = &props.meta_data {
            notes.push(format!("uses {}/{}", meta.usage_count, meta.self_count));
        }
        if let Some(dups) = &props.duplicates {
            notes.push(format!("folds {}", dups.iter().join(", ")));
        }
        if notes.is_empty() {
            None
        } else {
            Some(format!("// {}", notes.join(", ")))
        }
    }

    /// Prints out the grammar.
    pub fn write_grammar<F: io::Write>(
        grammar: &ir::Grammar,
        f: &mut F,
    ) -> io::Result<()> {
        for (i, module) in grammar.modules.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            Self::write_module(module, f)?;
        }
        Ok(())
    }

    /// Formats and writes the module to the formatter.
    pub fn write_module<F: io::Write>(
        module: &ir::Module,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "module {};", module.name)?;
        for dep in &module.dependencies {
            let kind = match dep.kind {
                ir::DependencyKind::Import => "import",
                ir::DependencyKind::Instantiation => "instantiate",
                ir::DependencyKind::Modification => "modify",
            };
            write!(f, "{kind} {}", dep.module)?;
            if !dep.arguments.is_empty() {
                write!(f, "({})", dep.arguments.iter().join(", "))?;
            }
            if let Some(target) = dep.target {
                write!(f, " as {target}")?;
            }
            writeln!(f, ";")?;
        }
        for (kind, action) in [
            ("header", &module.header),
            ("body", &module.body),
            ("footer", &module.footer),
        ] {
            if let Some(action) = action {
                writeln!(f, "{kind} {action}")?;
            }
        }
        if !module.attributes.is_empty() {
            writeln!(
                f,
                "option {};",
                module.attributes.iter().map(|a| a.to_string()).join(", ")
            )?;
        }
        if let Some(root) = module.root {
            writeln!(f, "// root: {root}")?;
        }
        for prod in &module.productions {
            writeln!(f)?;
            Self::write_production(&prod.borrow(), f)?;
        }
        Ok(())
    }

    /// Formats and writes one production.
    pub fn write_production<F: io::Write>(
        prod: &ir::Production,
        f: &mut F,
    ) -> io::Result<()> {
        if let Some(props) = Self::format_props(&prod.props) {
            writeln!(f, "{props}")?;
        }
        let op = match &prod.kind {
            ProductionKind::Full => "=".to_string(),
            ProductionKind::AlternativeAddition { sequence, before } => {
                if *before {
                    format!("+= <{sequence}> ... /")
                } else {
                    format!("+= ... / <{sequence}>")
                }
            }
            ProductionKind::AlternativeRemoval { sequences } => format!(
                "-= {}",
                sequences.iter().map(|s| format!("<{s}>")).join(", ")
            ),
            ProductionKind::Override { complete: true } => ":=".to_string(),
            ProductionKind::Override { complete: false } => ":= ...".to_string(),
        };
        writeln!(
            f,
            "{}{} {} {op}",
            Self::format_attributes(&prod.attributes),
            prod.ty,
            prod.qualified_name()
        )?;
        for (i, alt) in prod.choice.alternatives.iter().enumerate() {
            let sep = if i == 0 { "  " } else { "/ " };
            write!(f, "  {sep}")?;
            if let Some(name) = alt.name {
                write!(f, "<{name}> ")?;
            }
            writeln!(f, "{}", Self::format_elements(&alt.elements))?;
        }
        writeln!(f, "  ;")
    }

    /// The elements of an alternative, separated by spaces.
    pub fn format_elements(elements: &[Element]) -> String {
        if elements.is_empty() {
            "/* empty */".to_string()
        } else {
            elements.iter().map(|e| e.to_string()).join(" ")
        }
    }
}
