//! Serialized form of grammars as produced by a grammar front-end.
use atty::Stream;
use packrat_utils::{Error, PackratResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A complete grammar.
#[derive(Debug, Serialize, Deserialize)]
pub struct GrammarDef {
    pub modules: Vec<ModuleDef>,
}

impl GrammarDef {
    /// Read a grammar from a file or the input stream. If no file is
    /// provided, the input stream must not be a TTY.
    pub fn construct(file: &Option<PathBuf>) -> PackratResult<Self> {
        match file {
            Some(path) => {
                let f = std::fs::File::open(path).map_err(|e| {
                    Error::invalid_file(format!(
                        "Failed to read {}: {e}",
                        path.to_string_lossy()
                    ))
                })?;
                Ok(serde_json::from_reader(std::io::BufReader::new(f))?)
            }
            None => {
                if atty::isnt(Stream::Stdin) {
                    Ok(serde_json::from_reader(std::io::stdin())?)
                } else {
                    Err(Error::invalid_file(
                        "No file provided and terminal not a TTY".to_string(),
                    ))
                }
            }
        }
    }

    pub fn construct_from_str(inp: &str) -> PackratResult<Self> {
        Ok(serde_json::from_str(inp)?)
    }
}

/// How a module depends on another module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKindDef {
    Import,
    Instantiate,
    Modify,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyDef {
    pub kind: DependencyKindDef,
    pub module: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyDef>,
    #[serde(default)]
    pub header: Option<ActionDef>,
    #[serde(default)]
    pub body: Option<ActionDef>,
    #[serde(default)]
    pub footer: Option<ActionDef>,
    pub productions: Vec<ProductionDef>,
}

/// The ways a production can be defined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionKindDef {
    #[default]
    Full,
    Addition,
    Removal,
    Override,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductionDef {
    pub name: String,
    #[serde(default)]
    pub qualified_name: Option<String>,
    /// The declared type, written as in the host language.
    #[serde(rename = "type", default = "void")]
    pub ty: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub kind: ProductionKindDef,
    /// The alternative an addition is placed next to.
    #[serde(default)]
    pub sequence: Option<String>,
    /// Whether an addition goes before `sequence`.
    #[serde(default)]
    pub before: bool,
    /// The alternatives a removal drops.
    #[serde(default)]
    pub sequences: Vec<String>,
    /// Whether an override replaces the whole production.
    #[serde(default = "complete")]
    pub complete: bool,
    pub alternatives: Vec<AlternativeDef>,
    #[serde(default)]
    pub pos: Option<PosDef>,
}

fn complete() -> bool {
    true
}

fn void() -> String {
    "void".to_string()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PosDef {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlternativeDef {
    #[serde(default)]
    pub name: Option<String>,
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub pos: Option<PosDef>,
}

/// Action code, either as text or as lines with indentation levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionDef {
    Text(String),
    Lines { code: Vec<String>, indent: Vec<usize> },
}

/// Grammar expressions.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementDef {
    /// A reference to a production.
    Nt(String),
    Choice(Vec<AlternativeDef>),
    Seq(Vec<ElementDef>),
    Star(Box<ElementDef>),
    Plus(Box<ElementDef>),
    Opt(Box<ElementDef>),
    And(Box<ElementDef>),
    Not(Box<ElementDef>),
    /// A semantic predicate.
    Pred(ActionDef),
    Bind {
        name: String,
        element: Box<ElementDef>,
    },
    Match {
        text: String,
        element: Box<ElementDef>,
    },
    Void(Box<ElementDef>),
    Any,
    Char(char),
    /// A character class in bracket notation without the brackets.
    Class {
        spec: String,
        #[serde(default)]
        exclusive: bool,
    },
    String(String),
    Action(ActionDef),
    ParserAction(ActionDef),
    Null,
    NodeMarker(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grammar() {
        let grammar = GrammarDef::construct_from_str(
            r#"{ "modules": [ { "name": "Calc", "productions": [
                { "name": "Digit", "type": "String", "attributes": ["public"],
                  "alternatives": [
                    { "elements": [ { "class": { "spec": "0-9" } } ] },
                    { "name": "Zero", "elements": [ { "char": "0" }, "any" ] }
                  ] },
                { "name": "Spacing", "kind": "override",
                  "alternatives": [ { "elements": [ { "star": { "char": " " } } ] } ] }
            ] } ] }"#,
        )
        .unwrap();
        let module = &grammar.modules[0];
        assert_eq!(module.productions.len(), 2);
        assert_eq!(module.productions[0].kind, ProductionKindDef::Full);
        assert_eq!(module.productions[1].kind, ProductionKindDef::Override);
        assert!(module.productions[1].complete);
        assert_eq!(module.productions[1].ty, "void");
        assert!(matches!(
            module.productions[0].alternatives[1].elements[1],
            ElementDef::Any
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(GrammarDef::construct_from_str("{ \"modules\": 3 }").is_err());
    }
}
