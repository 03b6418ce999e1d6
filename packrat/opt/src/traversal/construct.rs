use super::Visitor;
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use packrat_ir as ir;
use packrat_utils::{Error, PackratResult};

#[derive(Clone, Debug)]
/// The value returned from parsing an option.
pub enum ParseVal {
    /// A boolean option.
    Bool(bool),
    /// A number option.
    Num(i64),
}

impl ParseVal {
    pub fn bool(&self) -> PackratResult<bool> {
        match self {
            ParseVal::Bool(b) => Ok(*b),
            _ => Err(Error::misc(format!("Expected bool, got {self}"))),
        }
    }

    pub fn num(&self) -> PackratResult<i64> {
        match self {
            ParseVal::Num(n) => Ok(*n),
            _ => Err(Error::misc(format!("Expected number, got {self}"))),
        }
    }

    /// The number, which must not be negative.
    pub fn pos_num(&self) -> PackratResult<u64> {
        let n = self.num()?;
        u64::try_from(n).map_err(|_| {
            Error::misc(format!("Expected non-negative number, got {n}"))
        })
    }
}

impl std::fmt::Display for ParseVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseVal::Bool(b) => write!(f, "{b}"),
            ParseVal::Num(n) => write!(f, "{n}"),
        }
    }
}

/// Option that can be passed to a pass.
pub struct PassOpt {
    name: &'static str,
    description: &'static str,
    default: ParseVal,
    parse: fn(&str) -> Option<ParseVal>,
}

impl PassOpt {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        default: ParseVal,
        parse: fn(&str) -> Option<ParseVal>,
    ) -> Self {
        Self {
            name,
            description,
            default,
            parse,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn description(&self) -> &'static str {
        self.description
    }

    pub const fn default(&self) -> &ParseVal {
        &self.default
    }

    fn parse(&self, s: &str) -> Option<ParseVal> {
        (self.parse)(s)
    }

    pub fn parse_bool(s: &str) -> Option<ParseVal> {
        match s {
            "true" => Some(ParseVal::Bool(true)),
            "false" => Some(ParseVal::Bool(false)),
            _ => None,
        }
    }

    /// Parse a number from a string.
    pub fn parse_num(s: &str) -> Option<ParseVal> {
        s.parse::<i64>().ok().map(ParseVal::Num)
    }
}

/// Trait that describes named things. Calling [`do_pass`](Visitor::do_pass) and [`do_pass_default`](Visitor::do_pass_default).
/// require this to be implemented.
///
/// This has to be a separate trait from [`Visitor`] because these methods don't recieve `self` which
/// means that it is impossible to create dynamic trait objects.
pub trait Named {
    /// The name of a pass. Is used for identifying passes.
    fn name() -> &'static str;
    /// A short description of the pass.
    fn description() -> &'static str;
    /// Set of options that can be passed to the pass.
    fn opts() -> Vec<PassOpt> {
        vec![]
    }
}

/// Trait defining method that can be used to construct a Visitor from an
/// [ir::Context].
/// This is useful when a pass needs to read the configuration *before*
/// visiting the modules.
///
/// For passes that don't need to use the context, this trait can be automatically
/// be derived from [Default].
pub trait ConstructVisitor {
    fn get_opts(
        ctx: &ir::Context,
    ) -> PackratResult<LinkedHashMap<&'static str, ParseVal>>
    where
        Self: Named,
    {
        let opts = Self::opts();
        let n = Self::name();
        let mut values: LinkedHashMap<&'static str, ParseVal> =
            LinkedHashMap::new();
        for opt in &ctx.extra_opts {
            // The format is either -x pass:opt or -x pass:opt=val
            let Some((pass, rest)) = opt.split_once(':') else {
                continue;
            };
            if pass != n {
                continue;
            }
            let (opt, val) = match rest.split_once('=') {
                Some((opt, val)) => (opt, val),
                None => (rest, "true"),
            };
            let Some(opt) = opts.iter().find(|o| o.name == opt) else {
                log::warn!("Ignoring unknown option for pass `{n}`: {opt}");
                continue;
            };
            let Some(v) = opt.parse(val) else {
                return Err(Error::misc(format!(
                    "Invalid value for option `{n}:{}`: {val}",
                    opt.name(),
                )));
            };
            values.insert(opt.name(), v);
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Extra options for {}: {}",
                Self::name(),
                values.iter().map(|(o, v)| format!("{o}->{v}")).join(", ")
            );
        }

        // For all options that were not provided with values, fill in the defaults.
        for opt in opts {
            if !values.contains_key(opt.name()) {
                values.insert(opt.name(), opt.default.clone());
            }
        }

        Ok(values)
    }

    /// Construct the visitor using information from the Context
    fn from(_ctx: &ir::Context) -> PackratResult<Self>
    where
        Self: Sized;

    /// Clear the data stored in the visitor. Called before traversing the
    /// next module by [Visitor::do_pass].
    fn clear_data(&mut self);
}

/// Derive ConstructVisitor when [Default] is provided for a visitor.
impl<T: Default + Sized + Visitor> ConstructVisitor for T {
    fn from(_ctx: &ir::Context) -> PackratResult<Self> {
        Ok(T::default())
    }

    fn clear_data(&mut self) {
        *self = T::default();
    }
}
