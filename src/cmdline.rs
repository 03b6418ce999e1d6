//! Command line parsing for the packrat optimizer.
use argh::FromArgs;
use packrat_ir::Config;
use packrat_utils::{OutputFile, PackratResult};
use std::path::PathBuf;

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help"))]
/// Analyze and optimize packrat parser grammars
pub struct Opts {
    /// input grammar in its JSON form; read from stdin if absent
    #[argh(positional)]
    pub file: Option<PathBuf>,

    /// output file, default is stdout
    #[argh(
        option,
        short = 'o',
        long = "output",
        default = "OutputFile::Stdout"
    )]
    pub output: OutputFile,

    /// execute this pass or alias. Overrides the default `all`
    #[argh(option, short = 'p', long = "pass")]
    pub pass: Vec<String>,

    /// disable pass during execution
    #[argh(option, short = 'd', long = "disable-pass")]
    pub disable_pass: Vec<String>,

    /// reorder passes: `-i before:after` runs `after` right behind the
    /// first occurrence of `before`
    #[argh(option, short = 'i', long = "insert")]
    pub insertions: Vec<String>,

    /// extra options passed to individual passes, written `pass:opt[=val]`
    #[argh(option, short = 'x', long = "extra-opt")]
    pub extra_opts: Vec<String>,

    /// set an optimization flag, written `name[=true|false]`
    #[argh(option, short = 'f', long = "flag")]
    pub flags: Vec<String>,

    /// list all the available passes with their descriptions
    #[argh(switch, long = "list-passes")]
    pub list_passes: bool,

    /// describe a single pass or alias
    #[argh(option, long = "describe")]
    pub describe: Option<String>,

    /// print the grammar after every pass
    #[argh(switch, long = "dump-ir")]
    pub dump_ir: bool,

    /// logging level
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

impl Opts {
    /// Parse the command line, falling back to the `all` plan.
    pub fn get_opts() -> Self {
        let mut opts: Opts = argh::from_env();
        if opts.pass.is_empty() {
            opts.pass = vec!["all".to_string()];
        }
        opts
    }

    /// The default configuration updated with the `-f` flags.
    pub fn config(&self) -> PackratResult<Config> {
        let mut config = Config::default();
        for flag in &self.flags {
            config.apply(flag)?;
        }
        Ok(config)
    }
}
