//! Driver for the packrat optimizer.
use crate::cmdline::Opts;
use packrat_ir::{self as ir, ast};
use packrat_opt::pass_manager::{PassManager, PassResult};
use packrat_utils::{Error, GlobalPositionTable};
use std::io::Write;

/// Run the optimizer from the command line.
pub fn run_optimizer() -> PassResult<()> {
    // parse the command line arguments into Opts struct
    let mut opts = Opts::get_opts();

    // enable tracing
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let pm = PassManager::default_passes()?;

    // list all the avaliable pass options when flag --list-passes is enabled
    if opts.list_passes {
        println!("{}", pm.complete_help());
        return Ok(());
    }
    if let Some(pass) = &opts.describe {
        let help = pm.specific_help(pass).ok_or_else(|| {
            Error::misc(format!("Unknown pass or alias: {pass}"))
        })?;
        println!("{help}");
        return Ok(());
    }

    let name = opts
        .file
        .as_ref()
        .map_or("<stdin>".to_string(), |p| p.to_string_lossy().to_string());
    let file = GlobalPositionTable::add_file(name);
    let def = ast::GrammarDef::construct(&opts.file)?;
    let grammar = ir::from_ast::ast_to_ir(def, file)?;
    log::info!(
        "Loaded {} module(s) with {} production(s)",
        grammar.modules.len(),
        grammar
            .modules
            .iter()
            .map(|m| m.productions.len())
            .sum::<usize>()
    );

    let mut ctx = ir::Context::new(grammar, opts.config()?);
    // Extra options for the passes
    ctx.extra_opts = opts.extra_opts.drain(..).collect();

    // Run all passes specified by the command line
    pm.execute_plan(
        &mut ctx,
        &opts.pass,
        &opts.disable_pass,
        &opts.insertions,
        opts.dump_ir,
    )?;

    // Print out the grammar after transformation.
    log::info!("Writing grammar to {}", opts.output.as_path_string());
    let out = &mut opts.output.get_write().map_err(Error::from)?;
    ir::Printer::write_grammar(&ctx.grammar, out).map_err(Error::from)?;
    out.flush().map_err(Error::from)?;
    Ok(())
}
