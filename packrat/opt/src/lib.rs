//! # Grammar optimization passes
//!
//! This crate implements the analyses and rewrites that turn a grammar, as
//! produced by the front-end, into a form the code generator can emit a
//! packrat parser for. Passes are registered with a [PassManager] and run
//! over an [packrat_ir::Context] in the order given by a plan.
//!
//! ```rust,ignore
//! use packrat_opt::pass_manager::PassManager;
//! let pm = PassManager::default_passes()?;
//! pm.execute_plan(&mut ctx, &["all".to_string()], &[], &[], false)?;
//! ```
//!
//! [PassManager]: pass_manager::PassManager
pub mod analysis;
pub mod default_passes;
pub mod pass_manager;
pub mod passes;
pub mod traversal;
