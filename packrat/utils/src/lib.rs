//! Shared utilities for the packrat grammar optimizer.
mod errors;
mod global_sym;
mod id;
mod out_file;
mod position;

pub use errors::{Error, MultiError, PackratResult};
pub use global_sym::GSym;
pub use id::{GetName, Id, QUALIFIER_SEPARATOR};
pub use out_file::OutputFile;
pub use position::{
    FileIdx, GPosIdx, GlobalPositionTable, PosIdx, PositionTable, WithPos,
};
