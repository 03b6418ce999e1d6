//! Definitions for tracking source position information of grammars

use std::sync::{Mutex, MutexGuard};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
/// Handle to a position in a [PositionTable]
pub struct PosIdx(u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// Handle to a grammar file in a [PositionTable]
pub struct FileIdx(u32);

struct PosData {
    file: FileIdx,
    /// 1-based line
    line: usize,
    /// 1-based column
    column: usize,
}

/// Source position information for the grammars being processed.
pub struct PositionTable {
    /// Names of the grammar files
    files: Vec<String>,
    /// Mapping from indexes to position data
    indices: Vec<PosData>,
}

impl Default for PositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionTable {
    /// The unknown position
    pub const UNKNOWN: PosIdx = PosIdx(0);

    /// Create a new position table where the first file and first position
    /// are unknown.
    pub fn new() -> Self {
        let mut table = PositionTable {
            files: Vec::new(),
            indices: Vec::new(),
        };
        let file = table.add_file("unknown".to_string());
        let pos = table.add_pos(file, 0, 0);
        debug_assert!(pos == Self::UNKNOWN);
        table
    }

    /// Add a new file to the position table
    pub fn add_file(&mut self, name: String) -> FileIdx {
        self.files.push(name);
        FileIdx((self.files.len() - 1) as u32)
    }

    /// Add a new position to the position table
    pub fn add_pos(
        &mut self,
        file: FileIdx,
        line: usize,
        column: usize,
    ) -> PosIdx {
        self.indices.push(PosData { file, line, column });
        PosIdx((self.indices.len() - 1) as u32)
    }

    fn get_pos(&self, pos: PosIdx) -> &PosData {
        &self.indices[pos.0 as usize]
    }

    fn file_name(&self, file: FileIdx) -> &str {
        &self.files[file.0 as usize]
    }
}

lazy_static::lazy_static! {
    static ref TABLE: Mutex<PositionTable> = Mutex::new(PositionTable::new());
}

/// The global position table
pub struct GlobalPositionTable;

impl GlobalPositionTable {
    /// Lock the global [PositionTable]
    pub fn get() -> MutexGuard<'static, PositionTable> {
        TABLE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a grammar file with the global table
    pub fn add_file(name: impl Into<String>) -> FileIdx {
        Self::get().add_file(name.into())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
/// A position index backed by a global [PositionTable]
pub struct GPosIdx(pub PosIdx);

impl Default for GPosIdx {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl GPosIdx {
    /// Symbol for the unknown position
    pub const UNKNOWN: GPosIdx = GPosIdx(PosIdx(0));

    /// Register a new position in the global table.
    pub fn new(file: FileIdx, line: usize, column: usize) -> Self {
        GPosIdx(GlobalPositionTable::get().add_pos(file, line, column))
    }

    /// Convert the position into an optional.
    /// Returns `None` if the position is the unknown position.
    pub fn into_option(self) -> Option<Self> {
        if self == Self::UNKNOWN {
            None
        } else {
            Some(self)
        }
    }

    /// Returns the file name, line, and column of this position.
    pub fn get_location(&self) -> (String, usize, usize) {
        let table = GlobalPositionTable::get();
        let pos = table.get_pos(self.0);
        (table.file_name(pos.file).to_string(), pos.line, pos.column)
    }

    /// Format this position with a the error message `err_msg` in the
    /// conventional `file:line:column: message` form.
    pub fn format<S: AsRef<str>>(&self, err_msg: S) -> String {
        if *self == Self::UNKNOWN {
            return err_msg.as_ref().to_string();
        }
        let (file, line, column) = self.get_location();
        format!("{file}:{line}:{column}: {}", err_msg.as_ref())
    }
}

/// An IR node that may contain position information.
pub trait WithPos {
    /// Copy the span associated with this node.
    fn copy_span(&self) -> GPosIdx;
}

impl WithPos for GPosIdx {
    fn copy_span(&self) -> GPosIdx {
        *self
    }
}
