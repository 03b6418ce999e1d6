//! Defines a global symbol type and its associated interning pool
use std::sync::{Mutex, MutexGuard};
use string_interner::{
    backend::BucketBackend, symbol::SymbolU32, StringInterner,
};

/// A globally interned symbol.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GSym(SymbolU32);

type Pool = StringInterner<BucketBackend>;

lazy_static::lazy_static! {
    static ref POOL: Mutex<Pool> = Mutex::new(Pool::new());
}

fn pool() -> MutexGuard<'static, Pool> {
    POOL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl GSym {
    /// Intern a string into the global symbol table.
    pub fn new(s: impl AsRef<str>) -> Self {
        GSym(pool().get_or_intern(s.as_ref()))
    }

    /// The interned string. Symbols are never freed, so the reference is
    /// valid for the remainder of the program.
    pub fn as_str(&self) -> &'static str {
        let guard = pool();
        let s: &str = guard
            .resolve(self.0)
            .expect("symbol was not produced by the global pool");
        // SAFETY:
        // - the bucket backend never moves or frees an interned string
        // - the pool itself lives for the whole program
        unsafe { &*(s as *const str) }
    }
}

impl From<&str> for GSym {
    fn from(s: &str) -> Self {
        GSym::new(s)
    }
}

impl From<String> for GSym {
    fn from(s: String) -> Self {
        GSym::new(s)
    }
}

impl From<GSym> for &'static str {
    fn from(sym: GSym) -> Self {
        sym.as_str()
    }
}

impl std::fmt::Debug for GSym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for GSym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_str(), f)
    }
}
