//! Kernel symbol resolution for raw stack frames
//!
//! Stacks captured by the backend may hold raw instruction addresses. They
//! are symbolized with blazesym against a kallsyms-format table
//! (`/proc/kallsyms` unless `--kallsyms` names another file).

use anyhow::{Context, Result};
use blazesym::symbolize::source::{Kernel, Source};
use blazesym::symbolize::{Input, Symbolized, Symbolizer};
use blazesym::MaybeDefault;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Frames further than this past their symbol's start are not trusted
/// when the table gives no symbol size.
pub const MAX_SYMBOL_OFFSET: usize = 0x10_0000;

/// Maps a raw frame address to a function name
pub trait SymbolResolver {
    fn resolve(&self, addr: u64) -> Option<String>;
}

/// Resolver that knows no symbols; raw addresses stay unresolved
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    fn resolve(&self, _addr: u64) -> Option<String> {
        None
    }
}

/// Kernel symbolizer backed by a kallsyms file
pub struct Kallsyms {
    path: PathBuf,
    symbolizer: Symbolizer,
}

impl Kallsyms {
    pub const DEFAULT_PATH: &'static str = "/proc/kallsyms";

    /// Use the kallsyms table at `path`; vmlinux debug info is never consulted
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        fs::metadata(path)
            .with_context(|| format!("Failed to open symbol table: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "using kernel symbol table");

        Ok(Self {
            path: path.to_path_buf(),
            symbolizer: Symbolizer::new(),
        })
    }

    fn source(&self) -> Source<'static> {
        let mut kernel = Kernel::default();
        kernel.kallsyms = MaybeDefault::Some(self.path.clone());
        kernel.vmlinux = MaybeDefault::None;
        Source::Kernel(kernel)
    }
}

impl fmt::Debug for Kallsyms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kallsyms").field("path", &self.path).finish()
    }
}

impl SymbolResolver for Kallsyms {
    fn resolve(&self, addr: u64) -> Option<String> {
        let addrs: &[u64] = &[addr];
        let symbolized = match self.symbolizer.symbolize(&self.source(), Input::AbsAddr(addrs)) {
            Ok(symbolized) => symbolized,
            Err(e) => {
                tracing::trace!(addr, "symbolization failed: {}", e);
                return None;
            }
        };

        match symbolized.first()? {
            Symbolized::Sym(sym) => {
                let limit = sym.size.unwrap_or(MAX_SYMBOL_OFFSET);
                // kallsyms has no end marker for the last symbol
                if sym.offset >= limit {
                    tracing::trace!(addr, symbol = %sym.name, offset = sym.offset, "frame past symbol end");
                    return None;
                }
                Some(sym.name.to_string())
            }
            Symbolized::Unknown(_) => None,
        }
    }
}
