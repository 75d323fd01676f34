//! Owned, single-instance holder of the authoritative sheet.
//!
//! # Responsibility
//! - Own exactly one `Sheet` with an explicit lifecycle.
//! - Stay injectable so tests can build isolated instances.
//!
//! # Invariants
//! - The store never exposes a partially mutated tree: callers build the next
//!   tree separately and swap it in with `replace`.

use crate::model::sheet::Sheet;

/// Authoritative in-process copy of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetStore {
    sheet: Sheet,
}

impl SheetStore {
    /// Creates the store from a seed tree, however it was sourced.
    pub fn init(seed: Sheet) -> Self {
        Self { sheet: seed }
    }

    pub fn get(&self) -> &Sheet {
        &self.sheet
    }

    /// Swaps in a new tree verbatim and returns the previous one.
    pub fn replace(&mut self, sheet: Sheet) -> Sheet {
        std::mem::replace(&mut self.sheet, sheet)
    }

    pub fn into_inner(self) -> Sheet {
        self.sheet
    }
}
