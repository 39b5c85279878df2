use tracing::warn;

use crate::construct::{ConstructKind, CONSTRUCT_COUNT};

/// File metadata of the document being processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub path: String,
    pub name: String,
    pub language: String,
    pub revision: String,
}

/// Per-document state shared by every listener of a session.
///
/// The scalar fields are overwritten on every event; a listener that needs
/// a value past its callback has to copy it.
#[derive(Debug, Clone)]
pub struct ParseContext {
    trigger_field: [u16; CONSTRUCT_COUNT],
    /// Element depth at which each open generic argument list started.
    generic_depth: Vec<usize>,
    pub current_token: String,
    pub current_line_number: u32,
    pub file: FileInfo,
    pub saw_generic: bool,
    /// Total number of currently open constructs.
    pub depth: usize,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseContext {
    pub fn new() -> Self {
        Self {
            trigger_field: [0; CONSTRUCT_COUNT],
            generic_depth: Vec::new(),
            current_token: String::new(),
            current_line_number: 0,
            file: FileInfo::default(),
            saw_generic: false,
            depth: 0,
        }
    }

    /// Back to the freshly created state, for reuse on the next document.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn set_file(&mut self, file: FileInfo) {
        self.file = file;
    }

    // Trigger field

    pub fn count(&self, kind: ConstructKind) -> u16 {
        self.trigger_field[kind.index()]
    }

    pub(crate) fn enter(&mut self, kind: ConstructKind) {
        let slot = &mut self.trigger_field[kind.index()];
        *slot = slot.saturating_add(1);
        self.depth += 1;
    }

    /// Returns false when the counter was already zero, i.e. the producer
    /// closed something it never opened.
    pub(crate) fn exit(&mut self, kind: ConstructKind, warn_on_unbalanced: bool) -> bool {
        let slot = &mut self.trigger_field[kind.index()];
        if *slot == 0 {
            if warn_on_unbalanced {
                warn!("close of {} without a matching open", kind);
            }
            return false;
        }
        *slot -= 1;
        self.depth = self.depth.saturating_sub(1);
        true
    }

    /// True when no construct is open.
    pub fn is_balanced(&self) -> bool {
        self.trigger_field.iter().all(|count| *count == 0)
    }

    // Generic argument depth

    pub fn push_generic_depth(&mut self) {
        self.saw_generic = true;
        self.generic_depth.push(self.depth);
    }

    pub fn pop_generic_depth(&mut self) -> Option<usize> {
        self.generic_depth.pop()
    }

    pub fn generic_depth(&self) -> usize {
        self.generic_depth.len()
    }

    pub fn innermost_generic(&self) -> Option<usize> {
        self.generic_depth.last().copied()
    }

    // Query algebra

    /// Every kind is open. Vacuously true.
    pub fn and(&self, kinds: &[ConstructKind]) -> bool {
        kinds.iter().all(|kind| self.is_open(*kind))
    }

    /// At least one kind is closed. An empty list is defined as true.
    pub fn nand(&self, kinds: &[ConstructKind]) -> bool {
        kinds.is_empty() || kinds.iter().any(|kind| self.is_closed(*kind))
    }

    /// Any kind is open. Vacuously false.
    pub fn or(&self, kinds: &[ConstructKind]) -> bool {
        kinds.iter().any(|kind| self.is_open(*kind))
    }

    /// No kind is open. Vacuously true.
    pub fn nor(&self, kinds: &[ConstructKind]) -> bool {
        !self.or(kinds)
    }

    pub fn is_equal_to(&self, lhs: ConstructKind, rhs: ConstructKind) -> bool {
        self.count(lhs) == self.count(rhs)
    }

    pub fn is_greater_than(&self, lhs: ConstructKind, rhs: ConstructKind) -> bool {
        self.count(lhs) > self.count(rhs)
    }

    pub fn is_greater_than_or_equal_to(&self, lhs: ConstructKind, rhs: ConstructKind) -> bool {
        self.count(lhs) >= self.count(rhs)
    }

    pub fn is_less_than(&self, lhs: ConstructKind, rhs: ConstructKind) -> bool {
        self.count(lhs) < self.count(rhs)
    }

    pub fn is_less_than_or_equal_to(&self, lhs: ConstructKind, rhs: ConstructKind) -> bool {
        self.count(lhs) <= self.count(rhs)
    }

    pub fn is_open(&self, kind: ConstructKind) -> bool {
        self.count(kind) != 0
    }

    pub fn is_closed(&self, kind: ConstructKind) -> bool {
        self.count(kind) == 0
    }
}
