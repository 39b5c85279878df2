use std::{
    cell::{BorrowMutError, RefCell, RefMut},
    collections::HashMap,
    fmt,
    rc::Rc,
};

use crate::{
    construct::{ConstructKind, Phase},
    dispatcher::EventContext,
    error::DispatchResult,
};

/// Callback stored in an [`EventTable`].
///
/// Handlers are plain functions taking the listener explicitly, so a
/// listener never holds a reference to itself.
pub type Handler<L> = fn(&mut L, &mut EventContext) -> DispatchResult<()>;

fn nop<L>(_listener: &mut L, _ctx: &mut EventContext) -> DispatchResult<()> {
    Ok(())
}

/// Per-listener bookkeeping owned by the dispatch protocol.
#[derive(Debug, Default, Clone)]
pub struct ListenerState {
    dispatched: bool,
}

impl ListenerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the listener already saw the event of the current cycle.
    pub fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    pub fn mark_dispatched(&mut self) {
        self.dispatched = true;
    }

    pub fn clear(&mut self) {
        self.dispatched = false;
    }
}

/// Open and close handler maps of a listener, keyed by construct kind.
pub struct EventTable<L> {
    open: HashMap<ConstructKind, Handler<L>>,
    close: HashMap<ConstructKind, Handler<L>>,
}

impl<L> Default for EventTable<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> EventTable<L> {
    /// A table with no-op handlers for the default construct kinds.
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.nop_open(&ConstructKind::default_nop_kinds(Phase::Open));
        table.nop_close(&ConstructKind::default_nop_kinds(Phase::Close));
        table
    }

    pub fn empty() -> Self {
        Self {
            open: HashMap::new(),
            close: HashMap::new(),
        }
    }

    pub fn on_open(&mut self, kind: ConstructKind, handler: Handler<L>) -> &mut Self {
        self.open.insert(kind, handler);
        self
    }

    pub fn on_close(&mut self, kind: ConstructKind, handler: Handler<L>) -> &mut Self {
        self.close.insert(kind, handler);
        self
    }

    pub fn nop_open(&mut self, kinds: &[ConstructKind]) -> &mut Self {
        for kind in kinds {
            self.open.insert(*kind, nop::<L>);
        }
        self
    }

    pub fn nop_close(&mut self, kinds: &[ConstructKind]) -> &mut Self {
        for kind in kinds {
            self.close.insert(*kind, nop::<L>);
        }
        self
    }

    pub fn lookup(&self, kind: ConstructKind, phase: Phase) -> Option<Handler<L>> {
        match phase {
            Phase::Open => self.open.get(&kind).copied(),
            Phase::Close => self.close.get(&kind).copied(),
        }
    }

    pub fn contains(&self, kind: ConstructKind, phase: Phase) -> bool {
        self.lookup(kind, phase).is_some()
    }
}

impl<L> fmt::Debug for EventTable<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTable")
            .field("open", &self.open.keys().collect::<Vec<_>>())
            .field("close", &self.close.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A unit that receives open/close callbacks from the dispatcher.
pub trait EventListener {
    fn listener_state(&self) -> &ListenerState;

    fn listener_state_mut(&mut self) -> &mut ListenerState;

    /// Runs the handler for `(kind, phase)`, if any.
    ///
    /// Implementations normally look the handler up in their
    /// [`EventTable`] and treat a missing entry as a no-op.
    fn on_event(
        &mut self,
        kind: ConstructKind,
        phase: Phase,
        ctx: &mut EventContext,
    ) -> DispatchResult<()>;

    /// Delivers an event at most once per dispatch cycle.
    fn handle_event(
        &mut self,
        kind: ConstructKind,
        phase: Phase,
        ctx: &mut EventContext,
    ) -> DispatchResult<()> {
        if self.listener_state().is_dispatched() {
            return Ok(());
        }
        self.listener_state_mut().mark_dispatched();
        self.on_event(kind, phase, ctx)
    }
}

/// Shared handle to a listener registered with an [`EventContext`].
///
/// Two handles are the same listener when they point at the same
/// allocation.
#[derive(Clone)]
pub struct ListenerHandle(Rc<RefCell<dyn EventListener>>);

impl ListenerHandle {
    pub fn new<L: EventListener + 'static>(listener: L) -> Self {
        Self(Rc::new(RefCell::new(listener)))
    }

    pub fn same(&self, other: &ListenerHandle) -> bool {
        Rc::as_ptr(&self.0) as *const () == Rc::as_ptr(&other.0) as *const ()
    }

    pub(crate) fn try_borrow_mut(
        &self,
    ) -> Result<RefMut<'_, dyn EventListener + 'static>, BorrowMutError> {
        self.0.try_borrow_mut()
    }
}

impl<L: EventListener + 'static> From<Rc<RefCell<L>>> for ListenerHandle {
    fn from(listener: Rc<RefCell<L>>) -> Self {
        Self(listener)
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerHandle({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}
