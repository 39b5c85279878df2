use std::{
    ops::{Deref, DerefMut},
    path::Path,
};

use tracing::{debug, error, trace, warn};

use crate::{
    config::DispatchConfig,
    construct::{ConstructKind, Phase},
    context::{FileInfo, ParseContext},
    error::{DispatchError, DispatchResult, InternalResult},
    listener::ListenerHandle,
    source::SourceEvent,
};

/// The event being delivered by the current dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub kind: ConstructKind,
    pub phase: Phase,
}

/// Dispatcher and parse state of one document session.
///
/// Listeners receive `&mut EventContext` in every callback, so they can
/// query the nesting state (through `Deref<Target = ParseContext>`) and
/// attach or detach listeners while an event is being delivered.
///
/// The registry is an arena of slots in registration order. Removing a
/// listener mid-cycle empties its slot; empty slots are compacted once the
/// cycle is over, so the running iteration never shifts under itself.
/// Listeners appended mid-cycle are reached by the running iteration
/// unless they were marked delivered on the way in.
#[derive(Debug, Default)]
pub struct EventContext {
    state: ParseContext,
    listeners: Vec<Option<ListenerHandle>>,
    detached: Vec<ListenerHandle>,
    in_flight: Option<InFlight>,
    config: DispatchConfig,
}

impl Deref for EventContext {
    type Target = ParseContext;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl DerefMut for EventContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl EventContext {
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            state: ParseContext::new(),
            listeners: Vec::new(),
            detached: Vec::new(),
            in_flight: None,
            config,
        }
    }

    /// Builds a context from a JSON config file.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        let config = DispatchConfig::from_file(path)?;
        debug!("loaded dispatch config: {:?}", config);
        Ok(Self::with_config(config))
    }

    pub fn state(&self) -> &ParseContext {
        &self.state
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    pub fn is_dispatching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.iter().flatten().count()
    }

    pub fn is_registered(&self, listener: &ListenerHandle) -> bool {
        self.position(listener).is_some()
    }

    fn position(&self, listener: &ListenerHandle) -> Option<usize> {
        self.listeners
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|h| h.same(listener)))
    }

    // Registration

    pub fn add_listener(&mut self, listener: ListenerHandle) {
        trace!("add listener {:?}", listener);
        self.listeners.push(Some(listener));
    }

    /// Adds a listener, first delivering the in-flight event to it so it
    /// does not miss the event that caused its attachment.
    ///
    /// If that delivery fails the listener is not added, and its delivered
    /// flag is still reset at the end of the cycle.
    pub fn add_listener_dispatch(&mut self, listener: ListenerHandle) -> DispatchResult<()> {
        if let Some(event) = self.in_flight {
            self.deliver_synthetic(&listener, event)?;
        }
        self.add_listener(listener);
        Ok(())
    }

    /// Adds a listener, excluding it from the in-flight event.
    pub fn add_listener_no_dispatch(&mut self, listener: ListenerHandle) {
        if self.in_flight.is_some() {
            Self::mark_delivered(&listener);
        }
        self.add_listener(listener);
    }

    pub fn remove_listener(&mut self, listener: &ListenerHandle) -> DispatchResult<()> {
        let Some(index) = self.position(listener) else {
            return self.not_registered(listener);
        };
        trace!("remove listener {:?}", listener);
        if self.in_flight.is_some() {
            if let Some(handle) = self.listeners[index].take() {
                self.detached.push(handle);
            }
        } else {
            self.listeners.remove(index);
        }
        Ok(())
    }

    /// Removes a listener after delivering the in-flight event to it.
    pub fn remove_listener_dispatch(&mut self, listener: &ListenerHandle) -> DispatchResult<()> {
        if !self.is_registered(listener) {
            return self.not_registered(listener);
        }
        if let Some(event) = self.in_flight {
            self.deliver_synthetic(listener, event)?;
        }
        self.remove_listener(listener)
    }

    /// Removes a listener and marks it delivered, so a later slot holding
    /// the same listener skips the in-flight event too.
    pub fn remove_listener_no_dispatch(&mut self, listener: &ListenerHandle) -> DispatchResult<()> {
        if !self.is_registered(listener) {
            return self.not_registered(listener);
        }
        if self.in_flight.is_some() {
            Self::mark_delivered(listener);
        }
        self.remove_listener(listener)
    }

    fn not_registered(&self, listener: &ListenerHandle) -> DispatchResult<()> {
        if self.config.strict_removal {
            warn!("attempt to remove unregistered listener {:?}", listener);
            Err(DispatchError::ListenerNotRegistered)
        } else {
            debug!("ignoring removal of unregistered listener {:?}", listener);
            Ok(())
        }
    }

    // Delivery

    /// Delivers one event to every registered listener in registration
    /// order.
    ///
    /// The trigger field is incremented before an open is delivered and
    /// decremented after a close is delivered, so a listener sees its own
    /// construct as open in both callbacks.
    pub fn dispatch(&mut self, kind: ConstructKind, phase: Phase) -> DispatchResult<()> {
        if let Some(event) = self.in_flight {
            error!(
                "dispatch of {} {} while {} {} is in flight",
                phase, kind, event.phase, event.kind
            );
            return Err(DispatchError::NestedDispatch { kind, phase });
        }

        if phase == Phase::Open {
            self.state.enter(kind);
        }
        if self.config.trace_events {
            trace!(
                line = self.state.current_line_number,
                token = %self.state.current_token,
                "{} {}",
                phase,
                kind
            );
        }

        self.in_flight = Some(InFlight { kind, phase });
        let mut result = Ok(());
        let mut index = 0;
        while index < self.listeners.len() {
            if let Some(listener) = self.listeners[index].clone() {
                if let Err(err) = self.deliver(&listener, kind, phase) {
                    result = Err(err);
                    break;
                }
            }
            index += 1;
        }
        self.clear_delivered();
        self.in_flight = None;
        self.listeners.retain(Option::is_some);

        if phase == Phase::Close {
            self.state.exit(kind, self.config.warn_on_unbalanced);
        }

        if let Err(err) = &result {
            error!("dispatch of {} {} failed: {}", phase, kind, err);
        }
        result
    }

    fn deliver(
        &mut self,
        listener: &ListenerHandle,
        kind: ConstructKind,
        phase: Phase,
    ) -> DispatchResult<()> {
        match listener.try_borrow_mut() {
            Ok(mut listener) => listener.handle_event(kind, phase, self),
            // The listener is running its own callback for this event.
            Err(_) => Ok(()),
        }
    }

    /// Delivers the in-flight event outside the registry walk. On failure
    /// the listener is queued for the end-of-cycle flag reset.
    fn deliver_synthetic(
        &mut self,
        listener: &ListenerHandle,
        event: InFlight,
    ) -> DispatchResult<()> {
        self.deliver(listener, event.kind, event.phase)
            .inspect_err(|_| self.detached.push(listener.clone()))
    }

    fn mark_delivered(listener: &ListenerHandle) {
        if let Ok(mut listener) = listener.try_borrow_mut() {
            listener.listener_state_mut().mark_dispatched();
        }
    }

    fn clear_delivered(&mut self) {
        let detached = std::mem::take(&mut self.detached);
        for listener in self.listeners.iter().flatten().chain(detached.iter()) {
            if let Ok(mut listener) = listener.try_borrow_mut() {
                listener.listener_state_mut().clear();
            }
        }
    }

    // Producer conveniences

    pub fn set_line(&mut self, line: u32) {
        self.state.current_line_number = line;
    }

    /// Makes `text` the current token and dispatches it as a token string.
    pub fn dispatch_token<S: Into<String>>(&mut self, text: S) -> DispatchResult<()> {
        self.state.current_token = text.into();
        self.dispatch(ConstructKind::TokenString, Phase::Open)?;
        self.dispatch(ConstructKind::TokenString, Phase::Close)
    }

    /// Dispatches an event given in textual form. An invalid phase is
    /// fatal.
    pub fn dispatch_raw(&mut self, kind: &str, phase: &str) -> DispatchResult<()> {
        let phase = Phase::parse(phase).inspect_err(|err| error!("{}", err))?;
        let kind = ConstructKind::parse(kind)?;
        self.dispatch(kind, phase)
    }

    #[tracing::instrument(level = "debug", skip(self, events))]
    pub fn replay<I>(&mut self, events: I) -> DispatchResult<()>
    where
        I: IntoIterator<Item = SourceEvent>,
    {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    pub fn apply(&mut self, event: SourceEvent) -> DispatchResult<()> {
        match event {
            SourceEvent::Open(kind) => self.dispatch(kind, Phase::Open),
            SourceEvent::Close(kind) => self.dispatch(kind, Phase::Close),
            SourceEvent::Token(text) => self.dispatch_token(text),
            SourceEvent::Line(line) => {
                self.set_line(line);
                Ok(())
            }
            SourceEvent::File(file) => {
                self.start_document(file);
                Ok(())
            }
            SourceEvent::GenericEnter => {
                self.state.push_generic_depth();
                Ok(())
            }
            SourceEvent::GenericExit => {
                self.state.pop_generic_depth();
                Ok(())
            }
        }
    }

    /// Fresh parse state for a new document; registrations are kept.
    pub fn start_document(&mut self, file: FileInfo) {
        debug!("start document {}", file.path);
        self.state.reset();
        self.state.set_file(file);
    }

    pub fn end_document(&mut self) {
        if !self.state.is_balanced() {
            warn!(
                "document {} ended with open constructs",
                self.state.file.path
            );
        }
        self.state.reset();
    }
}
