use std::{cell::RefCell, rc::Rc};

use crate::{
    construct::{ConstructKind, Phase},
    dispatcher::EventContext,
    error::{DispatchResult, PolicyError},
    listener::{EventListener, EventTable, ListenerState},
    policy::{PolicyData, PolicyDispatcher, PolicyObserver},
};

use super::append_token;

/// One parameter of a parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamData {
    pub type_name: String,
    pub name: String,
    /// Pointer and reference markers in source order.
    pub modifiers: Vec<String>,
    pub line_number: u32,
}

/// Collects one [`ParamData`] per parameter and publishes it when the
/// parameter closes.
///
/// Meant to be attached for the duration of a parameter list by a parent
/// policy, which observes it.
#[derive(Debug)]
pub struct ParamTypePolicy {
    listener: ListenerState,
    events: EventTable<Self>,
    publisher: PolicyDispatcher<ParamData>,
    data: ParamData,
}

impl Default for ParamTypePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamTypePolicy {
    pub fn new() -> Self {
        let mut events = EventTable::new();
        events
            .on_open(ConstructKind::Parameter, Self::on_parameter_open)
            .on_close(ConstructKind::TokenString, Self::on_token)
            .on_close(ConstructKind::Parameter, Self::on_parameter_close);
        Self {
            listener: ListenerState::new(),
            events,
            publisher: PolicyDispatcher::new(),
            data: ParamData::default(),
        }
    }

    pub fn add_observer<O: PolicyObserver<ParamData> + 'static>(&mut self, observer: &Rc<RefCell<O>>) {
        self.publisher.add_observer(observer);
    }

    pub fn remove_observer<O: PolicyObserver<ParamData> + 'static>(
        &mut self,
        observer: &Rc<RefCell<O>>,
    ) -> Result<(), PolicyError> {
        self.publisher.remove_observer(observer)
    }

    pub(crate) fn publisher_mut(&mut self) -> &mut PolicyDispatcher<ParamData> {
        &mut self.publisher
    }

    fn on_parameter_open(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        self.data = ParamData {
            line_number: ctx.current_line_number,
            ..ParamData::default()
        };
        Ok(())
    }

    fn on_token(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        use ConstructKind::*;

        if ctx.is_closed(Parameter) || ctx.is_open(Init) {
            return Ok(());
        }
        let token = ctx.current_token.as_str();
        if ctx.and(&[Modifier, Type]) {
            self.data.modifiers.push(token.to_string());
        } else if ctx.is_open(Type) {
            append_token(&mut self.data.type_name, token);
        } else if ctx.is_open(Name) {
            append_token(&mut self.data.name, token);
        }
        Ok(())
    }

    fn on_parameter_close(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        let this: &Self = self;
        this.publisher.notify_all(this, ctx.state())?;
        self.data = ParamData::default();
        Ok(())
    }
}

impl PolicyData<ParamData> for ParamTypePolicy {
    fn data(&self) -> ParamData {
        self.data.clone()
    }
}

impl EventListener for ParamTypePolicy {
    fn listener_state(&self) -> &ListenerState {
        &self.listener
    }

    fn listener_state_mut(&mut self) -> &mut ListenerState {
        &mut self.listener
    }

    fn on_event(
        &mut self,
        kind: ConstructKind,
        phase: Phase,
        ctx: &mut EventContext,
    ) -> DispatchResult<()> {
        match self.events.lookup(kind, phase) {
            Some(handler) => handler(self, ctx),
            None => Ok(()),
        }
    }
}
