use sax_dispatch::{
    ConstructKind::{self, *},
    DispatchConfig, DispatchError, DispatchResult, EventContext, EventListener, EventScript,
    EventTable, ListenerHandle, ListenerState, Phase,
};

use crate::{labels, EventLog, Tracer};

#[derive(Clone, Copy)]
enum Attach {
    Plain,
    Dispatch,
    NoDispatch,
}

#[derive(Clone, Copy)]
enum Detach {
    Plain,
    Dispatch,
    NoDispatch,
}

/// Attaches a child for the extent of every function.
struct Scoped {
    state: ListenerState,
    events: EventTable<Self>,
    child: ListenerHandle,
    attach: Attach,
    detach: Detach,
}

impl Scoped {
    fn new(child: ListenerHandle, attach: Attach, detach: Detach) -> Self {
        let mut events = EventTable::new();
        events
            .on_open(Function, |this: &mut Self, ctx| match this.attach {
                Attach::Plain => {
                    ctx.add_listener(this.child.clone());
                    Ok(())
                }
                Attach::Dispatch => ctx.add_listener_dispatch(this.child.clone()),
                Attach::NoDispatch => {
                    ctx.add_listener_no_dispatch(this.child.clone());
                    Ok(())
                }
            })
            .on_close(Function, |this: &mut Self, ctx| match this.detach {
                Detach::Plain => ctx.remove_listener(&this.child),
                Detach::Dispatch => ctx.remove_listener_dispatch(&this.child),
                Detach::NoDispatch => ctx.remove_listener_no_dispatch(&this.child),
            });
        Self {
            state: ListenerState::new(),
            events,
            child,
            attach,
            detach,
        }
    }
}

impl EventListener for Scoped {
    fn listener_state(&self) -> &ListenerState {
        &self.state
    }

    fn listener_state_mut(&mut self) -> &mut ListenerState {
        &mut self.state
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

fn function_with_block() -> EventScript {
    EventScript::new()
        .open(Function)
        .open(Block)
        .close(Block)
        .close(Function)
}

fn run_scoped(attach: Attach, detach: Detach) -> Vec<(Phase, ConstructKind)> {
    let log = EventLog::default();
    let child = ListenerHandle::new(Tracer::new("child", &log));
    let mut ctx = EventContext::new();
    ctx.add_listener(ListenerHandle::new(Scoped::new(child.clone(), attach, detach)));

    ctx.replay(function_with_block()).unwrap();
    assert!(!ctx.is_registered(&child));
    assert_eq!(ctx.listener_count(), 1);

    let events = log
        .borrow()
        .iter()
        .map(|(_, phase, kind)| (*phase, *kind))
        .collect();
    events
}

#[test]
fn test_plain_attach_sees_triggering_event() {
    let events = run_scoped(Attach::Plain, Detach::Plain);
    assert_eq!(
        events,
        vec![
            (Phase::Open, Function),
            (Phase::Open, Block),
            (Phase::Close, Block),
        ]
    );
}

#[test]
fn test_dispatch_attach_sees_triggering_event_once() {
    let events = run_scoped(Attach::Dispatch, Detach::Dispatch);
    assert_eq!(
        events,
        vec![
            (Phase::Open, Function),
            (Phase::Open, Block),
            (Phase::Close, Block),
            (Phase::Close, Function),
        ]
    );
}

#[test]
fn test_no_dispatch_attach_skips_triggering_event() {
    let events = run_scoped(Attach::NoDispatch, Detach::NoDispatch);
    assert_eq!(
        events,
        vec![(Phase::Open, Block), (Phase::Close, Block)]
    );
}

#[test]
fn test_duplicate_registration_delivers_once_per_cycle() {
    let log = EventLog::default();
    let tracer = ListenerHandle::new(Tracer::new("t", &log));
    let mut ctx = EventContext::new();
    ctx.add_listener(tracer.clone());
    ctx.add_listener(tracer.clone());
    assert_eq!(ctx.listener_count(), 2);

    ctx.replay(EventScript::new().open(Name).close(Name)).unwrap();
    assert_eq!(labels(&log), vec!["t", "t"]);

    // one removal leaves the other slot in place
    ctx.remove_listener(&tracer).unwrap();
    assert!(ctx.is_registered(&tracer));
    ctx.remove_listener(&tracer).unwrap();
    assert!(!ctx.is_registered(&tracer));
}

#[test]
fn test_registration_order_is_delivery_order() {
    let log = EventLog::default();
    let mut ctx = EventContext::new();
    for label in ["first", "second", "third"] {
        ctx.add_listener(ListenerHandle::new(Tracer::new(label, &log)));
    }

    ctx.dispatch(Decl, Phase::Open).unwrap();
    assert_eq!(labels(&log), vec!["first", "second", "third"]);
}

#[test]
fn test_nested_dispatch_is_rejected() {
    struct Reentrant {
        state: ListenerState,
        seen: Option<DispatchError>,
    }

    impl EventListener for Reentrant {
        fn listener_state(&self) -> &ListenerState {
            &self.state
        }

        fn listener_state_mut(&mut self) -> &mut ListenerState {
            &mut self.state
        }

        fn on_event(
            &mut self,
            kind: ConstructKind,
            _phase: Phase,
            ctx: &mut EventContext,
        ) -> DispatchResult<()> {
            if kind == Call {
                self.seen = ctx.dispatch(Name, Phase::Open).err();
            }
            Ok(())
        }
    }

    let listener = std::rc::Rc::new(std::cell::RefCell::new(Reentrant {
        state: ListenerState::new(),
        seen: None,
    }));
    let mut ctx = EventContext::new();
    ctx.add_listener(ListenerHandle::from(listener.clone()));
    ctx.dispatch(Call, Phase::Open).unwrap();

    assert_eq!(
        listener.borrow().seen,
        Some(DispatchError::NestedDispatch {
            kind: Name,
            phase: Phase::Open
        })
    );
    assert!(ctx.is_closed(Name));
}

#[test]
fn test_unbalanced_close_keeps_counter_at_zero() {
    let mut ctx = EventContext::with_config(DispatchConfig {
        warn_on_unbalanced: true,
        ..DispatchConfig::default()
    });
    ctx.dispatch(Block, Phase::Close).unwrap();
    assert_eq!(ctx.count(Block), 0);
    assert!(ctx.is_balanced());
}

#[test]
fn test_text_script_end_to_end() {
    let script = EventScript::parse(
        r#"
        file src/main.cpp
        line 1
        open function
        open name
        token main
        close name
        close function
        "#,
    )
    .unwrap();

    let log = EventLog::default();
    let mut ctx = EventContext::new();
    ctx.add_listener(ListenerHandle::new(Tracer::new("t", &log)));
    ctx.replay(script).unwrap();

    let kinds: Vec<_> = log.borrow().iter().map(|(_, _, kind)| *kind).collect();
    assert_eq!(
        kinds,
        vec![Function, Name, TokenString, TokenString, Name, Function]
    );
    assert_eq!(ctx.current_token, "main");
    assert_eq!(ctx.file.name, "main.cpp");
    assert!(ctx.is_balanced());
}
