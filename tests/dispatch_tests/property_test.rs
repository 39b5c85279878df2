use std::{cell::RefCell, rc::Rc};

use proptest::prelude::*;
use sax_dispatch::{
    ConstructKind, DispatchResult, EventContext, EventListener, EventScript, ListenerHandle,
    ListenerState, Phase, SourceEvent, CONSTRUCT_COUNT,
};
use strum::IntoEnumIterator;

const MAX_STEPS: usize = 200;

/// Counts callbacks and checks what a listener may rely on inside one.
#[derive(Default)]
struct Auditor {
    state: ListenerState,
    callbacks: usize,
    violations: Vec<String>,
}

impl EventListener for Auditor {
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
        self.callbacks += 1;
        if !ctx.is_open(kind) {
            self.violations
                .push(format!("{} {} delivered with zero count", phase, kind));
        }
        if ctx.in_flight().map(|event| (event.kind, event.phase)) != Some((kind, phase)) {
            self.violations
                .push(format!("{} {} delivered outside its cycle", phase, kind));
        }
        Ok(())
    }
}

/// Builds a well-formed stream: 0 opens, 1 closes the innermost open
/// construct, 2 emits a token. Whatever is still open is closed at the end.
fn well_formed(steps: &[(u8, usize)]) -> (EventScript, usize) {
    let kinds: Vec<ConstructKind> = ConstructKind::iter().collect();
    let mut script = EventScript::new();
    let mut stack = Vec::new();
    let mut deliveries = 0;
    for (action, kind) in steps {
        match *action {
            0 => {
                let kind = kinds[kind % CONSTRUCT_COUNT];
                stack.push(kind);
                script = script.open(kind);
                deliveries += 1;
            }
            1 => {
                if let Some(kind) = stack.pop() {
                    script = script.close(kind);
                    deliveries += 1;
                }
            }
            _ => {
                script = script.token(format!("t{}", kind));
                deliveries += 2;
            }
        }
    }
    while let Some(kind) = stack.pop() {
        script = script.close(kind);
        deliveries += 1;
    }
    (script, deliveries)
}

type Pool = Rc<RefCell<Vec<Rc<RefCell<Auditor>>>>>;

const MAX_ATTACHED: usize = 8;

/// Attaches and detaches auditors while events are in flight, following a
/// repeating plan: 0 idle, 1-3 add (plain, dispatch, no-dispatch),
/// 4-6 remove the oldest attached auditor (same three variants).
struct Churner {
    state: ListenerState,
    plan: Vec<u8>,
    step: usize,
    pool: Pool,
    attached: Vec<ListenerHandle>,
}

impl EventListener for Churner {
    fn listener_state(&self) -> &ListenerState {
        &self.state
    }

    fn listener_state_mut(&mut self) -> &mut ListenerState {
        &mut self.state
    }

    fn on_event(
        &mut self,
        _kind: ConstructKind,
        _phase: Phase,
        ctx: &mut EventContext,
    ) -> DispatchResult<()> {
        let action = self.plan[self.step % self.plan.len()];
        self.step += 1;
        match action {
            0 => {}
            1..=3 => {
                if self.attached.len() >= MAX_ATTACHED {
                    return Ok(());
                }
                let auditor = Rc::new(RefCell::new(Auditor::default()));
                self.pool.borrow_mut().push(auditor.clone());
                let handle = ListenerHandle::from(auditor);
                match action {
                    1 => ctx.add_listener(handle.clone()),
                    2 => ctx.add_listener_dispatch(handle.clone())?,
                    _ => ctx.add_listener_no_dispatch(handle.clone()),
                }
                self.attached.push(handle);
            }
            _ => {
                if self.attached.is_empty() {
                    return Ok(());
                }
                let handle = self.attached.remove(0);
                match action {
                    4 => ctx.remove_listener(&handle)?,
                    5 => ctx.remove_listener_dispatch(&handle)?,
                    _ => ctx.remove_listener_no_dispatch(&handle)?,
                }
            }
        }
        Ok(())
    }
}

fn steps() -> impl Strategy<Value = Vec<(u8, usize)>> {
    proptest::collection::vec((0u8..3, 0usize..CONSTRUCT_COUNT), 0..=MAX_STEPS)
}

proptest! {
    #[test]
    fn every_listener_sees_every_event_once(steps in steps(), listeners in 1usize..4) {
        let (script, deliveries) = well_formed(&steps);
        let auditors: Vec<_> = (0..listeners)
            .map(|_| Rc::new(RefCell::new(Auditor::default())))
            .collect();

        let mut ctx = EventContext::new();
        for auditor in &auditors {
            ctx.add_listener(ListenerHandle::from(auditor.clone()));
        }
        ctx.replay(script).unwrap();

        prop_assert!(ctx.is_balanced());
        prop_assert!(!ctx.is_dispatching());
        for auditor in &auditors {
            let auditor = auditor.borrow();
            prop_assert_eq!(auditor.callbacks, deliveries);
            prop_assert!(auditor.violations.is_empty(), "{:?}", auditor.violations);
            prop_assert!(!auditor.state.is_dispatched());
        }
    }

    #[test]
    fn flags_reset_despite_mid_cycle_churn(
        steps in steps(),
        plan in proptest::collection::vec(0u8..7, 1..16),
    ) {
        let (script, _) = well_formed(&steps);
        let pool = Pool::default();
        let churner = Rc::new(RefCell::new(Churner {
            state: ListenerState::new(),
            plan,
            step: 0,
            pool: pool.clone(),
            attached: Vec::new(),
        }));

        let mut ctx = EventContext::new();
        ctx.add_listener(ListenerHandle::from(churner.clone()));
        for event in script {
            ctx.apply(event).unwrap();
            prop_assert!(!churner.borrow().state.is_dispatched());
            for auditor in pool.borrow().iter() {
                let auditor = auditor.borrow();
                prop_assert!(!auditor.state.is_dispatched());
                prop_assert!(auditor.violations.is_empty(), "{:?}", auditor.violations);
            }
        }

        prop_assert!(ctx.is_balanced());
        prop_assert_eq!(ctx.listener_count(), 1 + churner.borrow().attached.len());
    }

    #[test]
    fn counts_track_nesting(steps in steps()) {
        let (script, _) = well_formed(&steps);
        let mut ctx = EventContext::new();
        let mut expected = vec![0u16; CONSTRUCT_COUNT];

        for event in script {
            match &event {
                SourceEvent::Open(kind) => expected[kind.index()] += 1,
                SourceEvent::Close(kind) => expected[kind.index()] -= 1,
                _ => {}
            }
            ctx.apply(event).unwrap();
            for kind in ConstructKind::iter() {
                prop_assert_eq!(ctx.count(kind), expected[kind.index()]);
            }
        }
        prop_assert!(ctx.is_balanced());
    }
}
