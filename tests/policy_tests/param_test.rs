use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;
use sax_dispatch::{
    ConstructKind::*, EventContext, EventScript, ListenerHandle, ParamData, ParamTypePolicy,
    PolicyCollector,
};

#[test]
fn test_standalone_param_policy() {
    let collector = PolicyCollector::<ParamData>::shared();
    let policy = Rc::new(RefCell::new(ParamTypePolicy::new()));
    policy.borrow_mut().add_observer(&collector);

    let mut ctx = EventContext::new();
    ctx.add_listener(ListenerHandle::from(policy.clone()));
    ctx.replay(
        EventScript::new()
            .open(ParameterList)
            .line(12)
            .open(Parameter)
            .open(Type)
            .wrapped_token(Name, "unsigned")
            .wrapped_token(Name, "long")
            .wrapped_token(Modifier, "*")
            .wrapped_token(Modifier, "*")
            .close(Type)
            .wrapped_token(Name, "argv")
            .close(Parameter)
            .close(ParameterList),
    )
    .unwrap();

    assert_eq!(
        collector.borrow().items(),
        &[ParamData {
            type_name: "unsigned long".to_string(),
            name: "argv".to_string(),
            modifiers: vec!["*".to_string(), "*".to_string()],
            line_number: 12,
        }]
    );

    // tokens outside a parameter are ignored
    ctx.replay(EventScript::new().wrapped_token(Name, "stray"))
        .unwrap();
    assert_eq!(collector.borrow().items().len(), 1);
}

#[test]
fn test_parameters_without_observer() {
    let policy = Rc::new(RefCell::new(ParamTypePolicy::new()));
    let mut ctx = EventContext::new();
    ctx.add_listener(ListenerHandle::from(policy.clone()));
    ctx.replay(
        EventScript::new()
            .open(Parameter)
            .wrapped_token(Name, "x")
            .close(Parameter),
    )
    .unwrap();
    assert!(ctx.is_balanced());
}
