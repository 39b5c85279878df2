use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use tracing::debug;

use crate::{
    construct::{ConstructKind, Phase},
    context::ParseContext,
    dispatcher::EventContext,
    error::{DispatchResult, PolicyError},
    listener::{EventListener, EventTable, ListenerHandle, ListenerState},
    policy::{ObserverRef, PolicyCollector, PolicyData, PolicyDispatcher, PolicyObserver},
};

use super::{
    append_token,
    param_type::{ParamData, ParamTypePolicy},
};

use ConstructKind::*;

/// Signature of one function, constructor-less.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureData {
    pub line_number: u32,
    pub return_type: String,
    pub function_name: String,
    pub parameters: Vec<ParamData>,
    pub return_type_modifier: String,
    pub is_const: bool,
    pub is_method: bool,
    pub is_static: bool,
}

/// Observer keeping every published signature.
pub type SignatureCollector = PolicyCollector<SignatureData>;

impl SignatureData {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Extracts function signatures.
///
/// Name, return type and specifiers come from token events, told apart by
/// which constructs are open around the token. Parameters come from a
/// child [`ParamTypePolicy`] that is attached for the duration of the
/// parameter list and reports each parameter back to this policy.
///
/// A signature is published when the function body opens, or when a
/// declaration without a body closes.
pub struct FunctionSignaturePolicy {
    listener: ListenerState,
    events: EventTable<Self>,
    publisher: PolicyDispatcher<SignatureData>,
    param_policy: Rc<RefCell<ParamTypePolicy>>,
    param_listener: ListenerHandle,
    data: SignatureData,
    current_specifier: String,
    pending: bool,
}

impl FunctionSignaturePolicy {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|this: &Weak<RefCell<Self>>| {
            let param_policy = Rc::new(RefCell::new(ParamTypePolicy::new()));
            let observer: ObserverRef<ParamData> = this.clone();
            param_policy.borrow_mut().publisher_mut().add_observer_ref(observer);

            let mut events = EventTable::new();
            events
                .on_open(Function, Self::on_function_open)
                .on_open(FunctionDecl, Self::on_function_open)
                .on_open(ParameterList, Self::on_parameter_list_open)
                .on_close(ParameterList, Self::on_parameter_list_close)
                .on_open(FunctionBlock, Self::on_body_open)
                .on_open(Block, Self::on_body_open)
                .on_close(FunctionDecl, Self::on_declaration_close)
                .on_close(Function, Self::on_function_close)
                .on_close(TokenString, Self::on_token)
                .on_close(Specifier, Self::on_specifier_close);

            RefCell::new(Self {
                listener: ListenerState::new(),
                events,
                publisher: PolicyDispatcher::new(),
                param_listener: ListenerHandle::from(param_policy.clone()),
                param_policy,
                data: SignatureData::default(),
                current_specifier: String::new(),
                pending: false,
            })
        })
    }

    /// Creates the policy with observers already registered.
    pub fn with_observers<O: PolicyObserver<SignatureData> + 'static>(
        observers: &[Rc<RefCell<O>>],
    ) -> Rc<RefCell<Self>> {
        let policy = Self::new();
        for observer in observers {
            policy.borrow_mut().add_observer(observer);
        }
        policy
    }

    pub fn add_observer<O: PolicyObserver<SignatureData> + 'static>(
        &mut self,
        observer: &Rc<RefCell<O>>,
    ) {
        self.publisher.add_observer(observer);
    }

    pub fn remove_observer<O: PolicyObserver<SignatureData> + 'static>(
        &mut self,
        observer: &Rc<RefCell<O>>,
    ) -> Result<(), PolicyError> {
        self.publisher.remove_observer(observer)
    }

    /// The child collecting parameters.
    pub fn param_policy(&self) -> &Rc<RefCell<ParamTypePolicy>> {
        &self.param_policy
    }

    /// Inside a function head: a function is open but its body is not.
    fn in_head(ctx: &ParseContext) -> bool {
        ctx.or(&[Function, FunctionDecl]) && ctx.is_closed(FunctionBlock)
    }

    fn is_outermost_head(ctx: &ParseContext) -> bool {
        Self::in_head(ctx) && ctx.count(Function) + ctx.count(FunctionDecl) == 1
    }

    fn on_function_open(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        if !Self::is_outermost_head(ctx) {
            return Ok(());
        }
        self.data.clear();
        self.current_specifier.clear();
        self.data.line_number = ctx.current_line_number;
        self.data.is_method = ctx.or(&[ClassN, StructN]);
        self.pending = true;
        Ok(())
    }

    fn on_parameter_list_open(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        if !Self::is_outermost_head(ctx) || ctx.count(ParameterList) != 1 {
            return Ok(());
        }
        self.data.line_number = ctx.current_line_number;
        ctx.add_listener(self.param_listener.clone());
        Ok(())
    }

    fn on_parameter_list_close(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        if ctx.count(ParameterList) != 1 || !ctx.is_registered(&self.param_listener) {
            return Ok(());
        }
        ctx.remove_listener(&self.param_listener)
    }

    fn on_body_open(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        if ctx.count(FunctionBlock) == 1 {
            self.publish(ctx)?;
        }
        Ok(())
    }

    fn on_declaration_close(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        if ctx.count(FunctionDecl) == 1 {
            self.publish(ctx)?;
        }
        Ok(())
    }

    fn on_function_close(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        if ctx.count(Function) == 1 && self.pending {
            debug!(
                "function {} closed without a body, dropping it",
                self.data.function_name
            );
            self.pending = false;
            self.data.clear();
        }
        Ok(())
    }

    fn on_token(&mut self, ctx: &mut EventContext) -> DispatchResult<()> {
        if !self.pending || !Self::in_head(ctx) {
            return Ok(());
        }
        let token = ctx.current_token.as_str();
        if ctx.is_open(Name) && ctx.nor(&[Type, ParameterList, GenericArgumentList]) {
            self.data.function_name = token.to_string();
        }
        if ctx.and(&[Name, Type]) && ctx.nor(&[ParameterList, GenericArgumentList]) {
            append_token(&mut self.data.return_type, token);
        }
        if ctx.and(&[Modifier, Type]) && ctx.nor(&[ParameterList, GenericArgumentList]) {
            self.data.return_type_modifier = token.to_string();
        }
        if ctx.is_open(Specifier) && ctx.nor(&[Type, ParameterList, GenericArgumentList]) {
            self.current_specifier = token.to_string();
        }
        Ok(())
    }

    fn on_specifier_close(&mut self, _ctx: &mut EventContext) -> DispatchResult<()> {
        match self.current_specifier.as_str() {
            "const" => self.data.is_const = true,
            "static" => self.data.is_static = true,
            _ => {}
        }
        self.current_specifier.clear();
        Ok(())
    }

    fn publish(&mut self, ctx: &EventContext) -> DispatchResult<()> {
        if !self.pending {
            return Ok(());
        }
        debug!(
            "publish signature {} at line {}",
            self.data.function_name, self.data.line_number
        );
        let this: &Self = self;
        this.publisher.notify_all(this, ctx.state())?;
        self.pending = false;
        self.data.clear();
        Ok(())
    }
}

impl PolicyData<SignatureData> for FunctionSignaturePolicy {
    fn data(&self) -> SignatureData {
        self.data.clone()
    }
}

impl PolicyObserver<ParamData> for FunctionSignaturePolicy {
    fn notify(&mut self, policy: &dyn PolicyData<ParamData>, _ctx: &ParseContext) -> DispatchResult<()> {
        self.data.parameters.push(policy.data());
        Ok(())
    }
}

impl EventListener for FunctionSignaturePolicy {
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
