//! # sax-dispatch: event dispatch over streamed syntax constructs
//!
//! A scanner walking a serialized syntax tree reports every construct it
//! enters and leaves as an open or close event. This crate turns that flat
//! stream into something listeners can reason about.
//!
//! ## Layers
//!
//! ### 1. Parse state
//! - Construct kinds and event phases ([`construct`])
//! - Per-kind nesting counters and the query algebra ([`context`])
//!
//! ### 2. Dispatch
//! - Listener trait and per-kind handler tables ([`listener`])
//! - Registry and the once-per-cycle delivery protocol ([`dispatcher`])
//! - Producer-side event streams ([`source`])
//!
//! ### 3. Policies
//! - Typed result propagation between listeners ([`policy`])
//! - Function signature and parameter extraction ([`policies`])
//!
//! ### 4. Ambient
//! - Errors ([`error`]) and configuration ([`config`])
//!
//! ## Example
//!
//! ```
//! use sax_dispatch::{
//!     ConstructKind::*, EventContext, EventScript, FunctionSignaturePolicy, ListenerHandle,
//!     SignatureCollector,
//! };
//!
//! let collector = SignatureCollector::shared();
//! let policy = FunctionSignaturePolicy::with_observers(&[collector.clone()]);
//!
//! let mut ctx = EventContext::new();
//! ctx.add_listener(ListenerHandle::from(policy));
//! ctx.replay(
//!     EventScript::new()
//!         .open(Function)
//!         .open(Type)
//!         .wrapped_token(Name, "int")
//!         .close(Type)
//!         .wrapped_token(Name, "foo")
//!         .open(ParameterList)
//!         .close(ParameterList)
//!         .open(FunctionBlock)
//!         .close(FunctionBlock)
//!         .close(Function),
//! )
//! .unwrap();
//!
//! let signatures = collector.borrow_mut().take();
//! assert_eq!(signatures[0].function_name, "foo");
//! ```

pub mod config;
pub mod construct;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod policies;
pub mod policy;
pub mod source;

// Re-exports
pub use config::DispatchConfig;
pub use construct::{ConstructKind, Phase, CONSTRUCT_COUNT};
pub use context::{FileInfo, ParseContext};
pub use dispatcher::{EventContext, InFlight};
pub use error::*;
pub use listener::{EventListener, EventTable, Handler, ListenerHandle, ListenerState};
pub use policies::{
    FunctionSignaturePolicy, ParamData, ParamTypePolicy, SignatureCollector, SignatureData,
};
pub use policy::{ObserverRef, PolicyCollector, PolicyData, PolicyDispatcher, PolicyObserver};
pub use source::{EventScript, SourceEvent};
