//! Typed result propagation between policies.
//!
//! A policy is a listener that accumulates a result while events flow and
//! publishes it when its bounding construct completes. Publishing goes
//! through a [`PolicyDispatcher`], which notifies every registered
//! [`PolicyObserver`]; each observer pulls an owned snapshot through
//! [`PolicyData::data`] and merges it into its own state.
//!
//! ```text
//! ParamTypePolicy ──notify──▶ FunctionSignaturePolicy ──notify──▶ PolicyCollector
//!   (ParamData)                 (SignatureData)
//! ```

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use crate::{
    context::ParseContext,
    error::{DispatchResult, PolicyError},
};

/// Snapshot accessor of a policy producing `T`.
///
/// Every call returns a fresh value; later changes to the policy's
/// accumulator never show through an earlier snapshot.
pub trait PolicyData<T> {
    fn data(&self) -> T;
}

/// Receiver of completed policy results.
pub trait PolicyObserver<T> {
    fn notify(&mut self, policy: &dyn PolicyData<T>, ctx: &ParseContext) -> DispatchResult<()>;
}

pub type ObserverRef<T> = Weak<RefCell<dyn PolicyObserver<T>>>;

/// Observer list of a policy.
///
/// Observers are held weakly: a parent policy usually owns its child and
/// observes it at the same time, and the child must not keep the parent
/// alive. Observers that have been dropped are skipped and pruned.
pub struct PolicyDispatcher<T> {
    observers: Vec<ObserverRef<T>>,
}

impl<T: 'static> Default for PolicyDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for PolicyDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyDispatcher")
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn same_observer<T>(a: &ObserverRef<T>, b: &ObserverRef<T>) -> bool {
    Weak::as_ptr(a) as *const () == Weak::as_ptr(b) as *const ()
}

impl<T: 'static> PolicyDispatcher<T> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn add_observer<O: PolicyObserver<T> + 'static>(&mut self, observer: &Rc<RefCell<O>>) {
        let observer: ObserverRef<T> = Rc::downgrade(observer) as Weak<RefCell<dyn PolicyObserver<T>>>;
        self.add_observer_ref(observer);
    }

    pub fn add_observer_ref(&mut self, observer: ObserverRef<T>) {
        self.prune();
        self.observers.push(observer);
    }

    pub fn remove_observer<O: PolicyObserver<T> + 'static>(
        &mut self,
        observer: &Rc<RefCell<O>>,
    ) -> Result<(), PolicyError> {
        let observer: ObserverRef<T> = Rc::downgrade(observer) as Weak<RefCell<dyn PolicyObserver<T>>>;
        self.remove_observer_ref(&observer)
    }

    pub fn remove_observer_ref(&mut self, observer: &ObserverRef<T>) -> Result<(), PolicyError> {
        self.prune();
        let index = self
            .observers
            .iter()
            .position(|registered| same_observer(registered, observer))
            .ok_or(PolicyError::ObserverNotRegistered)?;
        self.observers.remove(index);
        Ok(())
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .iter()
            .filter(|observer| observer.strong_count() > 0)
            .count()
    }

    fn prune(&mut self) {
        self.observers.retain(|observer| observer.strong_count() > 0);
    }

    /// Notifies every live observer in registration order.
    ///
    /// Iterates over a copy of the list, so an observer may change the
    /// registrations of this policy while being notified.
    pub fn notify_all(&self, source: &dyn PolicyData<T>, ctx: &ParseContext) -> DispatchResult<()> {
        let observers = self.observers.clone();
        for observer in observers {
            let Some(observer) = observer.upgrade() else {
                continue;
            };
            let mut observer = observer
                .try_borrow_mut()
                .map_err(|_| PolicyError::ObserverBusy)?;
            observer.notify(source, ctx)?;
        }
        Ok(())
    }
}

/// Observer that keeps every result it is notified of.
#[derive(Debug, Clone)]
pub struct PolicyCollector<T> {
    items: Vec<T>,
}

impl<T> Default for PolicyCollector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PolicyCollector<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn take(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }
}

impl<T> PolicyObserver<T> for PolicyCollector<T> {
    fn notify(&mut self, policy: &dyn PolicyData<T>, _ctx: &ParseContext) -> DispatchResult<()> {
        self.items.push(policy.data());
        Ok(())
    }
}
