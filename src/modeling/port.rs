use crate::errors::UnobservablePortError;
use crate::observation::{Observer, ObserverEvent, ObserverEventKind, ObserverTable};
use crate::time::{Duration, TimePoint};
use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::fmt::{Debug, Display, Formatter, Result};
use std::marker::PhantomData;
use std::rc::Rc;

/// Type-erased interface to a port and its message bag.
pub trait AbstractPort: Debug {
    /// Returns the name of the port.
    fn get_name(&self) -> &str;

    /// Port upcasted to [`Any`] for type compatibility checks.
    fn as_any(&self) -> &dyn Any;

    /// Returns true if the port holds no messages.
    fn is_empty(&self) -> bool;

    /// Removes all the messages from the port.
    fn clear(&self);

    /// Returns true if `other` carries messages of the same type.
    fn is_compatible(&self, other: &dyn AbstractPort) -> bool;

    /// Appends all the messages of the port to `other`.
    /// It panics if the ports are incompatible.
    fn propagate(&self, other: &dyn AbstractPort);

    /// Marks the port as not externally observable.
    fn set_unobservable(&self);

    fn is_observable(&self) -> bool;

    /// Attaches an observer for the values flowing through the port.
    /// Ports of unobservable classes reject the attachment.
    fn attach_observer(
        &self,
        observer: Box<dyn Observer>,
    ) -> std::result::Result<(), UnobservablePortError>;

    /// Notifies the attached observers with the current message bag.
    fn notify_observers(&self, time: &TimePoint, elapsed: Duration);
}

/// Message buffer shared between a model and the couplings that read it.
#[derive(Debug)]
pub struct RawPort<T> {
    name: String,
    values: RefCell<Vec<T>>,
    observable: Cell<bool>,
    observers: RefCell<ObserverTable>,
}

impl<T> RawPort<T> {
    pub(crate) fn new(name: &str, observable: bool) -> Self {
        Self {
            name: name.to_string(),
            values: RefCell::new(Vec::new()),
            observable: Cell::new(observable),
            observers: RefCell::new(ObserverTable::default()),
        }
    }

    pub(crate) fn add_value(&self, value: T) {
        self.values.borrow_mut().push(value);
    }

    pub(crate) fn get_values(&self) -> Ref<'_, Vec<T>> {
        self.values.borrow()
    }
}

impl<T: Clone> RawPort<T> {
    pub(crate) fn add_values(&self, values: &[T]) {
        self.values.borrow_mut().extend_from_slice(values);
    }
}

impl<T: 'static + Clone + Debug> AbstractPort for RawPort<T> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    fn clear(&self) {
        self.values.borrow_mut().clear();
    }

    fn is_compatible(&self, other: &dyn AbstractPort) -> bool {
        other.as_any().downcast_ref::<RawPort<T>>().is_some()
    }

    fn propagate(&self, other: &dyn AbstractPort) {
        let destination = other
            .as_any()
            .downcast_ref::<RawPort<T>>()
            .expect("ports are incompatible");
        destination
            .values
            .borrow_mut()
            .extend(self.values.borrow().iter().cloned());
    }

    fn set_unobservable(&self) {
        self.observable.set(false);
    }

    fn is_observable(&self) -> bool {
        self.observable.get()
    }

    fn attach_observer(
        &self,
        observer: Box<dyn Observer>,
    ) -> std::result::Result<(), UnobservablePortError> {
        if !self.observable.get() {
            return Err(UnobservablePortError {
                port: self.name.clone(),
            });
        }
        self.observers.borrow_mut().attach(observer);
        Ok(())
    }

    fn notify_observers(&self, time: &TimePoint, elapsed: Duration) {
        let mut observers = self.observers.borrow_mut();
        if observers.is_empty() {
            return;
        }
        let event = ObserverEvent {
            kind: ObserverEventKind::Output,
            time: time.clone(),
            elapsed,
            payload: Some(format!("{:?}", self.values.borrow())),
        };
        observers.notify_all(&event);
    }
}

impl<T: 'static + Clone + Debug> Display for RawPort<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.name)
    }
}

/// Marker for the input direction of a [`Port`].
#[derive(Debug)]
pub struct Input;

/// Marker for the output direction of a [`Port`].
#[derive(Debug)]
pub struct Output;

/// Typed handle to a port of a model. The direction marker statically selects
/// what the holder may do with it: input ports are read, output ports are
/// written and observed.
#[derive(Debug)]
pub struct Port<D, T>(pub(crate) Rc<RawPort<T>>, PhantomData<D>);

impl<D, T> Port<D, T> {
    pub(crate) fn new(port: Rc<RawPort<T>>) -> Self {
        Self(port, PhantomData)
    }

    /// Returns the name of the port.
    pub fn get_name(&self) -> &str {
        &self.0.name
    }
}

impl<D, T> Clone for Port<D, T> {
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<T> Port<Input, T> {
    /// Returns true if the port received no messages this cycle.
    pub fn is_empty(&self) -> bool {
        self.0.get_values().is_empty()
    }

    /// Messages delivered to the port this cycle.
    pub fn get_values(&self) -> Ref<'_, Vec<T>> {
        self.0.get_values()
    }
}

impl<T> Port<Output, T> {
    /// Appends a value to the port's message bag.
    pub fn add_value(&self, value: T) {
        self.0.add_value(value);
    }

    /// Appends a slice of values to the port's message bag.
    pub fn add_values(&self, values: &[T])
    where
        T: Clone,
    {
        self.0.add_values(values);
    }
}

impl<T: 'static + Clone + Debug> Port<Output, T> {
    /// Attaches an observer for the values the port emits. Only output ports
    /// of atomic models are externally observable.
    pub fn observe(
        &self,
        observer: impl Observer + 'static,
    ) -> std::result::Result<(), UnobservablePortError> {
        self.0.attach_observer(Box::new(observer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation() {
        let from = RawPort::<i32>::new("from", true);
        let to = RawPort::<i32>::new("to", false);
        from.add_value(1);
        from.add_values(&[2, 3]);
        from.propagate(&to);
        assert_eq!(*to.get_values(), [1, 2, 3]);
        assert_eq!(*from.get_values(), [1, 2, 3]);

        from.clear();
        assert!(from.is_empty());
        assert!(!to.is_empty());
    }

    #[test]
    #[should_panic(expected = "ports are incompatible")]
    fn test_incompatible_propagation() {
        let from = RawPort::<i32>::new("from", true);
        let to = RawPort::<i64>::new("to", false);
        assert!(!AbstractPort::is_compatible(&from, &to));
        from.propagate(&to);
    }

    #[test]
    fn test_unobservable_port() {
        let port = RawPort::<i32>::new("port", true);
        port.set_unobservable();
        let result = port.attach_observer(Box::new(
            |_: &ObserverEvent| -> std::result::Result<(), crate::observation::ObserverError> {
                Ok(())
            },
        ));
        assert!(result.is_err());
    }
}
