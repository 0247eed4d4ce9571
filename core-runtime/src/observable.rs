//! # Observable Properties
//!
//! Change-notifying fields for view-model style objects.
//!
//! ## Overview
//!
//! A notifiable object implements [`PropertyNotifier`]. Each observable field
//! is an [`ObservableProperty<T>`] created while the object is constructed:
//! it owns a hidden storage slot and exposes a `get`/`set` pair. `set` stores
//! the value and then synchronously calls `notify` on the owner, but only if
//! the value actually changed.
//!
//! [`Observable`] is the stock notifier: it has a name, an ordered list of
//! listeners, optional forwarding onto the [`EventBus`], and a batch mode that
//! holds notifications back until a group of related writes has landed.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::observable::{Observable, PropertyValue};
//! use std::sync::{Arc, Mutex};
//!
//! let model = Observable::new("audio_demo");
//! let is_playing = model.property("is_playing", false);
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! model.on_property_change(move |event| {
//!     sink.lock().unwrap().push(event.value.clone());
//! });
//!
//! assert!(is_playing.set(true));
//! assert!(!is_playing.set(true)); // unchanged, no notification
//! assert_eq!(*seen.lock().unwrap(), vec![PropertyValue::Bool(true)]);
//! ```

use crate::events::{CoreEvent, EventBus};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Event name carried by every property change notification.
pub const PROPERTY_CHANGE_EVENT: &str = "propertyChange";

/// Type-erased value carried in a change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Null)
    }
}

/// Payload delivered to listeners after a property changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChangeEvent {
    /// Always [`PROPERTY_CHANGE_EVENT`].
    pub event_name: String,
    pub property_name: String,
    /// Name of the object that owns the property.
    pub object: String,
    /// The value now stored.
    pub value: PropertyValue,
}

impl PropertyChangeEvent {
    pub fn new(
        object: impl Into<String>,
        property_name: impl Into<String>,
        value: PropertyValue,
    ) -> Self {
        Self {
            event_name: PROPERTY_CHANGE_EVENT.to_string(),
            property_name: property_name.into(),
            object: object.into(),
            value,
        }
    }
}

/// Capability of an object that can own observable properties.
pub trait PropertyNotifier: Send + Sync {
    /// Identity reported in the `object` field of change events.
    fn object_name(&self) -> &str;

    /// Deliver a change notification. Called after the new value is stored.
    fn notify(&self, event: PropertyChangeEvent);
}

/// A named field whose writes notify its owner when the value changes.
pub struct ObservableProperty<T> {
    key: String,
    slot: Mutex<T>,
    notifier: Arc<dyn PropertyNotifier>,
}

impl<T> ObservableProperty<T>
where
    T: Clone + PartialEq + Into<PropertyValue>,
{
    /// Attach a property named `key` to `notifier`. The initial value is
    /// stored silently.
    pub fn new(key: impl Into<String>, initial: T, notifier: Arc<dyn PropertyNotifier>) -> Self {
        Self {
            key: key.into(),
            slot: Mutex::new(initial),
            notifier,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last stored value.
    pub fn get(&self) -> T {
        self.slot.lock().clone()
    }

    /// Store `value` and notify the owner.
    ///
    /// Returns `false` without storing or notifying when `value` equals the
    /// stored value.
    pub fn set(&self, value: T) -> bool {
        {
            let mut slot = self.slot.lock();
            if *slot == value {
                return false;
            }
            *slot = value.clone();
        }

        self.notifier.notify(PropertyChangeEvent::new(
            self.notifier.object_name(),
            self.key.as_str(),
            value.into(),
        ));
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableProperty")
            .field("key", &self.key)
            .field("value", &*self.slot.lock())
            .finish()
    }
}

/// Identifier returned by [`Observable::on_property_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type PropertyListener = Arc<dyn Fn(&PropertyChangeEvent) + Send + Sync>;

/// An open batch on one thread.
struct OpenBatch {
    thread: ThreadId,
    depth: usize,
    pending: Vec<PropertyChangeEvent>,
}

#[derive(Default)]
struct BatchState {
    open: Vec<OpenBatch>,
}

struct ObservableInner {
    name: String,
    next_listener_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, PropertyListener)>>,
    batch: Mutex<BatchState>,
    event_bus: Option<EventBus>,
}

/// Stock [`PropertyNotifier`] with listener registration.
///
/// Cloning is cheap; clones share listeners and batch state.
#[derive(Clone)]
pub struct Observable {
    inner: Arc<ObservableInner>,
}

impl Observable {
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    /// Like [`Observable::new`], but every notification is also emitted on
    /// `bus` as [`CoreEvent::Property`].
    pub fn with_event_bus(name: impl Into<String>, bus: EventBus) -> Self {
        Self::build(name.into(), Some(bus))
    }

    fn build(name: String, event_bus: Option<EventBus>) -> Self {
        Self {
            inner: Arc::new(ObservableInner {
                name,
                next_listener_id: AtomicU64::new(1),
                listeners: RwLock::new(Vec::new()),
                batch: Mutex::new(BatchState::default()),
                event_bus,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Create a property owned by this object.
    pub fn property<T>(&self, key: impl Into<String>, initial: T) -> ObservableProperty<T>
    where
        T: Clone + PartialEq + Into<PropertyValue>,
    {
        ObservableProperty::new(key, initial, Arc::new(self.clone()))
    }

    /// Register a listener. Listeners run synchronously, in registration
    /// order, on the thread that performed the write.
    pub fn on_property_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PropertyChangeEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Run `f`, delivering any notifications it raises only after it returns.
    ///
    /// Nested batches flush when the outermost one ends. Notifications keep
    /// their original order.
    ///
    /// A batch only holds back writes made on the calling thread. Writes from
    /// other threads while it is open are delivered immediately.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let thread = thread::current().id();
        {
            let mut batch = self.inner.batch.lock();
            match batch.open.iter_mut().find(|open| open.thread == thread) {
                Some(open) => open.depth += 1,
                None => batch.open.push(OpenBatch {
                    thread,
                    depth: 1,
                    pending: Vec::new(),
                }),
            }
        }

        let result = f();

        let pending = {
            let mut batch = self.inner.batch.lock();
            match batch.open.iter().position(|open| open.thread == thread) {
                Some(index) => {
                    batch.open[index].depth -= 1;
                    if batch.open[index].depth == 0 {
                        batch.open.swap_remove(index).pending
                    } else {
                        Vec::new()
                    }
                }
                None => Vec::new(),
            }
        };
        for event in pending {
            self.dispatch(event);
        }
        result
    }

    fn dispatch(&self, event: PropertyChangeEvent) {
        // Snapshot so listeners may register or remove listeners re-entrantly.
        let listeners: Vec<PropertyListener> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&event);
        }

        if let Some(bus) = &self.inner.event_bus {
            bus.emit(CoreEvent::Property(event)).ok();
        }
    }
}

impl PropertyNotifier for Observable {
    fn object_name(&self) -> &str {
        &self.inner.name
    }

    fn notify(&self, event: PropertyChangeEvent) {
        {
            let thread = thread::current().id();
            let mut batch = self.inner.batch.lock();
            if let Some(open) = batch.open.iter_mut().find(|open| open.thread == thread) {
                open.pending.push(event);
                return;
            }
        }
        self.dispatch(event);
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.inner.name)
            .field("listener_count", &self.listener_count())
            .field("forwards_to_bus", &self.inner.event_bus.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recorder(observable: &Observable) -> Arc<StdMutex<Vec<PropertyChangeEvent>>> {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = events.clone();
        observable.on_property_change(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_equal_writes_notify_once() {
        let model = Observable::new("model");
        let volume = model.property("volume", 1.0_f32);
        let events = recorder(&model);

        assert!(volume.set(0.5));
        assert!(!volume.set(0.5));
        assert!(!volume.set(0.5));

        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_distinct_writes_notify_each_with_new_value() {
        let model = Observable::new("model");
        let remaining = model.property("remaining_ms", 0_u64);
        let events = recorder(&model);

        for value in [3000_u64, 2000, 1000, 0] {
            assert!(remaining.set(value));
        }

        let events = events.lock().unwrap();
        let values: Vec<f64> = events.iter().filter_map(|e| e.value.as_f64()).collect();
        assert_eq!(values, vec![3000.0, 2000.0, 1000.0, 0.0]);
        assert!(events.iter().all(|e| e.property_name == "remaining_ms"));
        assert!(events.iter().all(|e| e.object == "model"));
        assert!(events.iter().all(|e| e.event_name == PROPERTY_CHANGE_EVENT));
    }

    #[test]
    fn test_initial_value_is_silent() {
        let model = Observable::new("model");
        let events = recorder(&model);
        let flag = model.property("is_playing", false);

        assert!(!flag.get());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_observes_stored_value() {
        let model = Observable::new("model");
        let flag = Arc::new(model.property("is_playing", false));

        let observed = Arc::new(StdMutex::new(None));
        let reader = flag.clone();
        let slot = observed.clone();
        model.on_property_change(move |_| {
            *slot.lock().unwrap() = Some(reader.get());
        });

        flag.set(true);
        assert_eq!(*observed.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_fields_are_independent() {
        let model = Observable::new("model");
        let a = model.property("a", 1_u64);
        let b = model.property("b", 1_u64);
        let events = recorder(&model);

        a.set(2);
        assert_eq!(b.get(), 1);
        assert!(!b.set(1));
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let model = Observable::new("model");
        let flag = model.property("flag", false);
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        let id = model.on_property_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        flag.set(true);
        assert!(model.remove_listener(id));
        assert!(!model.remove_listener(id));
        flag.set(false);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(model.listener_count(), 0);
    }

    #[test]
    fn test_batch_defers_until_all_writes_stored() {
        let model = Observable::new("model");
        let state = Arc::new(model.property("state", "idle".to_string()));
        let playing = Arc::new(model.property("is_playing", false));

        let snapshots = Arc::new(StdMutex::new(Vec::new()));
        let (s, p, out) = (state.clone(), playing.clone(), snapshots.clone());
        model.on_property_change(move |_| {
            out.lock().unwrap().push((s.get(), p.get()));
        });

        model.batch(|| {
            state.set("playing".to_string());
            playing.set(true);
        });

        let snapshots = snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots
            .iter()
            .all(|(state, playing)| state == "playing" && *playing));
    }

    #[test]
    fn test_nested_batch_flushes_at_outermost() {
        let model = Observable::new("model");
        let flag = model.property("flag", 0_u64);
        let events = recorder(&model);

        model.batch(|| {
            flag.set(1);
            model.batch(|| {
                flag.set(2);
            });
            assert!(events.lock().unwrap().is_empty());
        });

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].value, PropertyValue::Number(2.0));
    }

    #[test]
    fn test_batch_does_not_hold_writes_from_other_threads() {
        let model = Observable::new("model");
        let state = model.property("state", "idle".to_string());
        let volume = model.property("volume", 1.0_f32);
        let events = recorder(&model);

        model.batch(|| {
            state.set("playing".to_string());
            thread::scope(|scope| {
                scope.spawn(|| volume.set(0.5));
            });

            let seen = events.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].property_name, "volume");
        });

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].property_name, "state");
    }

    #[test]
    fn test_custom_notifier() {
        struct Recorder {
            events: StdMutex<Vec<String>>,
        }

        impl PropertyNotifier for Recorder {
            fn object_name(&self) -> &str {
                "recorder"
            }

            fn notify(&self, event: PropertyChangeEvent) {
                self.events.lock().unwrap().push(event.property_name);
            }
        }

        let notifier = Arc::new(Recorder {
            events: StdMutex::new(Vec::new()),
        });
        let title = ObservableProperty::new("title", None::<String>, notifier.clone());

        title.set(Some("Fight Club".to_string()));
        title.set(None);

        assert_eq!(*notifier.events.lock().unwrap(), vec!["title", "title"]);
    }

    #[core_async::test]
    async fn test_changes_forwarded_to_event_bus() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let model = Observable::with_event_bus("session", bus);
        let flag = model.property("is_playing", false);

        flag.set(true);

        match rx.recv().await.unwrap() {
            CoreEvent::Property(event) => {
                assert_eq!(event.object, "session");
                assert_eq!(event.value, PropertyValue::Bool(true));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_property_value_serializes_untagged() {
        let event = PropertyChangeEvent::new("m", "speed", PropertyValue::from(1.5_f32));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["value"], 1.5);
        assert_eq!(json["event_name"], "propertyChange");
        assert_eq!(PropertyValue::from(None::<u64>), PropertyValue::Null);
    }
}
