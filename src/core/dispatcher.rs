use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;

/// Event payloads are JSON values so handlers across extensions can share
/// one signature without a type parameter per event.
pub type EventPayload = Value;

pub type Handler =
    Arc<dyn Fn(EventPayload) -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// Opaque handle returned on registration, used to unregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct BlockingEntry {
    id: HandlerId,
    priority: i64,
    handler: Handler,
}

#[derive(Default)]
struct EventHandlers {
    /// Kept sorted ascending by priority.
    blocking: Vec<BlockingEntry>,
    concurrent: Vec<(HandlerId, Handler)>,
}

/// Dispatches events through an async handler system.
///
/// Blocking handlers run first, in priority order (lower first, negatives
/// allowed). A blocking handler returning `true` marks the event handled
/// and cancels all further dispatch. Remaining handlers then run
/// concurrently with their return values ignored.
#[derive(Default)]
pub struct Dispatcher {
    events: HashMap<String, EventHandlers>,
    next_id: u64,
}

/// Wrap an async closure into the shared handler type.
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(EventPayload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |payload| Box::pin(f(payload)))
}

impl Dispatcher {
    pub fn new(event_names: &[&str]) -> Self {
        let mut dispatcher = Self::default();
        dispatcher.register_events(event_names);
        dispatcher
    }

    /// Declare event names up front. Dispatching or registering against an
    /// undeclared name still works but logs a warning, since it is far more
    /// likely to be a typo than intentional.
    pub fn register_events(&mut self, event_names: &[&str]) {
        for name in event_names {
            self.events.entry((*name).to_string()).or_default();
        }
    }

    pub fn known_events(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    fn allocate_id(&mut self) -> HandlerId {
        self.next_id += 1;
        HandlerId(self.next_id)
    }

    fn entry_for(&mut self, event_name: &str, context: &str) -> &mut EventHandlers {
        if !self.events.contains_key(event_name) {
            tracing::warn!(
                "Handler {} for event '{}' which was never declared",
                context,
                event_name
            );
            self.events.insert(event_name.to_string(), EventHandlers::default());
        }
        self.events.get_mut(event_name).unwrap()
    }

    /// Register a concurrent handler. It runs after all blocking handlers,
    /// and its return value has no effect on dispatch.
    pub fn register(&mut self, event_name: &str, handler: Handler) -> HandlerId {
        let id = self.allocate_id();
        tracing::debug!("Registering handler {:?} for event '{}'", id, event_name);
        self.entry_for(event_name, "registered").concurrent.push((id, handler));
        id
    }

    /// Register a blocking handler at the given priority. Lower priorities
    /// run first; a new handler with an equal priority runs before the
    /// handlers already registered at it.
    pub fn register_blocking(
        &mut self,
        event_name: &str,
        priority: i64,
        handler: Handler,
    ) -> HandlerId {
        let id = self.allocate_id();
        tracing::debug!(
            "Registering blocking handler {:?} for event '{}', priority {}",
            id,
            event_name,
            priority
        );
        let entry = self.entry_for(event_name, "registered");
        let index = entry.blocking.partition_point(|e| e.priority < priority);
        entry.blocking.insert(index, BlockingEntry { id, priority, handler });
        id
    }

    /// Remove a handler from every event it is registered on. Removing an
    /// id that was already unregistered is a no-op.
    pub fn unregister(&mut self, id: HandlerId) {
        for handlers in self.events.values_mut() {
            handlers.blocking.retain(|entry| entry.id != id);
            handlers.concurrent.retain(|(handler_id, _)| *handler_id != id);
        }
    }

    pub fn unregister_from(&mut self, id: HandlerId, event_name: &str) {
        match self.events.get_mut(event_name) {
            Some(handlers) => {
                handlers.blocking.retain(|entry| entry.id != id);
                handlers.concurrent.retain(|(handler_id, _)| *handler_id != id);
            }
            None => {
                tracing::warn!(
                    "Attempted to unregister {:?} from event '{}' which was never declared",
                    id,
                    event_name
                );
            }
        }
    }

    /// Trigger dispatch of an event, handing each handler its own clone of
    /// the payload.
    pub async fn dispatch(&mut self, event_name: &str, payload: EventPayload) {
        if !self.events.contains_key(event_name) {
            tracing::warn!(
                "Undeclared event '{}' was dispatched to no handlers with data: {}",
                event_name,
                payload
            );
            self.events.insert(event_name.to_string(), EventHandlers::default());
            return;
        }

        // Clone the handler lists so handlers may re-enter the dispatcher.
        let handlers = &self.events[event_name];
        let blocking: Vec<Handler> = handlers.blocking.iter().map(|e| e.handler.clone()).collect();
        let concurrent: Vec<Handler> =
            handlers.concurrent.iter().map(|(_, h)| h.clone()).collect();

        for handler in blocking {
            if handler(payload.clone()).await {
                tracing::trace!("Event '{}' handled, cancelling further dispatch", event_name);
                return;
            }
        }

        let mut set = JoinSet::new();
        for handler in concurrent {
            set.spawn(handler(payload.clone()));
        }
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                tracing::error!("Handler for event '{}' panicked: {}", event_name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder(log: Arc<Mutex<Vec<&'static str>>>, tag: &'static str, handled: bool) -> Handler {
        handler(move |_payload| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(tag);
                handled
            }
        })
    }

    #[tokio::test]
    async fn test_concurrent_handler_receives_payload() {
        let mut dispatcher = Dispatcher::new(&["message"]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        dispatcher.register(
            "message",
            handler(move |payload| {
                let seen = seen_clone.clone();
                async move {
                    seen.lock().unwrap().push(payload);
                    false
                }
            }),
        );

        dispatcher.dispatch("message", json!({"content": "hi"})).await;
        assert_eq!(*seen.lock().unwrap(), vec![json!({"content": "hi"})]);
    }

    #[tokio::test]
    async fn test_blocking_handlers_run_in_priority_order() {
        let mut dispatcher = Dispatcher::new(&["message"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.register_blocking("message", 10, recorder(log.clone(), "ten", false));
        dispatcher.register_blocking("message", -5, recorder(log.clone(), "minus five", false));
        dispatcher.register_blocking("message", 3, recorder(log.clone(), "three", false));

        dispatcher.dispatch("message", json!(null)).await;
        assert_eq!(*log.lock().unwrap(), vec!["minus five", "three", "ten"]);
    }

    #[tokio::test]
    async fn test_equal_priority_inserts_before_existing() {
        let mut dispatcher = Dispatcher::new(&["message"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.register_blocking("message", 0, recorder(log.clone(), "first", false));
        dispatcher.register_blocking("message", 0, recorder(log.clone(), "second", false));

        dispatcher.dispatch("message", json!(null)).await;
        assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_handled_event_cancels_further_dispatch() {
        let mut dispatcher = Dispatcher::new(&["message"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.register_blocking("message", 0, recorder(log.clone(), "cancels", true));
        dispatcher.register_blocking("message", 1, recorder(log.clone(), "blocked", false));
        dispatcher.register("message", recorder(log.clone(), "concurrent", false));

        dispatcher.dispatch("message", json!(null)).await;
        assert_eq!(*log.lock().unwrap(), vec!["cancels"]);
    }

    #[tokio::test]
    async fn test_concurrent_handlers_all_run() {
        let mut dispatcher = Dispatcher::new(&["message"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.register("message", recorder(log.clone(), "a", false));
        // Return value of concurrent handlers is ignored.
        dispatcher.register("message", recorder(log.clone(), "b", true));
        dispatcher.register("message", recorder(log.clone(), "c", false));

        dispatcher.dispatch("message", json!(null)).await;
        let mut calls = log.lock().unwrap().clone();
        calls.sort_unstable();
        assert_eq!(calls, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unregister_removes_handler_everywhere() {
        let mut dispatcher = Dispatcher::new(&["message", "typing"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = dispatcher.register("message", recorder(log.clone(), "gone", false));
        dispatcher.register("message", recorder(log.clone(), "stays", false));
        dispatcher.unregister(id);

        dispatcher.dispatch("message", json!(null)).await;
        assert_eq!(*log.lock().unwrap(), vec!["stays"]);
    }

    #[tokio::test]
    async fn test_unregister_from_is_scoped_to_one_event() {
        let mut dispatcher = Dispatcher::new(&["message", "typing"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = dispatcher.register("message", recorder(log.clone(), "message", false));

        // Aimed at an event the handler is not on, nothing is removed.
        dispatcher.unregister_from(id, "typing");
        dispatcher.dispatch("message", json!(null)).await;
        assert_eq!(*log.lock().unwrap(), vec!["message"]);

        // Aimed at the right event, the handler is gone.
        dispatcher.unregister_from(id, "message");
        dispatcher.dispatch("message", json!(null)).await;
        assert_eq!(*log.lock().unwrap(), vec!["message"]);
    }

    #[tokio::test]
    async fn test_unregister_from_unknown_event_continues() {
        let mut dispatcher = Dispatcher::new(&["message"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = dispatcher.register("message", recorder(log.clone(), "ran", false));
        dispatcher.unregister_from(id, "never_declared");

        // The handler survives an unregister aimed at an unknown event.
        dispatcher.dispatch("message", json!(null)).await;
        assert_eq!(*log.lock().unwrap(), vec!["ran"]);
        assert!(!dispatcher.known_events().any(|name| name == "never_declared"));
    }

    #[tokio::test]
    async fn test_undeclared_dispatch_creates_event() {
        let mut dispatcher = Dispatcher::new(&[]);
        dispatcher.dispatch("surprise", json!(null)).await;
        assert!(dispatcher.known_events().any(|name| name == "surprise"));
    }

    #[tokio::test]
    async fn test_register_against_undeclared_event_still_fires() {
        let mut dispatcher = Dispatcher::new(&[]);
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.register("typo_prone", recorder(log.clone(), "ran", false));
        dispatcher.dispatch("typo_prone", json!(null)).await;
        assert_eq!(*log.lock().unwrap(), vec!["ran"]);
    }
}
