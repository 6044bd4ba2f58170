//! Observer registry owned by a provider. Readers subscribe to a resource
//! identifier and get a channel that receives a [`ChangeEvent`] after each
//! committed write touching that resource.

use std::sync::Mutex;

use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::trace;

/// Signal that the data behind `uri` changed and readers should re-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub uri: String,
}

struct Observer {
    uri: String,
    descendants: bool,
    sender: Sender<ChangeEvent>,
}

impl Observer {
    fn wants(&self, uri: &str) -> bool {
        if uri == self.uri {
            return true;
        }
        self.descendants
            && uri
                .strip_prefix(self.uri.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[derive(Default)]
pub struct ChangeNotifier {
    observers: Mutex<Vec<Observer>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `uri`. With `descendants` set, changes to identifiers beneath it
    /// (for example a single book under the collection) are delivered too.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self, uri: &str, descendants: bool) -> Receiver<ChangeEvent> {
        let (sender, receiver) = unbounded();
        let mut observers = self
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        observers.push(Observer {
            uri: uri.to_string(),
            descendants,
            sender,
        });
        receiver
    }

    /// Deliver one event for `uri` to every interested observer. Observers
    /// whose receivers are gone are pruned when a send to them fails.
    pub fn notify_change(&self, uri: &str) {
        let mut observers = self
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        observers.retain(|observer| {
            if !observer.wants(uri) {
                return true;
            }
            observer
                .sender
                .send(ChangeEvent {
                    uri: uri.to_string(),
                })
                .is_ok()
        });
        trace!(uri, observers = observers.len(), "change notified");
    }

    /// Number of live subscriptions, mostly useful in tests.
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
