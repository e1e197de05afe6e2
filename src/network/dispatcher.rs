use log::error;
use std::sync::Mutex;

/// Callback for one inbound payload: `(sender name, raw bytes)`
pub type Handler = Box<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Registered inbound-message handlers, shared by every connection.
///
/// Registration and dispatch take the same lock, so a handler never races a
/// registration, and a slow handler holds up every connection's delivery.
/// Handlers must not call [`Dispatcher::register`].
#[derive(Default)]
pub struct Dispatcher {
    handlers: Mutex<Vec<Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Handler) {
        match self.handlers.lock() {
            Ok(mut handlers) => handlers.push(handler),
            Err(_) => error!("Failed to acquire lock on handler registry"),
        }
    }

    /// Deliver a payload to every handler in registration order
    pub fn dispatch(&self, from: &str, data: &[u8]) {
        match self.handlers.lock() {
            Ok(handlers) => {
                for handler in handlers.iter() {
                    handler(from, data);
                }
            }
            Err(_) => error!("Failed to acquire lock on handler registry"),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
