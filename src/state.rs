use crate::directory::Directory;
use crate::engine::locks::RideLocks;
use crate::notify::ConnectionRegistry;
use crate::observability::metrics::Metrics;
use crate::store::Repository;

pub struct AppState {
    pub store: Repository,
    pub directory: Directory,
    pub notifier: ConnectionRegistry,
    pub ride_locks: RideLocks,
    pub metrics: Metrics,
    /// Shared secret the payment collaborator presents on status callbacks.
    /// Callbacks are refused while unset.
    pub payment_callback_token: Option<String>,
}

impl AppState {
    pub fn new(notification_buffer_size: usize) -> Self {
        Self {
            store: Repository::new(),
            directory: Directory::new(),
            notifier: ConnectionRegistry::new(notification_buffer_size),
            ride_locks: RideLocks::new(),
            metrics: Metrics::new(),
            payment_callback_token: None,
        }
    }

    pub fn with_payment_callback_token(mut self, token: Option<String>) -> Self {
        self.payment_callback_token = token;
        self
    }
}
