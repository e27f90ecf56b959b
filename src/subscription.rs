use std::collections::HashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Live gateway subscriptions owned by one controller.
///
/// Each subscription is a cancellation token watched by the task forwarding
/// its events. Releasing cancels the token; dropping the registry releases
/// whatever is still registered.
#[derive(Debug, Default)]
pub struct Subscriptions {
    next_id: u64,
    live: HashMap<SubscriptionId, (String, CancellationToken)>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, label: impl Into<String>) -> (SubscriptionId, CancellationToken) {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let token = CancellationToken::new();
        let label = label.into();
        log::debug!("subscriptions: acquired {} ({})", id, label);
        self.live.insert(id, (label, token.clone()));
        (id, token)
    }

    /// Returns false if the id was already released
    pub fn release(&mut self, id: SubscriptionId) -> bool {
        match self.live.remove(&id) {
            Some((label, token)) => {
                token.cancel();
                log::debug!("subscriptions: released {} ({})", id, label);
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        for (id, (label, token)) in self.live.drain() {
            token.cancel();
            log::debug!("subscriptions: released {} ({})", id, label);
        }
    }

    pub fn is_live(&self, id: SubscriptionId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release_all();
    }
}
