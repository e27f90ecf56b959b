//! Single-slot debounce timer.
//!
//! Scheduling replaces whatever was pending, so at most one timer can fire.
//! When it fires the timer posts a message carrying its ticket; the owner
//! accepts it only if that ticket is still the pending one.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    next_ticket: u64,
    pending: Option<(u64, CancellationToken)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_ticket: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer, preempting any pending one. Returns the new ticket.
    pub fn schedule<M, F>(&mut self, sender: &mpsc::UnboundedSender<M>, message: F) -> u64
    where
        M: Send + 'static,
        F: FnOnce(u64) -> M + Send + 'static,
    {
        self.cancel();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let token = CancellationToken::new();
        self.pending = Some((ticket, token.clone()));

        let sender = sender.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = sender.send(message(ticket));
                }
            }
        });

        ticket
    }

    /// Claim a fired ticket. False means it was preempted or cancelled.
    pub fn accept(&mut self, ticket: u64) -> bool {
        match &self.pending {
            Some((pending, _)) if *pending == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending timer, if any
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
