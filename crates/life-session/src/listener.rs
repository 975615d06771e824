//! Single-fulfilment listener slots for long-polling.
//!
//! A slot moves from *registered* to exactly one terminal state:
//! *fulfilled* (a [`Notification`] was delivered and the slot left the
//! table) or *abandoned* (the waiting [`ListenerHandle`] was dropped and
//! its drop removed the slot). One request, one event, one response.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, Weak};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::control::Notification;
use crate::ids::PageId;
use crate::session::{lock_state, SessionState};

struct Slot {
    id: u64,
    tx: oneshot::Sender<Notification>,
}

/// Registered slots of one session, keyed by page.
#[derive(Default)]
pub(crate) struct ListenerTable {
    slots: HashMap<PageId, Slot>,
    next_slot_id: u64,
}

impl ListenerTable {
    /// Register a slot for `page_id`, superseding any slot already there.
    pub(crate) fn register(&mut self, page_id: PageId) -> (u64, oneshot::Receiver<Notification>) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_slot_id;
        self.next_slot_id = self.next_slot_id.wrapping_add(1);
        if let Some(old) = self.slots.insert(page_id, Slot { id, tx }) {
            // The old waiter may already be gone.
            let _ = old.tx.send(Notification::Superseded);
        }
        (id, rx)
    }

    /// Drop the slot for `page_id`. Returns whether one was registered.
    pub(crate) fn remove(&mut self, page_id: PageId) -> bool {
        self.slots.remove(&page_id).is_some()
    }

    /// Drop the slot for `page_id` only if it is still slot `slot_id`.
    fn release(&mut self, page_id: PageId, slot_id: u64) {
        if self.slots.get(&page_id).is_some_and(|slot| slot.id == slot_id) {
            self.slots.remove(&page_id);
        }
    }

    /// Fulfil and remove every registered slot. Returns how many waiters
    /// received the notification.
    pub(crate) fn broadcast(&mut self, notification: Notification) -> usize {
        self.slots
            .drain()
            .map(|(_, slot)| slot.tx.send(notification).is_ok())
            .filter(|delivered| *delivered)
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, page_id: PageId) -> bool {
        self.slots.contains_key(&page_id)
    }
}

/// A registered listener slot, awaited by one long-poll request.
///
/// Resolves to the single [`Notification`] delivered to the slot.
/// Dropping the handle before it resolves (for example because the
/// client disconnected and the transport dropped the request future)
/// removes the slot from its session.
pub struct ListenerHandle {
    page_id: PageId,
    slot_id: u64,
    rx: oneshot::Receiver<Notification>,
    state: Weak<Mutex<SessionState>>,
    resolved: bool,
}

impl ListenerHandle {
    pub(crate) const fn new(
        page_id: PageId,
        slot_id: u64,
        rx: oneshot::Receiver<Notification>,
        state: Weak<Mutex<SessionState>>,
    ) -> Self {
        Self {
            page_id,
            slot_id,
            rx,
            state,
            resolved: false,
        }
    }

    /// The page this slot listens for.
    pub const fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Future for ListenerHandle {
    type Output = Notification;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(result) => {
                self.resolved = true;
                Poll::Ready(result.unwrap_or(Notification::Removed))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            lock_state(&state).listeners.release(self.page_id, self.slot_id);
        }
    }
}

impl core::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("page_id", &self.page_id)
            .field("slot_id", &self.slot_id)
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_drains_every_slot() {
        let mut table = ListenerTable::default();
        let (_, mut a) = table.register(PageId(0));
        let (_, mut b) = table.register(PageId(1));
        assert_eq!(table.broadcast(Notification::Refresh), 2);
        assert_eq!(table.len(), 0);
        assert_eq!(a.try_recv().ok(), Some(Notification::Refresh));
        assert_eq!(b.try_recv().ok(), Some(Notification::Refresh));
    }

    #[test]
    fn reregistering_supersedes_the_old_slot() {
        let mut table = ListenerTable::default();
        let (first, mut old) = table.register(PageId(3));
        let (second, _new) = table.register(PageId(3));
        assert_ne!(first, second);
        assert_eq!(table.len(), 1);
        assert_eq!(old.try_recv().ok(), Some(Notification::Superseded));

        // A stale release must not remove the newer slot.
        table.release(PageId(3), first);
        assert!(table.contains(PageId(3)));
        table.release(PageId(3), second);
        assert!(!table.contains(PageId(3)));
    }

    #[test]
    fn broadcast_skips_dropped_receivers() {
        let mut table = ListenerTable::default();
        let (_, rx) = table.register(PageId(0));
        drop(rx);
        let (_, _keep) = table.register(PageId(1));
        assert_eq!(table.broadcast(Notification::Closed), 1);
    }
}
