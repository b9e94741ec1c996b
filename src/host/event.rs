use crate::blocks::definition::CustomBlock;
use crate::host::item::ItemStack;
use crate::types::{BlockPos, Hand};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

pub trait Cancellable {
    fn is_cancelled(&self) -> bool;
    fn set_cancelled(&mut self, cancelled: bool);
}

/// Fired after the real block has been set for a custom block placement, before the
/// placement is stored. Cancelling it, or clearing `can_build`, puts the old block back.
pub struct CustomBlockPlaceEvent {
    pub block: Arc<dyn CustomBlock>,
    pub placed: BlockPos,
    /// State of the block that was there before
    pub replaced_state: u32,
    pub placed_against: BlockPos,
    pub item: ItemStack,
    pub player: Uuid,
    pub hand: Hand,
    pub can_build: bool,
    cancelled: bool,
}

impl CustomBlockPlaceEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        block: Arc<dyn CustomBlock>,
        placed: BlockPos,
        replaced_state: u32,
        placed_against: BlockPos,
        item: ItemStack,
        player: Uuid,
        hand: Hand,
        can_build: bool,
    ) -> Self {
        Self {
            block,
            placed,
            replaced_state,
            placed_against,
            item,
            player,
            hand,
            can_build,
            cancelled: false,
        }
    }

    /// Whether the placement goes ahead
    pub fn is_allowed(&self) -> bool {
        !self.cancelled && self.can_build
    }
}

impl Cancellable for CustomBlockPlaceEvent {
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

type Listener<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

/// Listeners for one event type, called in subscription order. A listener may subscribe
/// others; they are called from the next publish on.
pub struct EventBus<E> {
    listeners: RwLock<Vec<Listener<E>>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&mut E) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(listener));
    }

    pub fn publish(&self, event: &mut E) {
        let listeners: Vec<Listener<E>> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for listener in &listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        value: usize,
        cancelled: bool,
    }

    #[test]
    fn test_listeners_run_in_order() {
        let bus: EventBus<Counter> = EventBus::new();
        bus.subscribe(|event| event.value = event.value * 10 + 1);
        bus.subscribe(|event| event.value = event.value * 10 + 2);

        let mut event = Counter::default();
        bus.publish(&mut event);
        assert_eq!(event.value, 12);
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn test_later_listener_sees_cancellation() {
        let seen = Arc::new(AtomicUsize::new(0));
        let bus: EventBus<Counter> = EventBus::new();
        bus.subscribe(|event| event.cancelled = true);
        let seen_by_listener = seen.clone();
        bus.subscribe(move |event| {
            if event.cancelled {
                seen_by_listener.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.publish(&mut Counter::default());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_can_subscribe_during_publish() {
        let bus: Arc<EventBus<Counter>> = Arc::new(EventBus::new());
        let inner_bus = bus.clone();
        bus.subscribe(move |event| {
            event.value += 1;
            inner_bus.subscribe(|event| event.value += 100);
        });

        let mut event = Counter::default();
        bus.publish(&mut event);
        assert_eq!(event.value, 1);
        assert_eq!(bus.listener_count(), 2);

        let mut event = Counter::default();
        bus.publish(&mut event);
        assert_eq!(event.value, 101);
    }
}
