//! Typed publish/subscribe channel between state mutation and the UI.
//!
//! Handlers run synchronously on the publishing thread, in registration order.
//! Nothing is buffered: a handler only sees events published after it
//! subscribed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::trace;

use crate::gates::Section;
use crate::types::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    State,
    Toast,
    Nav,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub icon: &'static str,
    pub title: String,
    pub body: Option<String>,
}

impl Toast {
    pub fn new(icon: &'static str, title: impl Into<String>) -> Self {
        Self { icon, title: title.into(), body: None }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    State(AppState),
    Toast(Toast),
    Nav(Section),
}

impl Event {
    pub fn channel(&self) -> Channel {
        match self {
            Event::State(_) => Channel::State,
            Event::Toast(_) => Channel::Toast,
            Event::Nav(_) => Channel::Nav,
        }
    }
}

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct Registry {
    channels: HashMap<Channel, Vec<(u64, Handler)>>,
}

#[derive(Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, channel: Channel, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.channels.entry(channel).or_default().push((id, Arc::new(handler)));
        Subscription { registry: Arc::downgrade(&self.registry), channel, id }
    }

    pub fn publish(&self, event: Event) {
        let channel = event.channel();
        // Snapshot the handler list so handlers may (un)subscribe while we deliver.
        let handlers: Vec<Handler> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry
                .channels
                .get(&channel)
                .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        trace!(target: "bus", ?channel, handlers = handlers.len(), "publish");
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn toast(&self, toast: Toast) {
        self.publish(Event::Toast(toast));
    }

    pub fn navigate(&self, section: Section) {
        self.publish(Event::Nav(section));
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.channels.get(&channel).map_or(0, Vec::len)
    }
}

/// Handle returned by [`EventBus::subscribe`]. The handler stays registered
/// until [`Subscription::unsubscribe`] is called; dropping the handle does
/// not remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    channel: Channel,
    id: u64,
}

impl Subscription {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn unsubscribe(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handlers) = registry.channels.get_mut(&self.channel) {
            handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus, channel: Channel) -> (Arc<Mutex<Vec<String>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = bus.subscribe(channel, move |event| {
            if let Event::Toast(t) = event {
                sink.lock().unwrap().push(t.title.clone());
            }
        });
        (seen, sub)
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&order), Arc::clone(&order));
        let _first = bus.subscribe(Channel::Toast, move |_| a.lock().unwrap().push(1));
        let _second = bus.subscribe(Channel::Toast, move |_| b.lock().unwrap().push(2));

        bus.toast(Toast::new("✨", "hello"));
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn late_subscriber_does_not_see_earlier_publish() {
        let bus = EventBus::new();
        bus.toast(Toast::new("✨", "early"));
        let (seen, _sub) = recorder(&bus, Channel::Toast);
        bus.toast(Toast::new("✨", "late"));
        assert_eq!(*seen.lock().unwrap(), vec!["late".to_string()]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let (seen, sub) = recorder(&bus, Channel::Toast);
        bus.toast(Toast::new("✨", "one"));
        sub.unsubscribe();
        bus.toast(Toast::new("✨", "two"));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(bus.subscriber_count(Channel::Toast), 0);
    }

    #[test]
    fn channels_are_isolated() {
        let bus = EventBus::new();
        let (seen, _sub) = recorder(&bus, Channel::Toast);
        bus.navigate(Section::Premium);
        assert!(seen.lock().unwrap().is_empty());
    }
}
