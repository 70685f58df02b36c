//! In-process event notification for running tasks.
//!
//! The teacher daemon notifies other processes of state changes by bumping a
//! version file and having watchers poll it (`notify_state_change` /
//! `read_state_version` in the coordinator). This crate has no sibling
//! process to notify - the Plan Executor and the HTTP layer share one
//! address space - so that cross-process signal collapses into an ordered,
//! in-memory per-task event log that callers drain directly.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::Event;

/// Publishes task events and lets callers drain them.
///
/// A trait (rather than a concrete type) so the HTTP layer and tests can
/// swap in whatever delivery mechanism fits - the default is a plain
/// in-memory log, but nothing here assumes that.
pub trait NotificationChannel: Send + Sync {
    /// Append an event to `task_id`'s log.
    fn publish(&self, task_id: &str, event: Event);

    /// Remove and return every event queued for `task_id`, in publish order.
    fn drain(&self, task_id: &str) -> Vec<Event>;
}

/// Default [`NotificationChannel`]: an ordered `Vec<Event>` per task id,
/// guarded by a mutex. Fine for a single process; a multi-node deployment
/// would swap this for a pub/sub backend without touching callers.
#[derive(Default)]
pub struct InMemoryNotificationChannel {
    log: Mutex<HashMap<String, Vec<Event>>>,
}

impl InMemoryNotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationChannel for InMemoryNotificationChannel {
    fn publish(&self, task_id: &str, event: Event) {
        let mut log = self.log.lock().expect("notification log mutex poisoned");
        log.entry(task_id.to_string()).or_default().push(event);
    }

    fn drain(&self, task_id: &str) -> Vec<Event> {
        let mut log = self.log.lock().expect("notification log mutex poisoned");
        log.remove(task_id).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish(reason: &str) -> Event {
        Event::Finish { reason: reason.to_string() }
    }

    #[test]
    fn test_publish_then_drain_preserves_order() {
        let channel = InMemoryNotificationChannel::new();
        channel.publish("task-1", Event::AssistantText { content: "a".to_string(), is_final: false });
        channel.publish("task-1", Event::AssistantText { content: "b".to_string(), is_final: true });

        let events = channel.drain("task-1");
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::AssistantText { content, .. } if content == "a"));
        assert!(matches!(&events[1], Event::AssistantText { content, .. } if content == "b"));
    }

    #[test]
    fn test_drain_clears_the_log() {
        let channel = InMemoryNotificationChannel::new();
        channel.publish("task-1", finish("done"));

        assert_eq!(channel.drain("task-1").len(), 1);
        assert_eq!(channel.drain("task-1").len(), 0);
    }

    #[test]
    fn test_tasks_are_isolated() {
        let channel = InMemoryNotificationChannel::new();
        channel.publish("task-1", finish("a"));
        channel.publish("task-2", finish("b"));

        assert_eq!(channel.drain("task-1").len(), 1);
        assert_eq!(channel.drain("task-2").len(), 1);
    }

    #[test]
    fn test_drain_on_unknown_task_is_empty() {
        let channel = InMemoryNotificationChannel::new();
        assert!(channel.drain("never-published").is_empty());
    }
}
