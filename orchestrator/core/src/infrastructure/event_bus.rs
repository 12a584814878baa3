// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Router Events
//
// In-memory event streaming over tokio broadcast channels. Lets observers
// follow specialist, signal and approach changes as they happen.
// Events are not persisted; the execution ledger is the durable record.

use crate::domain::events::RouterEvent;
use crate::domain::task::TaskId;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus for publishing and subscribing to router events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<RouterEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers; a bus nobody listens to is fine
    pub fn publish(&self, event: RouterEvent) {
        debug!(event_type = event.event_type(), "Publishing event");

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all router events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the decision and outcome events of a single task
    pub fn subscribe_task(&self, task_id: TaskId) -> TaskEventReceiver {
        TaskEventReceiver {
            receiver: self.sender.subscribe(),
            task_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all router events
pub struct EventReceiver {
    receiver: broadcast::Receiver<RouterEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<RouterEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<RouterEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Drain everything currently buffered
    pub fn drain(&mut self) -> Vec<RouterEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(event) => events.push(event),
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }
}

/// Receiver filtered to one task id
pub struct TaskEventReceiver {
    receiver: broadcast::Receiver<RouterEvent>,
    task_id: TaskId,
}

impl TaskEventReceiver {
    pub async fn recv(&mut self) -> Result<RouterEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if self.matches_task(&event) {
                return Ok(event);
            }
        }
    }

    fn matches_task(&self, event: &RouterEvent) -> bool {
        match event {
            RouterEvent::DecisionIssued { task_id, .. } => task_id == &self.task_id,
            RouterEvent::OutcomeRecorded { task_id, .. } => task_id == &self.task_id,
            _ => false,
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
