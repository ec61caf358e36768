// 8.0 engine/core.rs: the simulator. holds config, the signal source and the event log.
// the account it steps is passed in by the caller, never owned here.

use super::config::SimulatorConfig;
use crate::events::{Event, EventId, EventPayload};
use crate::market::MarketRegistry;
use crate::signal::{NoSignal, SignalSource};
use crate::types::Timestamp;
use std::fmt;
use tracing::trace;

/** 8.1: main simulator struct */
pub struct Simulator {
    pub(super) config: SimulatorConfig,
    pub(super) signal: Box<dyn SignalSource>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_signal(config, Box::new(NoSignal))
    }

    pub fn with_signal(config: SimulatorConfig, signal: Box<dyn SignalSource>) -> Self {
        Self {
            config,
            signal,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn set_signal(&mut self, signal: Box<dyn SignalSource>) {
        self.signal = signal;
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn markets(&self) -> &MarketRegistry {
        &self.config.markets
    }

    // open time of the bar being stepped
    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let events = self.events();
        &events[events.len().saturating_sub(count)..]
    }

    // newest max_events events, oldest first
    pub fn events(&self) -> &[Event] {
        let start = self.events.len().saturating_sub(self.config.max_events);
        &self.events[start..]
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    // 8.2: the buffer grows to twice the cap before old events are dropped in one drain,
    // so each event is moved at most once
    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        trace!(id = event.id.0, payload = ?event.payload, "event");

        self.events.push(event);

        let cap = self.config.max_events;
        if self.events.len() > cap.saturating_mul(2) {
            let drain_count = self.events.len() - cap;
            self.events.drain(0..drain_count);
        }
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .field("events", &self.events.len())
            .field("next_event_id", &self.next_event_id)
            .field("current_time", &self.current_time)
            .finish_non_exhaustive()
    }
}
