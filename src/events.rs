// 11.0: every state change the simulator makes produces an event. used as the audit trail
// of a run. the EventPayload enum lists all event types.

use crate::types::{Price, Quote, Side, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Account events
    FundingSettled(FundingSettledEvent),

    // Position events
    PositionOpened(PositionOpenedEvent),
    OpenRejected(OpenRejectedEvent),

    // Risk events
    PositionLiquidated(PositionLiquidatedEvent),

    // Run events
    SnapshotTaken(SnapshotTakenEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingSettledEvent {
    pub funding_rate: Decimal,
    pub total_cost: Quote,
    pub positions_settled: usize,
    pub new_balance: Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub entry_price: Price,
    pub fee: Quote,
    pub initial_margin: Option<Quote>,
    pub liquidation_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRejectedEvent {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub price: Price,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub market_price: Price,
    pub liquidation_price: Decimal,
    pub realized_pnl: Quote,
    pub new_balance: Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTakenEvent {
    pub snapshot_ts: Timestamp,
    pub balance: Quote,
    pub open_positions: usize,
}
