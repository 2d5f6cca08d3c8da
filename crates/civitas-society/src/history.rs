//! Bounded audit trail of finished trades.
//!
//! The trade registry forgets a trade the moment it completes or is
//! cancelled. [`TradeHistory`] keeps a record of each of those endings so
//! that callers can inspect past diplomacy. Once `limit` records are held,
//! the oldest is dropped for each new one; a limit of zero disables
//! recording.

use std::collections::VecDeque;

use serde::Serialize;

use civitas_types::{TradeId, TradeStatus, TribeId};

use crate::trade::{CancelReason, TradeOutcome, TradeResolution};

/// A terminal trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeRecord {
    /// Trade identifier.
    pub trade_id: TradeId,
    /// Proposing tribe.
    pub from: TribeId,
    /// Receiving tribe.
    pub to: TribeId,
    /// `completed` or `cancelled`.
    pub status: TradeStatus,
    /// Why the trade was cancelled, if it was.
    pub reason: Option<CancelReason>,
    /// Tick the trade ended.
    pub tick: u64,
}

impl TradeRecord {
    /// Build a record from a terminal resolution; `None` for acceptances.
    pub const fn from_resolution(resolution: &TradeResolution, tick: u64) -> Option<Self> {
        let reason = match resolution.outcome {
            TradeOutcome::Accepted => return None,
            TradeOutcome::Completed => None,
            TradeOutcome::Cancelled(reason) => Some(reason),
        };
        Some(Self {
            trade_id: resolution.trade_id,
            from: resolution.from,
            to: resolution.to,
            status: resolution.status(),
            reason,
            tick,
        })
    }

    /// Whether `tribe` took part in the trade.
    pub fn involves(&self, tribe: TribeId) -> bool {
        self.from == tribe || self.to == tribe
    }
}

/// Append-only, size-bounded list of [`TradeRecord`]s, oldest first.
#[derive(Debug, Clone, Default)]
pub struct TradeHistory {
    limit: usize,
    records: VecDeque<TradeRecord>,
}

impl TradeHistory {
    /// Create an empty history holding at most `limit` records.
    pub const fn new(limit: usize) -> Self {
        Self {
            limit,
            records: VecDeque::new(),
        }
    }

    /// Record a resolution if it ended a trade. Returns whether it was kept.
    pub fn record(&mut self, resolution: &TradeResolution, tick: u64) -> bool {
        if self.limit == 0 {
            return false;
        }
        let Some(record) = TradeRecord::from_resolution(resolution, tick) else {
            return false;
        };
        if self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(record);
        true
    }

    /// All records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter()
    }

    /// Records involving `tribe`, oldest first.
    pub fn for_tribe(&self, tribe: TribeId) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter().filter(move |record| record.involves(tribe))
    }

    /// Number of completed trades in the window.
    pub fn completed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.status == TradeStatus::Completed)
            .count()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
