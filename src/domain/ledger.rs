//! Cash balance, lots and the trade log.
//!
//! Reads are public; every mutator is `pub(crate)` so that only the order
//! executor can change ledger state.

use chrono::{DateTime, Utc};

use super::position::{CloseDetails, Position, PositionStatus, Trade};

/// Share of a lot's original size below which a leftover counts as zero.
pub(crate) const DUST_RATIO: f64 = 1e-9;

/// Whether selling `amount` of `lot` would leave only rounding residue.
pub(crate) fn leaves_dust(lot: &Position, amount: f64) -> bool {
    lot.amount - amount <= lot.original_amount * DUST_RATIO
}

/// Result of closing some or all of an open lot.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitOutcome {
    /// The whole remaining lot was sold and is now closed.
    Closed(Position),
    /// A slice was sold: `remaining` is the reduced open lot, `closed` is
    /// the new closed record for the sold slice.
    Split { remaining: Position, closed: Position },
}

impl SplitOutcome {
    /// The closed record produced by the operation.
    pub fn closed(&self) -> &Position {
        match self {
            SplitOutcome::Closed(position) => position,
            SplitOutcome::Split { closed, .. } => closed,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, SplitOutcome::Split { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    initial_balance: f64,
    balance: f64,
    positions: Vec<Position>,
    trades: Vec<Trade>,
    created_at: DateTime<Utc>,
    next_id: u64,
}

impl Ledger {
    pub fn new(initial_balance: f64, created_at: DateTime<Utc>) -> Self {
        Ledger {
            initial_balance,
            balance: initial_balance,
            positions: Vec::new(),
            trades: Vec::new(),
            created_at,
            next_id: 1,
        }
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn all_positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn all_trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Open lots for `symbol`, oldest first.
    pub fn open_positions(&self, symbol: &str) -> Vec<&Position> {
        self.positions
            .iter()
            .filter(|p| p.is_open() && p.symbol == symbol)
            .collect()
    }

    /// Every open lot, oldest first.
    pub fn open_lots(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.open_lots().count()
    }

    /// The last `limit` trades, most recent first.
    pub fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        self.trades.iter().rev().take(limit).cloned().collect()
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn debit(&mut self, amount: f64) {
        self.balance -= amount;
    }

    pub(crate) fn credit(&mut self, amount: f64) {
        self.balance += amount;
    }

    pub(crate) fn push_position(&mut self, position: Position) {
        self.positions.push(position);
    }

    pub(crate) fn append_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Indices into `all_positions()` of the open lots for `symbol`,
    /// oldest first.
    pub(crate) fn open_indices(&self, symbol: &str) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_open() && p.symbol == symbol)
            .map(|(i, _)| i)
            .collect()
    }

    /// Close `amount` of the open lot at `index`.
    ///
    /// When `amount` covers the whole remaining lot, up to rounding
    /// residue, the lot itself is closed. Otherwise the lot is reduced in place and a new closed slice
    /// is appended, carrying its pro-rata share of the original cost and
    /// fee. Returns `None` if `index` does not name an open lot or `amount`
    /// is out of range.
    pub(crate) fn split_and_close(
        &mut self,
        index: usize,
        amount: f64,
        details: CloseDetails,
    ) -> Option<SplitOutcome> {
        let lot = self.positions.get(index)?;
        if !lot.is_open() || amount <= 0.0 || amount > lot.amount {
            return None;
        }

        if leaves_dust(lot, amount) {
            let lot = &mut self.positions[index];
            lot.status = PositionStatus::Closed;
            lot.closed = Some(details);
            return Some(SplitOutcome::Closed(lot.clone()));
        }

        let id = self.next_id();
        let lot = &mut self.positions[index];
        let share = amount / lot.original_amount;
        let slice = Position {
            id,
            symbol: lot.symbol.clone(),
            amount,
            original_amount: amount,
            buy_price: lot.buy_price,
            cost: lot.cost * share,
            fee: lot.fee * share,
            opened_at: lot.opened_at,
            status: PositionStatus::Closed,
            closed: Some(details),
            parent_id: Some(lot.id),
        };
        lot.amount -= amount;
        let remaining = lot.clone();

        self.positions.push(slice.clone());
        Some(SplitOutcome::Split {
            remaining,
            closed: slice,
        })
    }

    pub(crate) fn reset(&mut self, created_at: DateTime<Utc>) {
        *self = Ledger::new(self.initial_balance, created_at);
    }
}
