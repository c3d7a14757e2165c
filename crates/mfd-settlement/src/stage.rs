//! Settlement stage machine.
//!
//! A settlement walks a fixed linear path and ends in exactly one of two
//! terminal stages:
//!
//! ```text
//! check-in: Pending → ShiftChecked → RoomAllocated → GuestResolved → Priced
//!           → PaymentAllocated → LedgerWritten → RoomFlipped → Committed
//!
//! sale:     Pending → ShiftChecked → StockReserved → Priced
//!           → PaymentAllocated → LedgerWritten → StockDecremented → Committed
//!
//! any non-terminal stage ──failure──► RolledBack
//! ```
//!
//! The tracker only records progress; it never touches storage.  Orchestrators
//! advance it after each step succeeds so a failure log names the last stage
//! that completed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementStage {
    Pending,
    ShiftChecked,
    RoomAllocated,
    GuestResolved,
    StockReserved,
    Priced,
    PaymentAllocated,
    LedgerWritten,
    RoomFlipped,
    StockDecremented,
    Committed,
    RolledBack,
}

impl SettlementStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStage::Pending => "pending",
            SettlementStage::ShiftChecked => "shift_checked",
            SettlementStage::RoomAllocated => "room_allocated",
            SettlementStage::GuestResolved => "guest_resolved",
            SettlementStage::StockReserved => "stock_reserved",
            SettlementStage::Priced => "priced",
            SettlementStage::PaymentAllocated => "payment_allocated",
            SettlementStage::LedgerWritten => "ledger_written",
            SettlementStage::RoomFlipped => "room_flipped",
            SettlementStage::StockDecremented => "stock_decremented",
            SettlementStage::Committed => "committed",
            SettlementStage::RolledBack => "rolled_back",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SettlementStage::Committed | SettlementStage::RolledBack)
    }
}

impl fmt::Display for SettlementStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const CHECKIN_PATH: &[SettlementStage] = &[
    SettlementStage::Pending,
    SettlementStage::ShiftChecked,
    SettlementStage::RoomAllocated,
    SettlementStage::GuestResolved,
    SettlementStage::Priced,
    SettlementStage::PaymentAllocated,
    SettlementStage::LedgerWritten,
    SettlementStage::RoomFlipped,
    SettlementStage::Committed,
];

pub const SALE_PATH: &[SettlementStage] = &[
    SettlementStage::Pending,
    SettlementStage::ShiftChecked,
    SettlementStage::StockReserved,
    SettlementStage::Priced,
    SettlementStage::PaymentAllocated,
    SettlementStage::LedgerWritten,
    SettlementStage::StockDecremented,
    SettlementStage::Committed,
];

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// An out-of-order advance.  Indicates an orchestrator bug, never bad input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: SettlementStage,
    pub to: SettlementStage,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal settlement transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

// ---------------------------------------------------------------------------
// StageTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StageTracker {
    path: &'static [SettlementStage],
    position: usize,
    rolled_back: bool,
}

impl StageTracker {
    pub fn new(path: &'static [SettlementStage]) -> Self {
        Self {
            path,
            position: 0,
            rolled_back: false,
        }
    }

    pub fn checkin() -> Self {
        Self::new(CHECKIN_PATH)
    }

    pub fn sale() -> Self {
        Self::new(SALE_PATH)
    }

    pub fn current(&self) -> SettlementStage {
        if self.rolled_back {
            SettlementStage::RolledBack
        } else {
            self.path[self.position]
        }
    }

    /// Move to `to`, which must be the next stage on the path.
    pub fn advance(&mut self, to: SettlementStage) -> Result<(), TransitionError> {
        let from = self.current();
        let next = self.path.get(self.position + 1).copied();
        if from.is_terminal() || next != Some(to) {
            return Err(TransitionError { from, to });
        }
        self.position += 1;
        Ok(())
    }

    /// Absorb into `RolledBack`.  Returns the last stage reached before the
    /// failure.
    pub fn roll_back(&mut self) -> Result<SettlementStage, TransitionError> {
        let from = self.current();
        if from.is_terminal() {
            return Err(TransitionError {
                from,
                to: SettlementStage::RolledBack,
            });
        }
        self.rolled_back = true;
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkin_path_walks_to_committed() {
        let mut t = StageTracker::checkin();
        for stage in &CHECKIN_PATH[1..] {
            t.advance(*stage).unwrap();
        }
        assert_eq!(t.current(), SettlementStage::Committed);
        assert!(t.current().is_terminal());
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut t = StageTracker::checkin();
        t.advance(SettlementStage::ShiftChecked).unwrap();
        let err = t.advance(SettlementStage::Priced).unwrap_err();
        assert_eq!(err.from, SettlementStage::ShiftChecked);
        assert_eq!(t.current(), SettlementStage::ShiftChecked);
    }

    #[test]
    fn sale_stages_are_not_valid_on_checkin_path() {
        let mut t = StageTracker::checkin();
        t.advance(SettlementStage::ShiftChecked).unwrap();
        assert!(t.advance(SettlementStage::StockReserved).is_err());
    }

    #[test]
    fn roll_back_from_any_non_terminal_stage() {
        let mut t = StageTracker::sale();
        t.advance(SettlementStage::ShiftChecked).unwrap();
        t.advance(SettlementStage::StockReserved).unwrap();
        assert_eq!(t.roll_back().unwrap(), SettlementStage::StockReserved);
        assert_eq!(t.current(), SettlementStage::RolledBack);
        assert!(t.advance(SettlementStage::Priced).is_err());
        assert!(t.roll_back().is_err());
    }

    #[test]
    fn committed_cannot_roll_back() {
        let mut t = StageTracker::sale();
        for stage in &SALE_PATH[1..] {
            t.advance(*stage).unwrap();
        }
        assert!(t.roll_back().is_err());
    }
}
