/// Hand control back to the scheduler so interactive work can interleave with
/// long-running loops (ingestion, bulk inserts).
///
/// This is a suspension point, not a concurrency boundary: the caller resumes on
/// the same logical task once the scheduler gets back to it.
pub async fn yield_to_scheduler() {
    tokio::task::yield_now().await;
}

/// Counts abstract work units and says when a loop should yield.
///
/// Units are deterministic (item counts), not wall-clock time, so a run yields at
/// the same points every time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct YieldBudget {
    units_per_slice: u32,
    remaining_units: u32,
}

impl YieldBudget {
    pub fn new(units_per_slice: u32) -> Self {
        let units_per_slice = units_per_slice.max(1);
        Self {
            units_per_slice,
            remaining_units: units_per_slice,
        }
    }

    pub fn remaining_units(&self) -> u32 {
        self.remaining_units
    }

    /// Consumes `units`; returns `true` when the slice is used up and the caller
    /// should yield. The budget refills itself on that transition.
    pub fn consume(&mut self, units: u32) -> bool {
        if self.remaining_units > units {
            self.remaining_units -= units;
            return false;
        }
        self.remaining_units = self.units_per_slice;
        true
    }

    /// Consumes `units` and yields to the scheduler when the slice runs out.
    pub async fn tick(&mut self, units: u32) {
        if self.consume(units) {
            yield_to_scheduler().await;
        }
    }
}
