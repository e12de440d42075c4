use log::trace;

use crate::collector::round_to_thousandths;
use crate::entry::LayoutShift;

/// Running Cumulative Layout Shift score for one page lifetime.
///
/// The total only grows. There is deliberately no reset: a new page
/// lifetime gets a new accumulator.
#[derive(Debug, Default)]
pub struct ClsAccumulator {
    value: f64,
    entries: Vec<LayoutShift>,
}

impl ClsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a delivered batch into the total and return the new total.
    ///
    /// Shifts that follow recent user input are expected and skipped.
    pub fn record_batch<'a, I>(&mut self, shifts: I) -> f64
    where
        I: IntoIterator<Item = &'a LayoutShift>,
    {
        for shift in shifts {
            if shift.had_recent_input {
                trace!("Ignoring layout shift {} after recent input", shift.value);
                continue;
            }
            self.value += shift.value;
            self.entries.push(shift.clone());
        }
        self.value
    }

    /// The raw running total
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The total as reported, rounded to three decimals
    pub fn reported_value(&self) -> f64 {
        round_to_thousandths(self.value)
    }

    /// Contributing shifts in delivery order
    pub fn entries(&self) -> &[LayoutShift] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(value: f64, had_recent_input: bool) -> LayoutShift {
        LayoutShift {
            start_time: 0.0,
            value,
            had_recent_input,
        }
    }

    #[test]
    fn test_only_unprompted_shifts_contribute() {
        let mut cls = ClsAccumulator::new();
        let batch = vec![shift(0.05, false), shift(0.4, true), shift(0.0126, false)];

        let total = cls.record_batch(&batch);

        assert!((total - 0.0626).abs() < 1e-12);
        assert_eq!(cls.entries().len(), 2);
        assert_eq!(cls.reported_value(), 0.063);
    }

    #[test]
    fn test_total_never_decreases_across_batches() {
        let mut cls = ClsAccumulator::new();
        let mut previous = 0.0;

        for batch in [
            vec![shift(0.01, false)],
            vec![],
            vec![shift(0.9, true)],
            vec![shift(0.002, false), shift(0.003, false)],
        ] {
            let total = cls.record_batch(&batch);
            assert!(total >= previous);
            previous = total;
        }

        assert_eq!(cls.reported_value(), 0.015);
        assert_eq!(cls.entries().len(), 3);
    }
}
