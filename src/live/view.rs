//! Selected-cycle tracking.

use super::segment::CycleBucket;
use crate::types::Event;

/// Tracks which cycle the user is looking at, always kept within
/// `1..=total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSelector {
    total: usize,
    selected: usize,
}

impl Default for ViewSelector {
    fn default() -> Self {
        Self {
            total: 1,
            selected: 1,
        }
    }
}

impl ViewSelector {
    pub fn new(total: usize) -> Self {
        let mut view = Self::default();
        view.set_total(total);
        view
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// One-based selected cycle.
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Change the cycle count and clamp the selection into range.
    pub fn set_total(&mut self, total: usize) {
        self.total = total.max(1);
        self.selected = self.selected.clamp(1, self.total);
    }

    pub fn select(&mut self, cycle: usize) {
        self.selected = cycle.clamp(1, self.total);
    }

    pub fn next(&mut self) {
        self.select(self.selected.saturating_add(1));
    }

    pub fn previous(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    /// Events of the selected bucket; empty when out of range.
    pub fn events_for_view<'a>(&self, buckets: &'a [CycleBucket]) -> &'a [Event] {
        buckets
            .get(self.selected - 1)
            .map(|bucket| bucket.events.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::segment::segment;
    use crate::testsupport::ev;
    use crate::types::EventStatus::{Ok, Started};

    #[test]
    fn shrinking_total_clamps_selection() {
        let mut view = ViewSelector::new(6);
        view.select(5);
        view.set_total(3);
        assert_eq!(view.selected(), 3);
    }

    #[test]
    fn selection_is_clamped_both_ways() {
        let mut view = ViewSelector::new(3);
        view.select(0);
        assert_eq!(view.selected(), 1);
        view.select(99);
        assert_eq!(view.selected(), 3);
        view.next();
        assert_eq!(view.selected(), 3);
        view.previous();
        view.previous();
        view.previous();
        assert_eq!(view.selected(), 1);
    }

    #[test]
    fn zero_total_becomes_one() {
        let view = ViewSelector::new(0);
        assert_eq!((view.total(), view.selected()), (1, 1));
    }

    #[test]
    fn events_for_view_follows_selection() {
        let log = vec![ev("completed", Ok, 1), ev("fetch", Started, 2)];
        let buckets = segment(&log, 2);
        let mut view = ViewSelector::new(2);
        assert_eq!(view.events_for_view(&buckets), &log[..1]);
        view.next();
        assert_eq!(view.events_for_view(&buckets), &log[1..]);
        assert!(view.events_for_view(&buckets[..1]).is_empty());
    }
}
