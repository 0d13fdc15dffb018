// Edit history module
// Live stars in draw order plus a stack of deleted stars for redo

use crate::star::Star;
use log::debug;

/// Live list and deleted stack. A star is held by exactly one of the two.
#[derive(Debug, Default, Clone)]
pub struct History {
    live: Vec<Star>,
    deleted: Vec<Star>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stars currently on the canvas, back to front
    pub fn live(&self) -> &[Star] {
        &self.live
    }

    /// Deleted stars, bottom of the stack first
    #[cfg(test)]
    pub fn deleted(&self) -> &[Star] {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.deleted.is_empty()
    }

    pub fn add(&mut self, star: Star) {
        self.live.push(star);
        debug!("History: added star (live: {})", self.live.len());
    }

    /// Swap the topmost live star for an updated copy of it
    pub fn replace_last(&mut self, star: Star) -> bool {
        match self.live.last_mut() {
            Some(last) if *last != star => {
                *last = star;
                true
            }
            _ => false,
        }
    }

    /// Move the topmost live star onto the deleted stack
    pub fn delete_last(&mut self) -> bool {
        match self.live.pop() {
            Some(star) => {
                self.deleted.push(star);
                debug!(
                    "History: deleted last (live: {}, deleted: {})",
                    self.live.len(),
                    self.deleted.len()
                );
                true
            }
            None => false,
        }
    }

    /// Move every live star onto a fresh deleted stack, keeping their order.
    ///
    /// Earlier deletions are discarded, so redo can only bring back the stars
    /// removed here, the last-drawn one first.
    pub fn delete_all(&mut self) -> bool {
        if self.live.is_empty() {
            return false;
        }
        self.deleted.clear();
        self.deleted.append(&mut self.live);
        debug!("History: deleted all (deleted: {})", self.deleted.len());
        true
    }

    /// Restore the most recently deleted star on top of the live list
    pub fn redo(&mut self) -> bool {
        match self.deleted.pop() {
            Some(star) => {
                self.live.push(star);
                debug!(
                    "History: redo (live: {}, deleted: {})",
                    self.live.len(),
                    self.deleted.len()
                );
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::star::Point;
    use proptest::prelude::*;

    fn star(x: i32, radius: u32) -> Star {
        Star::new(Point::new(x, 0), radius, Rgb::BLUE, Rgb::RED)
    }

    fn history_of(stars: &[Star]) -> History {
        let mut history = History::new();
        for s in stars {
            history.add(*s);
        }
        history
    }

    #[test]
    fn add_appends_in_draw_order() {
        let history = history_of(&[star(1, 1), star(2, 2)]);
        assert_eq!(history.live(), &[star(1, 1), star(2, 2)]);
        assert!(history.deleted().is_empty());
    }

    #[test]
    fn delete_all_redo_delete_last_scenario() {
        let a = star(0, 10);
        let mut history = history_of(&[a]);

        assert!(history.delete_all());
        assert!(history.live().is_empty());
        assert_eq!(history.deleted(), &[a]);

        assert!(history.redo());
        assert_eq!(history.live(), &[a]);
        assert!(history.deleted().is_empty());

        assert!(history.delete_last());
        assert!(history.live().is_empty());
        assert_eq!(history.deleted(), &[a]);
    }

    #[test]
    fn delete_all_keeps_original_order_on_the_stack() {
        let (a, b, c) = (star(1, 1), star(2, 2), star(3, 3));
        let mut history = history_of(&[a, b, c]);
        history.delete_all();
        assert_eq!(history.deleted(), &[a, b, c]);

        // the last live star comes back first
        history.redo();
        assert_eq!(history.live(), &[c]);
    }

    #[test]
    fn delete_all_discards_earlier_deletions() {
        let (a, b, c) = (star(1, 1), star(2, 2), star(3, 3));
        let mut history = history_of(&[a, b, c]);
        history.delete_last();
        assert_eq!(history.deleted(), &[c]);

        history.delete_all();
        assert_eq!(history.deleted(), &[a, b]);
    }

    #[test]
    fn redo_appends_on_top_not_at_original_position() {
        let (a, b, c) = (star(1, 1), star(2, 2), star(3, 3));
        let mut history = history_of(&[a, b]);
        history.delete_last();
        history.add(c);
        history.redo();
        assert_eq!(history.live(), &[a, c, b]);
    }

    #[test]
    fn operations_on_empty_containers_are_noops() {
        let mut history = History::new();
        assert!(!history.delete_last());
        assert!(!history.delete_all());
        assert!(!history.redo());
        assert!(history.live().is_empty());
        assert!(history.deleted().is_empty());
    }

    #[test]
    fn delete_all_on_empty_live_keeps_redo_stack() {
        let a = star(1, 1);
        let mut history = history_of(&[a]);
        history.delete_last();
        assert!(!history.delete_all());
        assert_eq!(history.deleted(), &[a]);
        assert!(history.can_redo());
    }

    #[test]
    fn replace_last_only_touches_the_top() {
        let (a, b) = (star(1, 1), star(2, 2));
        let mut history = history_of(&[a, b]);
        assert!(history.replace_last(b.with_radius(9)));
        assert_eq!(history.live(), &[a, b.with_radius(9)]);
        assert!(!history.replace_last(b.with_radius(9)));

        let mut empty = History::new();
        assert!(!empty.replace_last(a));
        assert!(empty.is_empty());
    }

    fn stars_from(radii: &[u32]) -> Vec<Star> {
        radii
            .iter()
            .enumerate()
            .map(|(i, r)| star(i as i32, *r))
            .collect()
    }

    proptest! {
        #[test]
        fn delete_last_then_redo_round_trips(
            radii in prop::collection::vec(0u32..500, 2..20),
            earlier in 0usize..10,
        ) {
            let stars = stars_from(&radii);
            let mut history = history_of(&stars);
            // leave something on the redo stack first
            let earlier = earlier.min(stars.len() - 1);
            for _ in 0..earlier {
                history.delete_last();
            }
            let live_before = history.live().to_vec();
            let deleted_before = history.deleted().to_vec();
            prop_assert_eq!(deleted_before.len(), earlier);

            prop_assert!(history.delete_last());
            prop_assert!(history.redo());
            prop_assert_eq!(history.live(), live_before.as_slice());
            prop_assert_eq!(history.deleted(), deleted_before.as_slice());
        }

        #[test]
        fn delete_all_then_redo_everything_restores_all(
            radii in prop::collection::vec(0u32..500, 1..20),
        ) {
            let stars = stars_from(&radii);
            let mut history = history_of(&stars);

            prop_assert!(history.delete_all());
            for _ in 0..stars.len() {
                prop_assert!(history.redo());
            }
            prop_assert!(!history.redo());
            prop_assert!(history.deleted().is_empty());

            let mut expected = stars.clone();
            expected.reverse();
            prop_assert_eq!(history.live(), expected.as_slice());
        }

        #[test]
        fn stars_are_never_lost_or_duplicated(ops in prop::collection::vec(0u8..4, 0..60)) {
            let mut history = History::new();
            let mut added: Vec<Star> = Vec::new();
            // stars removed for good when delete_all reset the redo stack
            let mut discarded = 0usize;
            for op in ops {
                match op {
                    0 => {
                        let s = star(added.len() as i32, added.len() as u32 % 7);
                        history.add(s);
                        added.push(s);
                    }
                    1 => {
                        history.delete_last();
                    }
                    2 => {
                        let dropped = history.deleted().len();
                        if history.delete_all() {
                            discarded += dropped;
                        }
                    }
                    _ => {
                        history.redo();
                    }
                }

                let held: Vec<Star> = history
                    .live()
                    .iter()
                    .chain(history.deleted())
                    .copied()
                    .collect();
                for s in &held {
                    prop_assert!(added.contains(s));
                }
                let mut ids: Vec<i32> = held.iter().map(|s| s.center.x).collect();
                ids.sort_unstable();
                ids.dedup();
                prop_assert_eq!(ids.len(), held.len());
                prop_assert_eq!(held.len() + discarded, added.len());
            }
        }
    }
}
