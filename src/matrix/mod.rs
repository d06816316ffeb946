// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! Matrix position mapper.
//!
//! Each level owns a binary matrix of 15 slots: the owner on top, then rows
//! of 2, 4 and 8. Layouts are pure projections of the per-level statistics
//! and are never persisted.

mod classifier;
mod position;
mod source;

pub use classifier::*;
pub use position::*;
pub use source::*;

use crate::primitives::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixErr {
    /// Level outside `1..=12`
    InvalidLevel(u8),

    /// Slot outside `1..=15`
    InvalidSlot(u8),
}

impl std::fmt::Display for MatrixErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(level) => write!(f, "invalid level: {level}"),
            Self::InvalidSlot(slot) => write!(f, "invalid slot: {slot}"),
        }
    }
}

impl std::error::Error for MatrixErr {}

/// Remaining room for each capped slot kind
struct Caps {
    partners: u32,
    charity: u32,
    tech: u32,
}

impl Caps {
    fn new(stats: &MatrixStats) -> Self {
        Self {
            partners: stats.partners,
            charity: stats.charity_places,
            tech: stats.tech_places,
        }
    }

    fn take(remaining: &mut u32) -> bool {
        if *remaining == 0 {
            return false;
        }

        *remaining -= 1;
        true
    }

    /// Turns a proposal into a position, demoting it to empty once the
    /// reported count of its kind is used up.
    fn admit(&mut self, slot: SlotIndex, class: SlotClass) -> MatrixPosition {
        match class {
            SlotClass::Partner(occupant) if Self::take(&mut self.partners) => {
                MatrixPosition::partner(slot, occupant)
            }
            SlotClass::Charity if Self::take(&mut self.charity) => {
                MatrixPosition::vacant(slot, OccupantKind::Charity)
            }
            SlotClass::Technical if Self::take(&mut self.tech) => {
                MatrixPosition::vacant(slot, OccupantKind::Technical)
            }
            SlotClass::Blocked => MatrixPosition::vacant(slot, OccupantKind::Blocked),
            _ => MatrixPosition::empty(slot),
        }
    }
}

/// Lays out the 15 positions of `level`, ordered by slot index.
///
/// Slot 1 always holds `self_id`. Without statistics every other slot is
/// empty, otherwise `classifier` proposes each slot and the proposals are
/// capped by the reported partner, charity and technical counts.
pub fn layout_level<C>(
    self_id: UserId,
    level: Level,
    stats: Option<&MatrixStats>,
    classifier: &mut C,
) -> Vec<MatrixPosition>
where
    C: SlotClassifier + ?Sized,
{
    let mut positions = Vec::with_capacity(SLOT_COUNT as usize);
    positions.push(MatrixPosition::owner(self_id, level));

    match stats {
        Some(stats) => {
            let mut caps = Caps::new(stats);
            for slot in SlotIndex::below_owner() {
                let class = classifier.classify(slot, level, stats);
                positions.push(caps.admit(slot, class));
            }
        }
        None => positions.extend(SlotIndex::below_owner().map(MatrixPosition::empty)),
    }

    positions
}

/// Slots whose occupant id contains `query`. An empty query matches nothing.
#[must_use]
pub fn find_in_layout(positions: &[MatrixPosition], query: &str) -> Vec<SlotIndex> {
    let query = query.trim();
    if query.is_empty() {
        return vec![];
    }

    positions
        .iter()
        .filter(|p| {
            p.occupant_id
                .map_or(false, |id| id.to_string().contains(query))
        })
        .map(|p| p.slot_index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn me() -> UserId {
        UserId::new(4_242_424).unwrap()
    }

    /// Proposes the same class for every slot
    struct Always(SlotClass);

    impl SlotClassifier for Always {
        fn classify(&mut self, _: SlotIndex, _: Level, _: &MatrixStats) -> SlotClass {
            self.0
        }
    }

    #[derive(Clone, Debug)]
    struct ArbStats(MatrixStats);

    impl Arbitrary for ArbStats {
        fn arbitrary(g: &mut Gen) -> Self {
            Self(MatrixStats {
                active_positions: u32::arbitrary(g) % 16,
                partners: u32::arbitrary(g) % 16,
                charity_places: u32::arbitrary(g) % 16,
                tech_places: u32::arbitrary(g) % 16,
                earnings: Default::default(),
                cycles: u32::arbitrary(g) % 4,
            })
        }
    }

    fn count(positions: &[MatrixPosition], kind: OccupantKind) -> u32 {
        positions.iter().filter(|p| p.occupant_kind == kind).count() as u32
    }

    #[quickcheck]
    fn layout_shape_holds(stats: ArbStats, level: u8, seed: u64) -> bool {
        let level = Level::new(level % LEVEL_COUNT + 1).unwrap();
        let mut classifier = RandomClassifier::new(ChaCha8Rng::seed_from_u64(seed));
        let positions = layout_level(me(), level, Some(&stats.0), &mut classifier);

        positions.len() == SLOT_COUNT as usize
            && positions[0] == MatrixPosition::owner(me(), level)
            && positions
                .iter()
                .enumerate()
                .all(|(i, p)| p.slot_index.get() as usize == i + 1)
            && count(&positions, OccupantKind::Owner) == 1
            && count(&positions, OccupantKind::Partner) <= stats.0.partners
            && count(&positions, OccupantKind::Charity) <= stats.0.charity_places
            && count(&positions, OccupantKind::Technical) <= stats.0.tech_places
            && positions
                .iter()
                .all(|p| p.occupant_id.is_some() == p.occupant_kind.has_occupant())
    }

    #[test]
    fn missing_stats_leave_everything_empty() {
        let mut classifier = Always(SlotClass::Blocked);
        let positions = layout_level(me(), Level::MAX, None, &mut classifier);

        assert_eq!(positions.len(), 15);
        assert_eq!(positions[0].occupant_kind, OccupantKind::Owner);
        assert_eq!(positions[0].occupant_level, Some(Level::MAX));
        assert!(positions[1..]
            .iter()
            .all(|p| p.occupant_kind == OccupantKind::Empty && p.occupant_id.is_none()));
    }

    #[test]
    fn zero_partners_means_no_partner_slots() {
        let occupant = Occupant {
            id: UserId::new(3_000_000).unwrap(),
            level: Level::MIN,
        };
        let mut classifier = Always(SlotClass::Partner(occupant));
        let stats = MatrixStats::default();
        let positions = layout_level(me(), Level::MIN, Some(&stats), &mut classifier);

        assert_eq!(count(&positions, OccupantKind::Partner), 0);
        assert_eq!(count(&positions, OccupantKind::Empty), 14);
    }

    #[test]
    fn excess_proposals_are_demoted() {
        let mut classifier = Always(SlotClass::Charity);
        let stats = MatrixStats {
            charity_places: 3,
            ..MatrixStats::default()
        };
        let positions = layout_level(me(), Level::MIN, Some(&stats), &mut classifier);

        let charity: Vec<u8> = positions
            .iter()
            .filter(|p| p.occupant_kind == OccupantKind::Charity)
            .map(|p| p.slot_index.get())
            .collect();
        assert_eq!(charity, vec![2, 3, 4]);
    }

    #[test]
    fn rows_are_one_two_four_eight() {
        let positions = layout_level(me(), Level::MIN, None, &mut Always(SlotClass::Empty));
        let mut per_row = [0; 4];
        for p in &positions {
            per_row[p.row() as usize] += 1;
        }
        assert_eq!(per_row, [1, 2, 4, 8]);
    }

    #[test]
    fn boxed_classifiers_lay_out_levels() {
        let mut classifier = ClassifierKind::Sequential.build(vec![Occupant {
            id: UserId::new(2_222_222).unwrap(),
            level: Level::MIN,
        }]);
        let stats = MatrixStats {
            partners: 1,
            tech_places: 1,
            ..MatrixStats::default()
        };
        let positions = layout_level(me(), Level::MIN, Some(&stats), &mut classifier);

        assert_eq!(positions[1].occupant_kind, OccupantKind::Partner);
        assert_eq!(positions[2].occupant_kind, OccupantKind::Technical);
        assert_eq!(find_in_layout(&positions, "2222"), vec![positions[1].slot_index]);
        assert_eq!(find_in_layout(&positions, "4242"), vec![SlotIndex::OWNER]);
        assert!(find_in_layout(&positions, " ").is_empty());
    }
}
