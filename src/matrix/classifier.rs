// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use super::{Level, MatrixStats, Occupant, SlotIndex};
use crate::primitives::UserId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::str::FromStr;

/// Proposed content of a slot below the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClass {
    Partner(Occupant),
    Charity,
    Technical,
    Blocked,
    Empty,
}

/// Decides what sits in each slot below the owner.
///
/// Slots are queried in ascending order, once each, for every laid out level.
pub trait SlotClassifier {
    fn classify(&mut self, slot: SlotIndex, level: Level, stats: &MatrixStats) -> SlotClass;
}

impl<T: SlotClassifier + ?Sized> SlotClassifier for Box<T> {
    fn classify(&mut self, slot: SlotIndex, level: Level, stats: &MatrixStats) -> SlotClass {
        (**self).classify(slot, level, stats)
    }
}

/// Fills slots in order: roster partners, charity places, technical places,
/// then empty.
#[derive(Debug, Clone, Default)]
pub struct SequentialClassifier {
    roster: Vec<Occupant>,
}

impl SequentialClassifier {
    #[must_use]
    pub fn new(roster: Vec<Occupant>) -> Self {
        Self { roster }
    }

    pub fn set_roster(&mut self, roster: Vec<Occupant>) {
        self.roster = roster;
    }
}

impl SlotClassifier for SequentialClassifier {
    fn classify(&mut self, slot: SlotIndex, _level: Level, stats: &MatrixStats) -> SlotClass {
        let k = slot.ordinal() as usize;
        let partners = (stats.partners as usize).min(self.roster.len());
        let charity = partners + stats.charity_places as usize;
        let tech = charity + stats.tech_places as usize;

        if k < partners {
            SlotClass::Partner(self.roster[k])
        } else if k < charity {
            SlotClass::Charity
        } else if k < tech {
            SlotClass::Technical
        } else {
            SlotClass::Empty
        }
    }
}

/// Placeholder demo data, drawn per slot with fixed row weights.
#[derive(Debug, Clone)]
pub struct RandomClassifier<R: Rng = StdRng> {
    rng: R,
}

impl RandomClassifier {
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomClassifier<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn demo_partner(&mut self, slot: SlotIndex, level: Level) -> SlotClass {
        match UserId::MIN.checked_add(u32::from(slot.get() - 1)) {
            Some(id) => SlotClass::Partner(Occupant {
                id,
                level: level.random_up_to(&mut self.rng),
            }),
            None => SlotClass::Empty,
        }
    }
}

impl<R: Rng> SlotClassifier for RandomClassifier<R> {
    fn classify(&mut self, slot: SlotIndex, level: Level, _stats: &MatrixStats) -> SlotClass {
        let roll: f64 = self.rng.gen();

        match slot.row() {
            1 if roll > 0.3 => self.demo_partner(slot, level),
            1 => SlotClass::Empty,
            2 if roll > 0.7 => self.demo_partner(slot, level),
            2 if roll > 0.5 => SlotClass::Charity,
            2 if roll > 0.3 => SlotClass::Technical,
            2 if roll > 0.1 => SlotClass::Blocked,
            2 => SlotClass::Empty,
            _ if roll > 0.8 => self.demo_partner(slot, level),
            _ => SlotClass::Empty,
        }
    }
}

/// Classifier selected in the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Sequential,
    Random,
}

impl ClassifierKind {
    pub fn from_settings() -> Result<Self, &'static str> {
        crate::settings::SETTINGS.matrix.classifier.parse()
    }

    /// Builds the classifier. `roster` is ignored by the random classifier.
    #[must_use]
    pub fn build(self, roster: Vec<Occupant>) -> Box<dyn SlotClassifier + Send> {
        match self {
            Self::Sequential => Box::new(SequentialClassifier::new(roster)),
            Self::Random => Box::new(RandomClassifier::from_entropy()),
        }
    }
}

impl FromStr for ClassifierKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(Self::Sequential),
            "random" => Ok(Self::Random),
            _ => Err("matrix classifier must be `sequential` or `random`"),
        }
    }
}
