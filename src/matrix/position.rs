// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use super::MatrixErr;
use crate::primitives::UserId;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of product levels
pub const LEVEL_COUNT: u8 = 12;

/// Slots in a level matrix, rows of 1, 2, 4 and 8
pub const SLOT_COUNT: u8 = 15;

/// Product level, 1 to 12.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(LEVEL_COUNT);

    pub fn new(level: u8) -> Result<Self, MatrixErr> {
        if !(1..=LEVEL_COUNT).contains(&level) {
            return Err(MatrixErr::InvalidLevel(level));
        }

        Ok(Self(level))
    }

    #[must_use]
    pub fn get(&self) -> u8 {
        self.0
    }

    /// All levels in ascending order
    pub fn all() -> impl Iterator<Item = Level> {
        (1..=LEVEL_COUNT).map(Self)
    }

    /// Uniformly drawn level in `1..=self`
    pub fn random_up_to<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        Self(rng.gen_range(1..=self.0))
    }
}

impl TryFrom<u8> for Level {
    type Error = MatrixErr;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level({})", self.0)
    }
}

/// 1-based index of a slot, numbered breadth-first from the owner.
///
/// Slot `n` sits on row `floor(log2(n))`, so row `r` spans slots
/// `2^r..2^(r+1)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub const OWNER: Self = Self(1);

    pub fn new(slot: u8) -> Result<Self, MatrixErr> {
        if !(1..=SLOT_COUNT).contains(&slot) {
            return Err(MatrixErr::InvalidSlot(slot));
        }

        Ok(Self(slot))
    }

    #[must_use]
    pub fn get(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn row(&self) -> u8 {
        7 - self.0.leading_zeros() as u8
    }

    /// Position of the slot inside its row, starting at 0
    #[must_use]
    pub fn column(&self) -> u8 {
        self.0 - (1 << self.row())
    }

    /// Zero-based position among the slots below the owner
    #[must_use]
    pub fn ordinal(&self) -> u8 {
        self.0 - 2
    }

    /// Slots 2 to 15
    pub fn below_owner() -> impl Iterator<Item = SlotIndex> {
        (2..=SLOT_COUNT).map(Self)
    }
}

impl TryFrom<u8> for SlotIndex {
    type Error = MatrixErr;

    fn try_from(slot: u8) -> Result<Self, Self::Error> {
        Self::new(slot)
    }
}

impl From<SlotIndex> for u8 {
    fn from(slot: SlotIndex) -> u8 {
        slot.0
    }
}

impl fmt::Debug for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotIndex({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupantKind {
    /// The matrix owner, always slot 1
    #[serde(rename = "self")]
    Owner,

    #[serde(rename = "occupied-partner")]
    Partner,

    #[serde(rename = "charity")]
    Charity,

    #[serde(rename = "technical")]
    Technical,

    #[serde(rename = "blocked")]
    Blocked,

    #[serde(rename = "empty")]
    Empty,
}

impl OccupantKind {
    #[must_use]
    pub fn has_occupant(&self) -> bool {
        matches!(self, Self::Owner | Self::Partner)
    }
}

/// User sitting in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub id: UserId,
    pub level: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixPosition {
    pub slot_index: SlotIndex,
    pub occupant_kind: OccupantKind,

    /// Set for the owner and partners only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupant_id: Option<UserId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupant_level: Option<Level>,
}

impl MatrixPosition {
    #[must_use]
    pub fn owner(id: UserId, level: Level) -> Self {
        Self {
            slot_index: SlotIndex::OWNER,
            occupant_kind: OccupantKind::Owner,
            occupant_id: Some(id),
            occupant_level: Some(level),
        }
    }

    #[must_use]
    pub fn partner(slot: SlotIndex, occupant: Occupant) -> Self {
        Self {
            slot_index: slot,
            occupant_kind: OccupantKind::Partner,
            occupant_id: Some(occupant.id),
            occupant_level: Some(occupant.level),
        }
    }

    /// Position without occupant. `kind` must not be `Owner` or `Partner`.
    #[must_use]
    pub fn vacant(slot: SlotIndex, kind: OccupantKind) -> Self {
        debug_assert!(!kind.has_occupant());

        Self {
            slot_index: slot,
            occupant_kind: kind,
            occupant_id: None,
            occupant_level: None,
        }
    }

    #[must_use]
    pub fn empty(slot: SlotIndex) -> Self {
        Self::vacant(slot, OccupantKind::Empty)
    }

    #[must_use]
    pub fn row(&self) -> u8 {
        self.slot_index.row()
    }
}

/// Per-level statistics reported by the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixStats {
    pub active_positions: u32,
    pub partners: u32,
    pub charity_places: u32,
    pub tech_places: u32,

    /// Earnings in BNB
    pub earnings: Decimal,
    pub cycles: u32,
}
