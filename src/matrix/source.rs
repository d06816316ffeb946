// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use super::{layout_level, Level, MatrixPosition, MatrixStats, SlotClassifier};
use crate::primitives::{UserId, WalletAddress};
use async_trait::async_trait;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The contract reader could not provide statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsUnavailable(pub String);

impl std::fmt::Display for StatsUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "matrix stats unavailable: {}", self.0)
    }
}

impl std::error::Error for StatsUnavailable {}

/// Per-level statistics provider, backed by the contract in production.
#[async_trait]
pub trait MatrixStatsSource {
    async fn matrix_stats(
        &self,
        address: &WalletAddress,
        level: Level,
    ) -> Result<MatrixStats, StatsUnavailable>;
}

/// Layout of one level together with the statistics it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelView {
    pub level: Level,

    /// Zeroed when the source failed
    pub stats: MatrixStats,
    pub positions: Vec<MatrixPosition>,
}

/// Loads statistics from a source and lays out levels with a classifier.
pub struct MatrixMapper<S, C> {
    source: S,
    classifier: C,
}

impl<S, C> MatrixMapper<S, C>
where
    S: MatrixStatsSource,
    C: SlotClassifier,
{
    pub fn new(source: S, classifier: C) -> Self {
        Self { source, classifier }
    }

    pub fn classifier_mut(&mut self) -> &mut C {
        &mut self.classifier
    }

    /// Awaits the statistics of `level` and lays it out. A failing source
    /// yields the empty layout.
    pub async fn load_level(
        &mut self,
        self_id: UserId,
        address: &WalletAddress,
        level: Level,
    ) -> LevelView {
        match self.source.matrix_stats(address, level).await {
            Ok(stats) => {
                let positions = layout_level(self_id, level, Some(&stats), &mut self.classifier);
                LevelView {
                    level,
                    stats,
                    positions,
                }
            }
            Err(err) => {
                warn!("Falling back to empty matrix for level {}: {}", level, err);
                LevelView {
                    level,
                    stats: MatrixStats::default(),
                    positions: layout_level(self_id, level, None, &mut self.classifier),
                }
            }
        }
    }

    /// Loads levels 1 to 12 one after the other.
    pub async fn load_all_levels(
        &mut self,
        self_id: UserId,
        address: &WalletAddress,
    ) -> BTreeMap<Level, LevelView> {
        let mut views = BTreeMap::new();

        for level in Level::all() {
            let view = self.load_level(self_id, address, level).await;
            views.insert(level, view);
        }

        debug!("Loaded {} matrix levels for {}", views.len(), address);
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{OccupantKind, SequentialClassifier};
    use parking_lot::Mutex;

    /// Answers from a fixed table and records every request
    #[derive(Default)]
    struct FakeSource {
        stats: BTreeMap<u8, MatrixStats>,
        requests: Mutex<Vec<u8>>,
    }

    #[async_trait]
    impl MatrixStatsSource for FakeSource {
        async fn matrix_stats(
            &self,
            _address: &WalletAddress,
            level: Level,
        ) -> Result<MatrixStats, StatsUnavailable> {
            self.requests.lock().push(level.get());
            self.stats
                .get(&level.get())
                .cloned()
                .ok_or_else(|| StatsUnavailable("execution reverted".to_owned()))
        }
    }

    fn me() -> UserId {
        UserId::new(1_111_111).unwrap()
    }

    #[tokio::test]
    async fn failing_source_falls_back_to_empty_layout() {
        let mut mapper = MatrixMapper::new(FakeSource::default(), SequentialClassifier::default());
        let view = mapper
            .load_level(me(), &WalletAddress::random(), Level::new(2).unwrap())
            .await;

        assert_eq!(view.stats, MatrixStats::default());
        assert_eq!(view.positions.len(), 15);
        assert_eq!(view.positions[0].occupant_id, Some(me()));
        assert!(view.positions[1..]
            .iter()
            .all(|p| p.occupant_kind == OccupantKind::Empty));
    }

    #[tokio::test]
    async fn available_stats_drive_the_layout() {
        let mut source = FakeSource::default();
        source.stats.insert(
            3,
            MatrixStats {
                charity_places: 2,
                ..MatrixStats::default()
            },
        );
        let mut mapper = MatrixMapper::new(source, SequentialClassifier::default());
        let view = mapper
            .load_level(me(), &WalletAddress::random(), Level::new(3).unwrap())
            .await;

        assert_eq!(view.positions[1].occupant_kind, OccupantKind::Charity);
        assert_eq!(view.positions[2].occupant_kind, OccupantKind::Charity);
        assert_eq!(view.positions[3].occupant_kind, OccupantKind::Empty);
    }

    #[tokio::test]
    async fn all_levels_load_in_order() {
        let mut source = FakeSource::default();
        source.stats.insert(1, MatrixStats::default());
        let mut mapper = MatrixMapper::new(source, SequentialClassifier::default());
        let views = mapper.load_all_levels(me(), &WalletAddress::random()).await;

        assert_eq!(views.len(), 12);
        assert_eq!(
            *mapper.source.requests.lock(),
            (1..=12).collect::<Vec<u8>>()
        );
        assert!(views
            .iter()
            .all(|(level, view)| view.level == *level && view.positions.len() == 15));
    }
}
