// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! # GlobalWay Core
//! Client-side core of the GlobalWay referral platform.
//!
//! ## Features
//! * **Identity registry**: every wallet address that connects is bound to a stable, random 7 digit user id. Ids are never reused and the mapping survives restarts.
//! * **Referral links**: each id yields a shareable link (`https://globalway.club/ref1234567`). Incoming links are parsed back into the sponsor's id, and from there to the sponsor's address.
//! * **Matrix view**: each of the 12 levels owns a binary matrix of 15 slots. The layout is computed from the per-level statistics reported by the contract.
//!
//! The contract reader and the wallet provider are external collaborators, see
//! [`matrix::MatrixStatsSource`] and [`session::WalletEvent`].

pub mod codec;
pub mod global;
pub mod matrix;
pub mod primitives;
pub mod registry;
pub mod session;
pub mod settings;
pub mod store;
