// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Smallest assignable user id
pub const USER_ID_MIN: u32 = 1_000_000;

/// Largest assignable user id
pub const USER_ID_MAX: u32 = 9_999_999;

/// Number of distinct user ids
pub const USER_ID_SPACE: u32 = USER_ID_MAX - USER_ID_MIN + 1;

pub const USER_ID_DIGITS: usize = 7;

/// Human readable 7 digit identifier bound to a wallet address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(u32);

impl UserId {
    pub const MIN: Self = Self(USER_ID_MIN);
    pub const MAX: Self = Self(USER_ID_MAX);

    pub fn new(id: u32) -> Result<Self, &'static str> {
        if !(USER_ID_MIN..=USER_ID_MAX).contains(&id) {
            return Err("user id out of range");
        }

        Ok(Self(id))
    }

    /// Uniformly drawn id
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(USER_ID_MIN..=USER_ID_MAX))
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn checked_add(self, n: u32) -> Option<Self> {
        self.0.checked_add(n).and_then(|id| Self::new(id).ok())
    }

    /// Returns true if `s` is exactly seven ascii digits within the id range.
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        s.parse::<Self>().is_ok()
    }
}

impl FromStr for UserId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != USER_ID_DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err("user id must be 7 digits");
        }

        let id: u32 = s.parse().map_err(|_| "invalid user id")?;
        Self::new(id)
    }
}

impl TryFrom<u32> for UserId {
    type Error = &'static str;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserId").field(&self.0).finish()
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        String::serialize(&self.to_string(), serializer)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<UserId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        string
            .parse()
            .map_err(|err: &'static str| serde::de::Error::custom(err.to_owned()))
    }
}
