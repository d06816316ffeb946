// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::primitives::UserId;
use lazy_static::*;
use regex::Regex;
use std::str::FromStr;

lazy_static! {
    /// `/ref1234567`, not followed by another digit
    static ref PATH_REF: Regex = Regex::new(r"/ref(\d{7})(?:\D|$)").unwrap();

    /// `?ref=1234567` or `&ref=1234567`, not followed by another digit
    static ref QUERY_REF: Regex = Regex::new(r"[?&]ref=(\d{7})(?:\D|$)").unwrap();

    /// Same segment as `PATH_REF`, the terminator is captured to be put back
    static ref STRIP_PATH_REF: Regex = Regex::new(r"/ref\d{7}(\D|$)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralStyle {
    /// `{base}/ref1234567`
    Path,

    /// `{base}/?ref=1234567`
    Query,
}

impl FromStr for ReferralStyle {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(Self::Path),
            "query" => Ok(Self::Query),
            _ => Err("referral style must be `path` or `query`"),
        }
    }
}

/// Builds referral links pointing at `base_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralFormat {
    base_url: String,
    style: ReferralStyle,
}

impl ReferralFormat {
    #[must_use]
    pub fn new(base_url: &str, style: ReferralStyle) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            style,
        }
    }

    /// Reads the format from the global settings
    pub fn from_settings() -> Result<Self, &'static str> {
        let settings = &crate::settings::SETTINGS.referral;
        Ok(Self::new(&settings.base_url, settings.style.parse()?))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn style(&self) -> ReferralStyle {
        self.style
    }

    #[must_use]
    pub fn link(&self, id: UserId) -> String {
        match self.style {
            ReferralStyle::Path => format!("{}/ref{id}", self.base_url),
            ReferralStyle::Query => format!("{}/?ref={id}", self.base_url),
        }
    }
}

impl Default for ReferralFormat {
    fn default() -> Self {
        Self::new("https://globalway.club", ReferralStyle::Path)
    }
}

/// Extracts the sponsor id embedded in an incoming url.
///
/// Both link styles are recognized regardless of the configured one. The
/// first valid path form id wins, then the first valid query form id.
#[must_use]
pub fn parse_referral_id(url: &str) -> Option<UserId> {
    PATH_REF
        .captures_iter(url)
        .chain(QUERY_REF.captures_iter(url))
        .find_map(|caps| caps.get(1)?.as_str().parse().ok())
}

/// Removes an embedded `/ref{id}` path segment from a landing url.
#[must_use]
pub fn strip_referral(url: &str) -> String {
    STRIP_PATH_REF.replace(url, "${1}").into_owned()
}
