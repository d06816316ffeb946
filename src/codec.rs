// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Upper bound in bytes for any persisted document
pub const CODEC_BYTES_LIMIT: usize = 16_000_000;

#[derive(Debug)]
pub enum CodecErr {
    /// Document exceeds `CODEC_BYTES_LIMIT`
    LimitExceeded(usize),

    /// Json error
    Json(serde_json::Error),
}

impl std::fmt::Display for CodecErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LimitExceeded(len) => {
                write!(f, "document of {len} bytes exceeds {CODEC_BYTES_LIMIT} bytes")
            }
            Self::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for CodecErr {}

impl From<serde_json::Error> for CodecErr {
    fn from(other: serde_json::Error) -> Self {
        Self::Json(other)
    }
}

pub fn encode_to_string<T: Serialize + ?Sized>(val: &T) -> Result<String, CodecErr> {
    let encoded = serde_json::to_string(val)?;

    if encoded.len() > CODEC_BYTES_LIMIT {
        return Err(CodecErr::LimitExceeded(encoded.len()));
    }

    Ok(encoded)
}

pub fn decode<T: DeserializeOwned>(encoded: &str) -> Result<T, CodecErr> {
    if encoded.len() > CODEC_BYTES_LIMIT {
        return Err(CodecErr::LimitExceeded(encoded.len()));
    }

    Ok(serde_json::from_str(encoded)?)
}
