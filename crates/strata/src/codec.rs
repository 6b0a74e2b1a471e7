// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The shared tier's value encoding.

use serde::{Serialize, de::DeserializeOwned};

pub(crate) fn encode<V: Serialize>(value: &V) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

pub(crate) fn decode<V: DeserializeOwned>(bytes: &[u8]) -> Result<V, serde_json::Error> {
    serde_json::from_slice(bytes)
}
