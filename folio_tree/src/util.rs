// Copyright 2025 the Folio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::types::{DataMap, KeyStrategy};

/// Returns true if every field of `partial` already has an equal value in `data`.
///
/// An empty patch is trivially equal.
pub(crate) fn is_partial_shallow_equal(partial: &DataMap, data: &DataMap) -> bool {
    partial
        .iter()
        .all(|(name, value)| data.get(name).is_some_and(|current| current == value))
}

/// Produces keys for nodes whose source omits one.
#[derive(Debug, Default)]
pub(crate) struct KeyGen {
    strategy: KeyStrategy,
    counter: u64,
}

impl KeyGen {
    pub(crate) fn new(strategy: KeyStrategy) -> Self {
        Self {
            strategy,
            counter: 0,
        }
    }

    pub(crate) fn next_key(&mut self) -> String {
        match &self.strategy {
            KeyStrategy::Random => uuid::Uuid::new_v4().to_string(),
            KeyStrategy::Sequential { prefix } => {
                let key = format!("{prefix}-{}", self.counter);
                self.counter += 1;
                key
            }
        }
    }
}
