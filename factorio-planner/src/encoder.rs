// Copyright 2024 Zachary Stewart
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when translating between labels and encoded ids.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelError {
    #[error("label '{0}' is not in the trained vocabulary")]
    UnknownLabel(String),
    #[error("label id {0} is out of the trained range")]
    UnknownId(usize),
}

/// Bidirectional mapping between labels and dense 0-based integer ids.
///
/// Ids are assigned in sorted label order, so identical label collections
/// encode identically across runs.
#[derive(Debug, Clone)]
pub struct LabelEncoder<T> {
    decode_table: Vec<T>,
    encode_table: HashMap<T, usize>,
}

impl<T> Default for LabelEncoder<T> {
    fn default() -> Self {
        LabelEncoder {
            decode_table: Vec::new(),
            encode_table: HashMap::new(),
        }
    }
}

impl<T> LabelEncoder<T>
where
    T: Clone + Ord + Hash + fmt::Display,
{
    pub fn new() -> Self {
        LabelEncoder {
            decode_table: Vec::new(),
            encode_table: HashMap::new(),
        }
    }

    /// Drop any previously trained mapping.
    pub fn reset(&mut self) {
        self.decode_table.clear();
        self.encode_table.clear();
    }

    /// Train the encoder on a collection of labels, replacing any previous
    /// training. Duplicate labels collapse to one id.
    pub fn train(&mut self, labels: impl IntoIterator<Item = T>) {
        self.reset();
        self.decode_table = labels.into_iter().collect();
        self.decode_table.sort();
        self.decode_table.dedup();
        self.encode_table = self
            .decode_table
            .iter()
            .enumerate()
            .map(|(id, label)| (label.clone(), id))
            .collect();
    }

    /// Translate a label to its id.
    pub fn encode(&self, label: &T) -> Result<usize, LabelError> {
        self.encode_table
            .get(label)
            .copied()
            .ok_or_else(|| LabelError::UnknownLabel(label.to_string()))
    }

    /// Translate an id back to its label.
    pub fn decode(&self, id: usize) -> Result<&T, LabelError> {
        self.decode_table.get(id).ok_or(LabelError::UnknownId(id))
    }

    /// Number of trained labels.
    pub fn len(&self) -> usize {
        self.decode_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decode_table.is_empty()
    }

    /// Iterate labels in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.decode_table.iter()
    }
}
