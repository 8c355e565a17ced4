// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Constrained random string generation
//!
//! Produces alphanumeric strings with a configurable number of inner spaces. Spaces are
//! never placed at either end of a string and never next to each other, and no string
//! ever contains a newline, so every generated string is a valid protocol line.
//!
//! # Randomness
//!
//! All draws (lengths, space counts, positions, characters) come from a single
//! ChaCha8 stream. With a seed the batch is reproducible byte-for-byte for a given
//! version of `rand_chacha`; without one the stream is seeded from OS entropy.
//!
//! Space positions are picked greedily from a shuffled candidate list. This is not a
//! perfectly uniform sampler over all valid placements, which is acceptable for
//! synthesizing test data.

use crate::config::GenerationConfig;
use crate::{Error, Result};
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use tracing::debug;

/// Character set used for every non-space position (`[A-Za-z0-9]`)
pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Largest number of pairwise non-adjacent spaces that fit in positions `1..=length-2`
pub fn max_spaces(length: usize) -> usize {
    length.saturating_sub(1) / 2
}

/// Immutable generated string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneratedString(String);

impl GeneratedString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of space characters
    pub fn space_count(&self) -> usize {
        self.0.bytes().filter(|&b| b == b' ').count()
    }

    /// Indices of the space characters, ascending
    pub fn space_positions(&self) -> Vec<usize> {
        self.0
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| (b == b' ').then_some(i))
            .collect()
    }
}

impl fmt::Display for GeneratedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GeneratedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Random string generator driven by a [`GenerationConfig`]
pub struct StringGenerator {
    config: GenerationConfig,
    rng: ChaCha8Rng,
}

impl StringGenerator {
    /// Create a generator, validating the configuration first
    pub fn new(config: GenerationConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate the whole batch of `config.count` strings
    ///
    /// The batch is all-or-nothing: the first infeasible string aborts generation
    /// and nothing is returned.
    pub fn generate(&mut self) -> Result<Vec<GeneratedString>> {
        self.iter().collect()
    }

    /// Lazily generate `config.count` strings
    pub fn iter(&mut self) -> impl Iterator<Item = Result<GeneratedString>> + '_ {
        let count = self.config.count;
        (0..count).map(move |_| self.generate_one())
    }

    /// Generate a single string
    pub fn generate_one(&mut self) -> Result<GeneratedString> {
        let length = self.config.length.resolve(&mut self.rng);
        let spaces = self.config.blank_spaces.resolve(&mut self.rng);

        if length == 0 || spaces > max_spaces(length) {
            return Err(Error::InsufficientLength { length, spaces });
        }

        let positions = self.place_spaces(length, spaces);
        let mut is_space = vec![false; length];
        for pos in positions {
            is_space[pos] = true;
        }

        let text = is_space
            .into_iter()
            .map(|space| {
                if space {
                    ' '
                } else {
                    ALPHANUMERIC[self.rng.gen_range(0..ALPHANUMERIC.len())] as char
                }
            })
            .collect();

        Ok(GeneratedString(text))
    }

    /// Pick `spaces` pairwise non-adjacent positions in `1..=length-2`
    ///
    /// Requires `spaces <= max_spaces(length)`.
    fn place_spaces(&mut self, length: usize, spaces: usize) -> Vec<usize> {
        if spaces == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<usize> = (1..length - 1).collect();
        candidates.shuffle(&mut self.rng);

        let mut accepted: Vec<usize> = Vec::with_capacity(spaces);
        for pos in candidates {
            if accepted.iter().all(|&p| p.abs_diff(pos) > 1) {
                accepted.push(pos);
                if accepted.len() == spaces {
                    break;
                }
            }
        }

        // The greedy pass can block itself on tight layouts (e.g. picking 2 in 1..=3).
        if accepted.len() < spaces {
            debug!(
                "Greedy placement found {}/{} spaces for length {}, using gap placement",
                accepted.len(),
                spaces,
                length
            );
            accepted = self.place_spaces_with_gaps(length, spaces);
        }

        accepted.sort_unstable();
        accepted
    }

    /// Exact placement: choose `spaces` slots out of `inner - spaces + 1` and spread
    /// them so that consecutive picks are separated by at least one character.
    fn place_spaces_with_gaps(&mut self, length: usize, spaces: usize) -> Vec<usize> {
        let inner = length - 2;
        let mut slots = index::sample(&mut self.rng, inner - spaces + 1, spaces).into_vec();
        slots.sort_unstable();
        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| 1 + slot + i)
            .collect()
    }
}
