// SPDX-License-Identifier: MIT
//
// Line Scoring Service
// Copyright (c) 2025 Line Scoring Service Contributors

//! Line weighting
//!
//! `(1.5 * letters + 2.0 * digits) / spaces`

/// Score reported for a line without spaces, where the weighting is undefined
pub const UNDEFINED_SCORE: f64 = -1.0;

const LETTER_WEIGHT: f64 = 1.5;
const DIGIT_WEIGHT: f64 = 2.0;

/// Weighting of a line, or [`UNDEFINED_SCORE`] if it has no spaces
pub fn score(line: &str) -> f64 {
    let mut letters = 0u32;
    let mut digits = 0u32;
    let mut spaces = 0u32;

    for c in line.chars() {
        if c.is_alphabetic() {
            letters += 1;
        } else if c.is_numeric() {
            digits += 1;
        } else if c == ' ' {
            spaces += 1;
        }
    }

    if spaces == 0 {
        return UNDEFINED_SCORE;
    }

    (LETTER_WEIGHT * f64::from(letters) + DIGIT_WEIGHT * f64::from(digits)) / f64::from(spaces)
}
