//! Password strength policy
//!
//! A password earns one point for each rule it satisfies, 13 at most:
//!
//! | Rule | Points |
//! |---|---|
//! | longer than 0, 5, 10, 15, 20 characters | 1 per tier |
//! | contains a digit, a lowercase letter, an uppercase letter | 1 per class |
//! | contains a symbol from `!@#$%^`, `&*()_+-=`, `/\`, `[]{}`, `';\|.,` | 1 per group |
//!
//! New passwords below the configured level are rejected.

use std::fmt;

use crate::{Error, Result};

const LENGTH_TIERS: [usize; 5] = [0, 5, 10, 15, 20];
const SYMBOL_GROUPS: [&str; 5] = ["!@#$%^", "&*()_+-=", "/\\", "[]{}", "';|.,"];

pub const MAX_STRENGTH_LEVEL: u8 = 13;
pub const DEFAULT_MIN_STRENGTH_LEVEL: u8 = 4;

/// Score on the 0..=13 rubric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrengthLevel(u8);

impl StrengthLevel {
    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_max(self) -> bool {
        self.0 == MAX_STRENGTH_LEVEL
    }
}

impl fmt::Display for StrengthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, MAX_STRENGTH_LEVEL)
    }
}

/// Score a password. Length counts characters, not bytes.
pub fn password_strength(password: &str) -> StrengthLevel {
    let length = password.chars().count();

    let length_points = LENGTH_TIERS.iter().filter(|&&tier| length > tier).count();

    let class_points = [
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
    ]
    .iter()
    .filter(|&&present| present)
    .count();

    let symbol_points = SYMBOL_GROUPS
        .iter()
        .filter(|group| password.chars().any(|c| group.contains(c)))
        .count();

    StrengthLevel((length_points + class_points + symbol_points) as u8)
}

/// Minimum strength required for new passwords
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_level: u8,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_level: DEFAULT_MIN_STRENGTH_LEVEL,
        }
    }
}

impl PasswordPolicy {
    pub fn new(min_level: u8) -> Self {
        Self { min_level }
    }

    pub fn check(&self, password: &str) -> Result<StrengthLevel> {
        let level = password_strength(password);
        if level.value() < self.min_level {
            return Err(Error::WeakPassword {
                level: level.value(),
                required: self.min_level,
            });
        }
        Ok(level)
    }
}
