//! Equipment items and their compact string form.
//!
//! An item is stored as `[prefix]level[suffix]`, e.g. `"12"`, `"a12"`, `"12b"` or `"a12b"`.
//! The optional prefix and suffix are single lowercase letters marking unique/enchanted
//! variants; only the level takes part in combat sums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::engine::errors::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Item {
    pub prefix: Option<char>,
    pub level: u32,
    pub suffix: Option<char>,
}

impl Item {
    pub fn new(prefix: Option<char>, level: u32, suffix: Option<char>) -> Self {
        Self {
            prefix,
            level,
            suffix,
        }
    }

    pub fn plain(level: u32) -> Self {
        Self::new(None, level, None)
    }

    /// Same affixes, different level. Items are replaced wholesale, never edited in place.
    pub fn with_level(&self, level: u32) -> Self {
        Self { level, ..*self }
    }

    /// Scale the level by `numerator / denominator`, truncating.
    pub fn scaled(&self, numerator: u32, denominator: u32) -> Self {
        let level = (self.level as u64 * numerator as u64 / denominator.max(1) as u64)
            .min(u32::MAX as u64) as u32;
        self.with_level(level)
    }

    /// Level of a raw item string: every letter is stripped and the remaining digits parsed.
    pub fn level_of(raw: &str) -> Result<u32, GameError> {
        let digits: String = raw.chars().filter(|c| !c.is_ascii_lowercase()).collect();
        digits
            .parse::<u32>()
            .map_err(|_| GameError::DataCorruption(format!("unparseable item level in {:?}", raw)))
    }
}

impl FromStr for Item {
    type Err = GameError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let corrupt = || GameError::DataCorruption(format!("malformed item {:?}", raw));
        let mut prefix = None;
        let mut digits = String::new();
        let mut suffix = None;
        // 0: optional prefix, 1: level digits, 2: suffix seen
        let mut stage = 0u8;
        for ch in raw.chars() {
            match (stage, ch) {
                (0, c) if c.is_ascii_lowercase() => {
                    prefix = Some(c);
                    stage = 1;
                }
                (0, c) if c.is_ascii_digit() => {
                    digits.push(c);
                    stage = 1;
                }
                (1, c) if c.is_ascii_digit() => digits.push(c),
                (1, c) if c.is_ascii_lowercase() && !digits.is_empty() => {
                    suffix = Some(c);
                    stage = 2;
                }
                _ => return Err(corrupt()),
            }
        }
        let level = digits.parse::<u32>().map_err(|_| corrupt())?;
        Ok(Self {
            prefix,
            level,
            suffix,
        })
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = self.prefix {
            write!(f, "{}", p)?;
        }
        write!(f, "{}", self.level)?;
        if let Some(s) = self.suffix {
            write!(f, "{}", s)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Item {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Item> for String {
    fn from(item: Item) -> Self {
        item.to_string()
    }
}
