//! Numeric-or-group operands
//!
//! A literal is `N`, `N-M`, or `@group`. Each bound keeps the radix it was
//! written in so that the compiled form can be printed back faithfully.

use super::group::{GroupResolver, NumberGroup};
use crate::error::{ConditionError, Result};
use crate::validation::validate_group_name;
use std::fmt;
use std::sync::Arc;

/// Radix a bound was written in
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberRadix {
    Decimal,
    Octal,
    Hexadecimal,
}

impl NumberRadix {
    fn base(self) -> u32 {
        match self {
            NumberRadix::Decimal => 10,
            NumberRadix::Octal => 8,
            NumberRadix::Hexadecimal => 16,
        }
    }

    fn write(self, f: &mut fmt::Formatter<'_>, value: u64) -> fmt::Result {
        match self {
            NumberRadix::Decimal => write!(f, "{}", value),
            NumberRadix::Octal => write!(f, "0{:o}", value),
            NumberRadix::Hexadecimal => write!(f, "0x{:X}", value),
        }
    }
}

/// Closed interval `[min, max]` or a reference to a number group
#[derive(Debug, Clone)]
pub struct NumberUnion {
    values: [u64; 2],
    radix: [NumberRadix; 2],
    group: Option<Arc<NumberGroup>>,
}

impl NumberUnion {
    /// Interval operand
    pub fn range(min: u64, max: u64) -> Self {
        NumberUnion {
            values: [min, max],
            radix: [NumberRadix::Decimal; 2],
            group: None,
        }
    }

    /// Single value operand
    pub fn value(value: u64) -> Self {
        Self::range(value, value)
    }

    /// Group operand
    pub fn group(group: Arc<NumberGroup>) -> Self {
        NumberUnion {
            values: [0, 0],
            radix: [NumberRadix::Decimal; 2],
            group: Some(group),
        }
    }

    /// Parse `N`, `N-M` or `@name`.
    ///
    /// `@name` must resolve through `groups`.
    pub fn parse(word: &str, groups: &dyn GroupResolver) -> Result<Self> {
        if let Some(name) = word.strip_prefix('@') {
            validate_group_name(name)?;
            let group = groups
                .number_group(name)
                .ok_or_else(|| ConditionError::UnknownGroup {
                    name: name.to_string(),
                })?;
            return Ok(Self::group(group));
        }

        let (min, min_radix, rest) =
            parse_ulong(word).ok_or_else(|| ConditionError::invalid_number(word))?;
        if rest.is_empty() {
            return Ok(NumberUnion {
                values: [min, min],
                radix: [min_radix, min_radix],
                group: None,
            });
        }

        let rest = rest
            .strip_prefix('-')
            .ok_or_else(|| ConditionError::invalid_number(word))?;
        let (max, max_radix, rest) =
            parse_ulong(rest).ok_or_else(|| ConditionError::invalid_number(word))?;
        if !rest.is_empty() {
            return Err(ConditionError::invalid_number(word));
        }
        if min > max {
            return Err(ConditionError::InvalidRange {
                operand: word.to_string(),
            });
        }

        Ok(NumberUnion {
            values: [min, max],
            radix: [min_radix, max_radix],
            group: None,
        })
    }

    pub fn min(&self) -> u64 {
        self.values[0]
    }

    pub fn max(&self) -> u64 {
        self.values[1]
    }

    pub fn radix(&self) -> [NumberRadix; 2] {
        self.radix
    }

    pub fn as_group(&self) -> Option<&Arc<NumberGroup>> {
        self.group.as_ref()
    }

    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    /// Interval overlap with `[min, max]`
    pub fn overlaps(&self, min: u64, max: u64) -> bool {
        min <= self.values[1] && max >= self.values[0]
    }

    /// Feed the operand into a fingerprint hasher
    pub(crate) fn hash_into(&self, hasher: &mut xxhash_rust::xxh3::Xxh3) {
        match &self.group {
            Some(group) => {
                hasher.update(&[1]);
                hasher.update(group.name().as_bytes());
                hasher.update(&[0]);
            }
            None => {
                hasher.update(&[0]);
                hasher.update(&self.values[0].to_le_bytes());
                hasher.update(&self.values[1].to_le_bytes());
                hasher.update(&[self.radix[0] as u8, self.radix[1] as u8]);
            }
        }
    }
}

impl PartialEq for NumberUnion {
    fn eq(&self, other: &Self) -> bool {
        let same_group = match (&self.group, &other.group) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_group && self.values == other.values && self.radix == other.radix
    }
}

impl Eq for NumberUnion {}

impl fmt::Display for NumberUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(group) = &self.group {
            return write!(f, "@{}", group.name());
        }
        self.radix[0].write(f, self.values[0])?;
        if self.values[0] != self.values[1] {
            f.write_str("-")?;
            self.radix[1].write(f, self.values[1])?;
        }
        Ok(())
    }
}

/// Parse an unsigned integer prefix.
///
/// `0x`/`0X` selects hex, a leading `0` followed by an octal digit selects
/// octal. Returns the value, its radix and the unparsed remainder.
pub(crate) fn parse_ulong(s: &str) -> Option<(u64, NumberRadix, &str)> {
    let bytes = s.as_bytes();
    let (radix, digits) = match bytes {
        [b'0', b'x' | b'X', ..] => (NumberRadix::Hexadecimal, &s[2..]),
        [b'0', b'0'..=b'7', ..] => (NumberRadix::Octal, &s[1..]),
        _ => (NumberRadix::Decimal, s),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix.base()))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = u64::from_str_radix(&digits[..end], radix.base()).ok()?;
    Some((value, radix, &digits[end..]))
}
