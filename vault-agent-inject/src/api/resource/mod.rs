// Copyright 2024 The Kubernetes Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resource quantities (e.g. "500m", "128Mi", "1.5e3").
//!
//! The accepted grammar is the one used by the Kubernetes API server:
//!
//! ```text
//! <quantity>        ::= <signedNumber><suffix>
//! <signedNumber>    ::= <number> | +<number> | -<number>
//! <number>          ::= <digits> | <digits>. | <digits>.<digits> | .<digits>
//! <suffix>          ::= <binarySI> | <decimalExponent> | <decimalSI>
//! <binarySI>        ::= Ki | Mi | Gi | Ti | Pi | Ei
//! <decimalSI>       ::= n | u | m | "" | k | M | G | T | P | E
//! <decimalExponent> ::= "e" <signedNumber> | "E" <signedNumber>
//! ```
//!
//! Values are held exactly in nano-units. Precision below one nano-unit is
//! rounded away from zero, and magnitudes beyond the representable range are
//! capped, so every string matching the grammar parses.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Message returned by the API server for malformed quantities.
pub const ERR_FORMAT_WRONG: &str =
    "quantities must match the regular expression '^([+-]?[0-9.]+)([eEinumkKMGTP]*[-+]?[0-9]*)$'";

const NANO_EXPONENT: i64 = 9;

/// Largest magnitude held, in nano-units. Larger values are capped to it.
const MAX_NANOS: i128 = i128::MAX;

/// Errors produced while parsing a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// The string does not match the quantity grammar.
    #[error("{value:?}: {}", ERR_FORMAT_WRONG)]
    InvalidQuantity { value: String },
}

impl QuantityError {
    fn invalid(value: &str) -> Self {
        QuantityError::InvalidQuantity {
            value: value.to_string(),
        }
    }
}

/// Format is the notation a quantity was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// e.g. 12e6
    DecimalExponent,
    /// e.g. 12Mi (12 * 2^20)
    BinarySI,
    /// e.g. 12M (12 * 10^6)
    DecimalSI,
}

/// Quantity is a validated resource amount.
///
/// Two quantities compare equal when they denote the same amount, so `1Gi`
/// equals `1024Mi`. The text the quantity was parsed from is retained and used
/// when the quantity is displayed or serialized.
#[derive(Debug, Clone)]
pub struct Quantity {
    nanos: i128,
    format: Format,
    text: String,
}

impl Quantity {
    /// Parse a quantity string. The empty string is rejected; use
    /// [`parse_quantity`] when empty means "unset".
    pub fn parse(raw: &str) -> Result<Self, QuantityError> {
        let (negative, rest) = match raw.as_bytes().first() {
            Some(b'-') => (true, &raw[1..]),
            Some(b'+') => (false, &raw[1..]),
            _ => (false, raw),
        };

        let int_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let int_digits = &rest[..int_end];
        let mut remainder = &rest[int_end..];

        let mut frac_digits = "";
        if let Some(after_dot) = remainder.strip_prefix('.') {
            let frac_end = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_digits = &after_dot[..frac_end];
            remainder = &after_dot[frac_end..];
        }

        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(QuantityError::invalid(raw));
        }

        let (format, exp10, exp2) = parse_suffix(remainder, raw)?;

        let int_digits = int_digits.trim_start_matches('0');
        let digits: Vec<u8> = int_digits
            .bytes()
            .chain(frac_digits.bytes())
            .map(|b| b - b'0')
            .collect();

        // Number of leading digits worth at least one nano-unit.
        let kept = int_digits.len() as i64 + i64::from(exp10) + NANO_EXPONENT;
        let split = kept.clamp(0, digits.len() as i64) as usize;

        let mut magnitude = digits[..split].iter().fold(0i128, |acc, &d| {
            acc.saturating_mul(10).saturating_add(i128::from(d))
        });
        if digits[split..].iter().any(|&d| d != 0) {
            magnitude = magnitude.saturating_add(1);
        }
        if magnitude != 0 {
            let padding = kept - split as i64;
            magnitude = match u32::try_from(padding).ok().and_then(|p| 10i128.checked_pow(p)) {
                Some(factor) => magnitude.saturating_mul(factor),
                None if padding > 0 => MAX_NANOS,
                None => magnitude,
            };
            magnitude = match 1i128.checked_shl(exp2) {
                Some(factor) => magnitude.saturating_mul(factor),
                None => MAX_NANOS,
            };
        }

        Ok(Quantity {
            nanos: if negative { -magnitude } else { magnitude },
            format,
            text: raw.to_string(),
        })
    }

    /// Returns true if the quantity denotes zero.
    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    /// The notation this quantity was written in.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Value in thousandths of a unit, rounded away from zero.
    pub fn milli_value(&self) -> i128 {
        div_away_from_zero(self.nanos, 1_000_000)
    }

    /// Value in whole units, rounded away from zero.
    pub fn value(&self) -> i128 {
        div_away_from_zero(self.nanos, 1_000_000_000)
    }

    /// The text this quantity was parsed from.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Parse an optional quantity. An empty string means the quantity is unset and
/// yields `Ok(None)`; a parsed zero yields `Ok(Some(q))` with `q.is_zero()`.
pub fn parse_quantity(raw: &str) -> Result<Option<Quantity>, QuantityError> {
    if raw.is_empty() {
        return Ok(None);
    }
    Quantity::parse(raw).map(Some)
}

const MAX_EXPONENT: i32 = 1 << 20;

/// Returns (format, base-10 exponent, base-2 exponent) for a suffix.
fn parse_suffix(suffix: &str, raw: &str) -> Result<(Format, i32, u32), QuantityError> {
    let parsed = match suffix {
        "" => (Format::DecimalSI, 0, 0),
        "n" => (Format::DecimalSI, -9, 0),
        "u" => (Format::DecimalSI, -6, 0),
        "m" => (Format::DecimalSI, -3, 0),
        "k" => (Format::DecimalSI, 3, 0),
        "M" => (Format::DecimalSI, 6, 0),
        "G" => (Format::DecimalSI, 9, 0),
        "T" => (Format::DecimalSI, 12, 0),
        "P" => (Format::DecimalSI, 15, 0),
        "E" => (Format::DecimalSI, 18, 0),
        "Ki" => (Format::BinarySI, 0, 10),
        "Mi" => (Format::BinarySI, 0, 20),
        "Gi" => (Format::BinarySI, 0, 30),
        "Ti" => (Format::BinarySI, 0, 40),
        "Pi" => (Format::BinarySI, 0, 50),
        "Ei" => (Format::BinarySI, 0, 60),
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))
                .ok_or_else(|| QuantityError::invalid(raw))?;
            let digits = exponent
                .strip_prefix('-')
                .or_else(|| exponent.strip_prefix('+'))
                .unwrap_or(exponent);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(QuantityError::invalid(raw));
            }
            // Exponents this far out already saturate or round to one nano-unit.
            let exp10 = digits.bytes().fold(0i32, |acc, b| {
                acc.saturating_mul(10)
                    .saturating_add(i32::from(b - b'0'))
                    .min(MAX_EXPONENT)
            });
            let exp10 = if exponent.starts_with('-') { -exp10 } else { exp10 };
            (Format::DecimalExponent, exp10, 0)
        }
    };
    Ok(parsed)
}

fn div_away_from_zero(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    if value % divisor == 0 {
        quotient
    } else if value < 0 {
        quotient - 1
    } else {
        quotient + 1
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Quantity::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================
