//! Domain identifier types with validation
//!
//! This module provides newtype wrappers for the registry's natural keys.
//! Each type ensures type safety and validates format compliance at
//! construction time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Medical card number newtype wrapper
///
/// A six character code: two uppercase ASCII letters followed by four
/// decimal digits. Globally unique across all medical cards.
///
/// # Examples
///
/// ```
/// use dmed::domain::ids::CardNumber;
/// use std::str::FromStr;
///
/// let card = CardNumber::from_str("AB1234").unwrap();
/// assert_eq!(card.as_str(), "AB1234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardNumber(String);

impl CardNumber {
    /// Creates a new CardNumber from a string
    ///
    /// # Arguments
    ///
    /// * `number` - The candidate card number
    ///
    /// # Returns
    ///
    /// Returns `Ok(CardNumber)` if the value matches `[A-Z]{2}[0-9]{4}`,
    /// `Err` otherwise
    pub fn new(number: impl Into<String>) -> Result<Self, String> {
        let number = number.into();
        if !Self::is_valid(&number) {
            return Err(format!(
                "Invalid card number '{number}'. Expected two uppercase letters followed by four digits (e.g. AB1234)"
            ));
        }
        Ok(Self(number))
    }

    fn is_valid(number: &str) -> bool {
        let bytes = number.as_bytes();
        bytes.len() == 6
            && bytes[..2].iter().all(|b| b.is_ascii_uppercase())
            && bytes[2..].iter().all(|b| b.is_ascii_digit())
    }

    /// Returns the card number as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CardNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for CardNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// JSHSHIR newtype wrapper
///
/// The 14-digit national passport/ID number that uniquely identifies a
/// staff user.
///
/// # Examples
///
/// ```
/// use dmed::domain::ids::Jshshir;
/// use std::str::FromStr;
///
/// let jshshir = Jshshir::from_str("12345678901234").unwrap();
/// assert_eq!(jshshir.as_str(), "12345678901234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Jshshir(String);

impl Jshshir {
    /// Creates a new Jshshir from a string
    ///
    /// # Arguments
    ///
    /// * `id` - The candidate identifier
    ///
    /// # Returns
    ///
    /// Returns `Ok(Jshshir)` if the value is exactly 14 ASCII digits,
    /// `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.len() != 14 || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Invalid JSHSHIR '{id}'. Expected exactly 14 digits"));
        }
        Ok(Self(id))
    }

    /// Returns the JSHSHIR as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Jshshir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Jshshir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Jshshir {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_card_number_creation() {
        let card = CardNumber::new("AB1234").unwrap();
        assert_eq!(card.as_str(), "AB1234");
    }

    #[test_case(""; "empty")]
    #[test_case("AB123"; "too short")]
    #[test_case("AB12345"; "too long")]
    #[test_case("ab1234"; "lowercase letters")]
    #[test_case("A12345"; "one letter only")]
    #[test_case("ABC123"; "three letters")]
    #[test_case("AB12Z4"; "letter among digits")]
    #[test_case("ЯБ1234"; "non ascii letters")]
    fn test_card_number_invalid(input: &str) {
        assert!(CardNumber::new(input).is_err());
    }

    #[test]
    fn test_card_number_display() {
        let card = CardNumber::new("ZZ9999").unwrap();
        assert_eq!(format!("{}", card), "ZZ9999");
    }

    #[test]
    fn test_card_number_from_str() {
        let card: CardNumber = "CD5678".parse().unwrap();
        assert_eq!(card.as_str(), "CD5678");
    }

    #[test]
    fn test_card_number_serialization() {
        let card = CardNumber::new("AB1234").unwrap();
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(json, "\"AB1234\"");
        let deserialized: CardNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(card, deserialized);
    }

    #[test]
    fn test_jshshir_creation() {
        let jshshir = Jshshir::new("12345678901234").unwrap();
        assert_eq!(jshshir.as_str(), "12345678901234");
    }

    #[test_case(""; "empty")]
    #[test_case("1234567890123"; "thirteen digits")]
    #[test_case("123456789012345"; "fifteen digits")]
    #[test_case("1234567890123a"; "trailing letter")]
    #[test_case("12 345678901234"; "embedded space")]
    fn test_jshshir_invalid(input: &str) {
        assert!(Jshshir::new(input).is_err());
    }

    #[test]
    fn test_jshshir_from_str() {
        let jshshir: Jshshir = "98765432109876".parse().unwrap();
        assert_eq!(jshshir.as_str(), "98765432109876");
    }
}
