//! Box color classes.
//!
//! The same three classes drive the infeed lines, the vision classifier,
//! order matching and warehouse bookkeeping. Persisted and configured
//! values use the upper-case names (`"BLUE"`, `"GREEN"`, `"EMPTY"`);
//! `"OTHER"` is accepted as an alias of the catch-all class.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color class of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoxColor {
    /// Blue box.
    #[serde(rename = "BLUE", alias = "blue", alias = "Blue")]
    Blue,
    /// Green box.
    #[serde(rename = "GREEN", alias = "green", alias = "Green")]
    Green,
    /// Anything the vision station did not recognize (empty crates).
    #[serde(rename = "EMPTY", alias = "OTHER", alias = "other", alias = "empty")]
    Other,
}

impl BoxColor {
    /// All classes, in line order.
    pub const ALL: [BoxColor; 3] = [BoxColor::Blue, BoxColor::Green, BoxColor::Other];

    /// Canonical persisted name.
    pub const fn as_str(self) -> &'static str {
        match self {
            BoxColor::Blue => "BLUE",
            BoxColor::Green => "GREEN",
            BoxColor::Other => "EMPTY",
        }
    }

    /// Single-character symbol used by the warehouse map.
    pub const fn symbol(self) -> char {
        match self {
            BoxColor::Blue => 'B',
            BoxColor::Green => 'G',
            BoxColor::Other => 'O',
        }
    }
}

impl fmt::Display for BoxColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown color name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown box color: {0}")]
pub struct UnknownColor(pub String);

impl FromStr for BoxColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BLUE" => Ok(BoxColor::Blue),
            "GREEN" => Ok(BoxColor::Green),
            "EMPTY" | "OTHER" => Ok(BoxColor::Other),
            _ => Err(UnknownColor(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Wrapper {
        color: BoxColor,
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("green".parse::<BoxColor>(), Ok(BoxColor::Green));
        assert_eq!(" Blue ".parse::<BoxColor>(), Ok(BoxColor::Blue));
        assert_eq!("other".parse::<BoxColor>(), Ok(BoxColor::Other));
        assert_eq!("EMPTY".parse::<BoxColor>(), Ok(BoxColor::Other));
        assert!("red".parse::<BoxColor>().is_err());
    }

    #[test]
    fn serde_uses_persisted_names() {
        let json = serde_json::to_string(&Wrapper { color: BoxColor::Other }).unwrap();
        assert_eq!(json, r#"{"color":"EMPTY"}"#);

        let parsed: Wrapper = serde_json::from_str(r#"{"color":"OTHER"}"#).unwrap();
        assert_eq!(parsed.color, BoxColor::Other);
        let parsed: Wrapper = toml::from_str(r#"color = "green""#).unwrap();
        assert_eq!(parsed.color, BoxColor::Green);
    }

    #[test]
    fn symbols_are_distinct() {
        let symbols: Vec<char> = BoxColor::ALL.iter().map(|c| c.symbol()).collect();
        assert_eq!(symbols, vec!['B', 'G', 'O']);
    }
}
