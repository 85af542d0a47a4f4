use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
    Unknown,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    pub fn from_code(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GK" => Position::Goalkeeper,
            "DF" => Position::Defender,
            "MF" => Position::Midfielder,
            "FW" => Position::Forward,
            _ => Position::Unknown,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DF",
            Position::Midfielder => "MF",
            Position::Forward => "FW",
            Position::Unknown => "Unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Goalkeeper => "Goalkeeper",
            Position::Defender => "Defender",
            Position::Midfielder => "Midfielder",
            Position::Forward => "Forward",
            Position::Unknown => "Unknown",
        }
    }
}

/// First listed position of a raw `Pos` cell ("FW,MF" is a forward).
pub fn main_position(raw: &str) -> Position {
    raw.split(',')
        .next()
        .map(Position::from_code)
        .unwrap_or(Position::Unknown)
}

/// One row of the player table. Built once by the loader and never mutated.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub nation: String,
    pub position: String,
    pub main_position: Position,
    pub squad: String,
    pub comp: String,
    pub age: Option<u32>,
    pub born: Option<u32>,
    stats: HashMap<String, f64>,
}

impl PlayerRecord {
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        position: impl Into<String>,
        squad: impl Into<String>,
        comp: impl Into<String>,
    ) -> Self {
        let position = position.into();
        Self {
            id,
            name: name.into(),
            nation: String::new(),
            main_position: main_position(&position),
            position,
            squad: squad.into(),
            comp: comp.into(),
            age: None,
            born: None,
            stats: HashMap::new(),
        }
    }

    pub fn with_nation(mut self, nation: impl Into<String>) -> Self {
        self.nation = nation.into();
        self
    }

    pub fn with_age(mut self, age: Option<u32>) -> Self {
        self.age = age;
        self
    }

    pub fn with_born(mut self, born: Option<u32>) -> Self {
        self.born = born;
        self
    }

    /// Non-finite values are treated as missing and dropped.
    pub fn with_stat(mut self, key: impl Into<String>, value: f64) -> Self {
        if value.is_finite() {
            self.stats.insert(key.into(), value);
        }
        self
    }

    pub fn stat(&self, key: &str) -> Option<f64> {
        self.stats.get(key).copied()
    }

    pub fn stat_or_zero(&self, key: &str) -> f64 {
        self.stat(key).unwrap_or(0.0)
    }

    pub fn stats(&self) -> impl Iterator<Item = (&str, f64)> {
        self.stats.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn minutes(&self) -> Option<f64> {
        self.stat("Min")
    }

    /// Three-letter country code when the cell looks like "es ESP".
    pub fn nation_code(&self) -> &str {
        self.nation
            .split_whitespace()
            .last()
            .unwrap_or(self.nation.as_str())
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let cleaned = s.replace(',', "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// FBref ages look like "25-123" (years-days); only the years are kept.
pub fn parse_age(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_position_takes_first_token() {
        assert_eq!(main_position("FW,MF"), Position::Forward);
        assert_eq!(main_position(" df "), Position::Defender);
        assert_eq!(main_position(""), Position::Unknown);
        assert_eq!(main_position("XX"), Position::Unknown);
    }

    #[test]
    fn parse_number_handles_separators_and_blanks() {
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number(" 0.45 "), Some(0.45));
        assert!(parse_number("").is_none());
        assert!(parse_number("-").is_none());
        assert!(parse_number("abc").is_none());
        assert!(parse_number("NaN").is_none());
    }

    #[test]
    fn parse_age_keeps_years() {
        assert_eq!(parse_age("25-123"), Some(25));
        assert_eq!(parse_age("31"), Some(31));
        assert!(parse_age("").is_none());
    }

    #[test]
    fn non_finite_stats_are_missing() {
        let p = PlayerRecord::new(PlayerId(1), "A", "FW", "X", "L")
            .with_stat("Gls", f64::NAN)
            .with_stat("Ast", 3.0);
        assert!(p.stat("Gls").is_none());
        assert_eq!(p.stat("Ast"), Some(3.0));
        assert_eq!(p.stat_or_zero("Gls"), 0.0);
    }

    #[test]
    fn nation_code_uses_last_token() {
        let p = PlayerRecord::new(PlayerId(1), "A", "FW", "X", "L").with_nation("es ESP");
        assert_eq!(p.nation_code(), "ESP");
    }
}
