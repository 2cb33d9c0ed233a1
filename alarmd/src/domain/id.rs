//! Alarm identifiers

use serde::{Deserialize, Serialize};

/// Caller-assigned alarm identifier (always positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(u32);

impl AlarmId {
    /// Create an id, rejecting zero
    pub fn new(id: u32) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Get the raw value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for AlarmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AlarmId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s.trim().parse().map_err(|_| format!("Invalid alarm id: {}", s))?;
        u32::try_from(raw)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| format!("Alarm id must be positive: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rejected() {
        assert!(AlarmId::new(0).is_none());
        assert_eq!(AlarmId::new(7).map(AlarmId::get), Some(7));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("12".parse::<AlarmId>().map(AlarmId::get), Ok(12));
        assert!("0".parse::<AlarmId>().is_err());
        assert!("-3".parse::<AlarmId>().is_err());
        assert!("abc".parse::<AlarmId>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(AlarmId::new(42).map(|id| id.to_string()), Some("42".to_string()));
    }
}
