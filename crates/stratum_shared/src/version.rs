use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target game version. Decides build limits and which default block sets apply.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameVersion {
    pub major: u8,
    pub minor: u8,
}

impl GameVersion {
    pub const RELEASE_1_17: Self = Self::release(17);
    pub const RELEASE_1_18: Self = Self::release(18);
    pub const DEFAULT: Self = Self::release(20);

    pub const fn release(minor: u8) -> Self {
        Self { major: 1, minor }
    }

    /// Worlds from 1.18 on extend below zero and use deepslate as the deep host rock.
    pub fn is_deep_world(self) -> bool {
        self >= Self::RELEASE_1_18
    }

    /// Lowest buildable Y.
    pub fn floor(self) -> i32 {
        if self.is_deep_world() {
            -64
        } else {
            0
        }
    }

    /// Highest buildable Y.
    pub fn ceiling(self) -> i32 {
        if self.is_deep_world() {
            319
        } else {
            255
        }
    }

    /// Altitude below which the base fill switches to deepslate.
    pub fn deep_transition(self) -> Option<i32> {
        self.is_deep_world().then_some(0)
    }

    pub fn has_copper(self) -> bool {
        self >= Self::RELEASE_1_17
    }
}

impl Default for GameVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for GameVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| format!("invalid game version '{s}'"))?;
        let minor = parts
            .next()
            .map(|p| p.parse::<u8>())
            .transpose()
            .map_err(|err| format!("invalid game version '{s}': {err}"))?
            .unwrap_or(0);
        Ok(Self { major, minor })
    }
}

#[cfg(test)]
mod tests {
    use super::GameVersion;

    #[test]
    fn parses_release_strings() {
        assert_eq!("1.18".parse::<GameVersion>(), Ok(GameVersion::release(18)));
        assert_eq!("1.16.5".parse::<GameVersion>(), Ok(GameVersion::release(16)));
        assert!("beta".parse::<GameVersion>().is_err());
    }

    #[test]
    fn build_limits_follow_the_deep_world_transition() {
        let old = GameVersion::release(16);
        assert_eq!(old.floor(), 0);
        assert_eq!(old.ceiling(), 255);
        assert_eq!(old.deep_transition(), None);
        assert!(!old.has_copper());

        let new = GameVersion::release(18);
        assert_eq!(new.floor(), -64);
        assert_eq!(new.ceiling(), 319);
        assert_eq!(new.deep_transition(), Some(0));
        assert!(new.has_copper());
        assert!(GameVersion::release(17).has_copper());
    }
}
