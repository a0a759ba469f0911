use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::led::led_color::Rgb;
use crate::protocol::button::Button;

/// Highest disco mode the bulbs know.
pub const MAX_DISCO_MODE: u8 = 8;

/// Highest addressable zone.
pub const MAX_ZONE: u8 = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("zone {0} is outside 1..=4")]
    InvalidZone(u8),
    #[error("disco mode {0} is outside 0..=8")]
    InvalidDiscoMode(u8),
    #[error("button code {0:#04x} does not fit in four bits")]
    InvalidButton(u8),
    #[error("remote id must be four hex digits, got {0:?}")]
    InvalidRemoteId(String),
}

/// Identifier of a paired remote: its two address bytes as four hex digits.
///
/// The id is kept exactly as written; `"1A2B"` and `"1a2b"` stay distinct
/// strings, the bridge accepts both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Takes an id off the wire without validation.
    pub(crate) fn from_wire(id: String) -> Self {
        RemoteId(id)
    }
}

impl FromStr for RemoteId {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 4 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(RemoteId(s.to_string()))
        } else {
            Err(CommandError::InvalidRemoteId(s.to_string()))
        }
    }
}

impl From<u16> for RemoteId {
    fn from(id: u16) -> Self {
        RemoteId(format!("{:04x}", id))
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bulb group of a remote, 1 to 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone(u8);

impl Zone {
    pub fn new(zone: u8) -> Result<Self, CommandError> {
        if (1..=MAX_ZONE).contains(&zone) {
            Ok(Zone(zone))
        } else {
            Err(CommandError::InvalidZone(zone))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Zone {
    type Error = CommandError;

    fn try_from(zone: u8) -> Result<Self, Self::Error> {
        Zone::new(zone)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetColor(Rgb),
    SetBrightness { percent: u8 },
    SendButton { button: Button, long_press: bool },
    SendDiscoMode { mode: u8 },
}

impl Command {
    pub fn disco_mode(mode: u8) -> Result<Self, CommandError> {
        let command = Command::SendDiscoMode { mode };
        command.validate()?;
        Ok(command)
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        match *self {
            Command::SendDiscoMode { mode } if mode > MAX_DISCO_MODE => {
                Err(CommandError::InvalidDiscoMode(mode))
            }
            _ => Ok(()),
        }
    }

    /// How many padding lines follow the packet on the wire.
    pub fn repeats(&self) -> usize {
        match self {
            Command::SetColor(_) | Command::SetBrightness { .. } => 30,
            Command::SendButton { .. } | Command::SendDiscoMode { .. } => 40,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_id_parse() {
        assert_eq!("1122".parse::<RemoteId>().unwrap().as_str(), "1122");
        assert_eq!("F2eA".parse::<RemoteId>().unwrap().as_str(), "F2eA");
        assert!(matches!(
            "112".parse::<RemoteId>(),
            Err(CommandError::InvalidRemoteId(_))
        ));
        assert!("11zz".parse::<RemoteId>().is_err());
        assert_eq!(RemoteId::from(0x0a0b).as_str(), "0a0b");
    }

    #[test]
    fn test_zone_bounds() {
        assert!(Zone::new(1).is_ok());
        assert!(Zone::new(4).is_ok());
        assert_eq!(Zone::new(0), Err(CommandError::InvalidZone(0)));
        assert_eq!(Zone::try_from(5), Err(CommandError::InvalidZone(5)));
    }

    #[test]
    fn test_disco_mode_bounds() {
        assert!(Command::disco_mode(0).is_ok());
        assert!(Command::disco_mode(8).is_ok());
        assert_eq!(
            Command::disco_mode(9),
            Err(CommandError::InvalidDiscoMode(9))
        );
    }

    #[test]
    fn test_repeats_per_kind() {
        assert_eq!(Command::SetColor(Rgb::new(1, 2, 3)).repeats(), 30);
        assert_eq!(Command::SetBrightness { percent: 10 }.repeats(), 30);
        assert_eq!(
            Command::SendButton {
                button: Button::AllOn,
                long_press: false
            }
            .repeats(),
            40
        );
        assert_eq!(Command::SendDiscoMode { mode: 1 }.repeats(), 40);
    }
}
