use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::protocol::command::CommandError;

/// Bit set in the button byte when the button is held down.
pub const LONG_PRESS: u8 = 0x10;

/// Mask of the button code within the button byte.
pub const BUTTON_MASK: u8 = 0x0F;

/// Buttons of the RGBW remote, by the code the bridge uses for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[repr(u8)]
pub enum Button {
    FaderReleased = 0x00,
    AllOn = 0x01,
    AllOff = 0x02,
    Group1On = 0x03,
    Group1Off = 0x04,
    Group2On = 0x05,
    Group2Off = 0x06,
    Group3On = 0x07,
    Group3Off = 0x08,
    Group4On = 0x09,
    Group4Off = 0x0A,
    SpeedUp = 0x0B,
    SpeedDown = 0x0C,
    DiscoModeMarker = 0x0D,
    BrightnessFader = 0x0E,
    ColorFader = 0x0F,
}

impl Button {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The `On` button of a zone, `AllOn` for zone 0.
    pub fn on_for_zone(zone: u8) -> Option<Button> {
        match zone {
            0 => Some(Button::AllOn),
            1 => Some(Button::Group1On),
            2 => Some(Button::Group2On),
            3 => Some(Button::Group3On),
            4 => Some(Button::Group4On),
            _ => None,
        }
    }

    /// The `Off` button of a zone, `AllOff` for zone 0.
    pub fn off_for_zone(zone: u8) -> Option<Button> {
        Button::on_for_zone(zone).map(|on| match on {
            Button::AllOn => Button::AllOff,
            other => Button::from_masked(other.code() + 1),
        })
    }

    /// Decodes the low nibble of a button byte. Every nibble names a button.
    pub(crate) fn from_masked(byte: u8) -> Button {
        match byte & BUTTON_MASK {
            0x00 => Button::FaderReleased,
            0x01 => Button::AllOn,
            0x02 => Button::AllOff,
            0x03 => Button::Group1On,
            0x04 => Button::Group1Off,
            0x05 => Button::Group2On,
            0x06 => Button::Group2Off,
            0x07 => Button::Group3On,
            0x08 => Button::Group3Off,
            0x09 => Button::Group4On,
            0x0A => Button::Group4Off,
            0x0B => Button::SpeedUp,
            0x0C => Button::SpeedDown,
            0x0D => Button::DiscoModeMarker,
            0x0E => Button::BrightnessFader,
            _ => Button::ColorFader,
        }
    }
}

impl From<Button> for u8 {
    fn from(button: Button) -> Self {
        button.code()
    }
}

impl TryFrom<u8> for Button {
    type Error = CommandError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        if code > BUTTON_MASK {
            return Err(CommandError::InvalidButton(code));
        }
        Ok(Button::from_masked(code))
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:#04x})", self, self.code())
    }
}
