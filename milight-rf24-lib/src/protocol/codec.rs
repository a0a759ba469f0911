use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::led::brightness::{device_code_to_percent, percent_to_device_code};
use crate::led::led_color::{milight_index_to_rgb, rgb_to_milight_hue, Rgb};
use crate::protocol::button::{Button, BUTTON_MASK, LONG_PRESS};
use crate::protocol::command::{Command, CommandError, RemoteId, Zone};

pub const CRLF: &[u8] = b"\r\n";

/// One line of repeat padding.
const PADDING_LINE: &[u8] = b".\r\n";

/// The bridge echoes this when it retransmits; it carries no status.
pub const NOISE_LINE: &str = "Resending\r\nResending\r\n";

/// Length of a status line reporting a received remote packet.
pub const STATUS_LINE_LENGTH: usize = 22;

const ZONE_MASK: u8 = 0x07;
const BRIGHTNESS_MASK: u8 = 0xF8;

/// An encoded command, ready to be written to the bridge as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    wire: Bytes,
    counter: u8,
    repeats: usize,
}

impl Packet {
    pub fn as_bytes(&self) -> &[u8] {
        &self.wire
    }

    pub fn into_bytes(self) -> Bytes {
        self.wire
    }

    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn repeats(&self) -> usize {
        self.repeats
    }

    /// The command line without its CRLF and padding.
    pub fn command_line(&self) -> &str {
        let end = self
            .wire
            .windows(CRLF.len())
            .position(|w| w == CRLF)
            .unwrap_or(self.wire.len());
        // packets are built from ASCII only
        std::str::from_utf8(&self.wire[..end]).unwrap_or_default()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{} padding)", self.command_line(), self.repeats)
    }
}

/// Builds the wire packet for `command`, stamped with `counter`.
///
/// Layout: `B<disco><id><color><brightness><button><counter>\r\n` followed by
/// one `.\r\n` line per repeat. All byte fields are two lowercase hex digits;
/// the zone lives in the low three bits of the brightness byte.
pub fn encode(
    id: &RemoteId,
    zone: Zone,
    command: &Command,
    counter: u8,
) -> Result<Packet, CommandError> {
    command.validate()?;

    let (disco, color, brightness, button) = match *command {
        Command::SetColor(rgb) => (0, rgb_to_milight_hue(rgb), 0, Button::ColorFader.code()),
        Command::SetBrightness { percent } => (
            0,
            0,
            percent_to_device_code(percent),
            Button::BrightnessFader.code(),
        ),
        Command::SendButton { button, long_press } => {
            let code = if long_press {
                button.code() | LONG_PRESS
            } else {
                button.code()
            };
            (0, 0, 0, code)
        }
        // the mode is range checked only, the disco digit stays zero
        Command::SendDiscoMode { .. } => (0, 0, 0, Button::DiscoModeMarker.code()),
    };

    let repeats = command.repeats();
    let line = format!(
        "B{}{}{:02x}{:02x}{:02x}{:02x}",
        disco,
        id,
        color,
        brightness | zone.get(),
        button,
        counter
    );

    let mut wire = BytesMut::with_capacity(line.len() + CRLF.len() + repeats * PADDING_LINE.len());
    wire.put_slice(line.as_bytes());
    wire.put_slice(CRLF);
    for _ in 0..repeats {
        wire.put_slice(PADDING_LINE);
    }

    Ok(Packet {
        wire: wire.freeze(),
        counter,
        repeats,
    })
}

/// A remote packet the bridge overheard and reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedEvent {
    /// The status line exactly as received.
    pub line: String,
    pub raw: Vec<String>,
    pub id: RemoteId,
    /// Zone bits of the brightness byte; 0 addresses all zones.
    pub zone: u8,
    pub button: Button,
    pub long_press: bool,
    pub disco_mode: Option<u8>,
    /// Brightness in percent.
    pub brightness: u8,
    pub color: Rgb,
}

impl fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} zone={} button={}{} brightness={}% color={}",
            self.id,
            self.zone,
            self.button,
            if self.long_press { " (long)" } else { "" },
            self.brightness,
            self.color
        )?;
        if let Some(mode) = self.disco_mode {
            write!(f, " disco={}", mode)?;
        }
        Ok(())
    }
}

/// Parses one CRLF-delimited status line. Anything that is not a remote
/// packet report yields `None`.
pub fn decode(line: &str) -> Option<DecodedEvent> {
    if line == NOISE_LINE || line.chars().count() != STATUS_LINE_LENGTH {
        return None;
    }

    let mut raw: Vec<String> = line.split(' ').map(str::to_string).collect();
    if raw.len() < 6 {
        return None;
    }

    let color = hex_field(&raw[3])?;
    let brightness = hex_field(&raw[4])?;
    let button = hex_field(&raw[5])?;

    let disco_mode = if button & BUTTON_MASK == Button::DiscoModeMarker.code() {
        Some(hex_field(&raw[0])? & 0x0F)
    } else {
        None
    };
    let id = RemoteId::from_wire(format!("{}{}", raw[1], raw[2]));

    raw[0] = raw[0].replacen('\n', "", 1);
    raw.pop();

    Some(DecodedEvent {
        line: line.to_string(),
        raw,
        id,
        zone: brightness & ZONE_MASK,
        button: Button::from_masked(button),
        long_press: button & LONG_PRESS != 0,
        disco_mode,
        brightness: device_code_to_percent(brightness & BRIGHTNESS_MASK),
        color: milight_index_to_rgb(color),
    })
}

/// Low byte of a hex token of any length.
fn hex_field(token: &str) -> Option<u8> {
    let digits = token.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(&digits[digits.len().saturating_sub(2)..], 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> RemoteId {
        "1122".parse().unwrap()
    }

    fn zone(n: u8) -> Zone {
        Zone::new(n).unwrap()
    }

    fn padding(repeats: usize) -> String {
        ".\r\n".repeat(repeats)
    }

    #[test]
    fn test_encode_set_color_red() {
        let packet = encode(&id(), zone(1), &Command::SetColor(Rgb::new(255, 0, 0)), 1).unwrap();
        let expected = format!("B011221a010f01\r\n{}", padding(30));
        assert_eq!(packet.as_bytes(), expected.as_bytes());
        assert_eq!(packet.command_line(), "B011221a010f01");
        assert_eq!(packet.counter(), 1);
        assert_eq!(packet.repeats(), 30);
    }

    #[test]
    fn test_encode_set_brightness() {
        let packet = encode(&id(), zone(2), &Command::SetBrightness { percent: 50 }, 7).unwrap();
        assert_eq!(packet.command_line(), "B01122001a0e07");
        assert_eq!(packet.repeats(), 30);
    }

    #[test]
    fn test_encode_button_long_press() {
        let command = Command::SendButton {
            button: Button::Group3On,
            long_press: true,
        };
        let packet = encode(&id(), zone(3), &command, 0xff).unwrap();
        assert_eq!(packet.command_line(), "B01122000317ff");
        assert_eq!(packet.as_bytes().len(), "B01122000317ff\r\n".len() + 40 * 3);
    }

    #[test]
    fn test_encode_disco_mode_keeps_disco_digit_zero() {
        let packet = encode(&id(), zone(4), &Command::SendDiscoMode { mode: 5 }, 0x10).unwrap();
        assert_eq!(packet.command_line(), "B0112200040d10");
        assert_eq!(packet.repeats(), 40);

        let other = encode(&id(), zone(1), &Command::SendDiscoMode { mode: 8 }, 1).unwrap();
        assert_eq!(other.command_line(), "B0112200010d01");
    }

    #[test]
    fn test_encode_brightness_in_missing_levels() {
        // 68 % lands on a level without a code and saturates the whole byte
        let packet = encode(&id(), zone(2), &Command::SetBrightness { percent: 68 }, 1).unwrap();
        assert_eq!(packet.command_line(), "B0112200ff0e01");
    }

    #[test]
    fn test_encode_rejects_disco_mode_out_of_range() {
        let result = encode(&id(), zone(1), &Command::SendDiscoMode { mode: 9 }, 0);
        assert_eq!(result, Err(CommandError::InvalidDiscoMode(9)));
    }

    #[test]
    fn test_decode_disco_report() {
        let line = "\nB8 11 22 1A 19 0D 05 ";
        assert_eq!(line.len(), STATUS_LINE_LENGTH);

        let event = decode(line).unwrap();
        assert_eq!(event.id.as_str(), "1122");
        assert_eq!(event.zone, 1);
        assert_eq!(event.button, Button::DiscoModeMarker);
        assert!(!event.long_press);
        assert_eq!(event.disco_mode, Some(8));
        assert_eq!(event.brightness, 52);
        assert_eq!(event.color, Rgb::new(255, 0, 0));
        assert_eq!(event.raw, vec!["B8", "11", "22", "1A", "19", "0D", "05"]);
        assert_eq!(event.line, line);
    }

    #[test]
    fn test_decode_long_press() {
        let event = decode("\nB0 F2 EA 6D B1 13 2A ").unwrap();
        assert_eq!(event.id.as_str(), "F2EA");
        assert_eq!(event.zone, 1);
        assert_eq!(event.button, Button::Group1On);
        assert!(event.long_press);
        assert_eq!(event.disco_mode, None);
        // 0xB0 falls in the dead zone and reads as full brightness
        assert_eq!(event.brightness, 100);
    }

    #[test]
    fn test_decode_ignores_noise_and_wrong_length() {
        assert_eq!(decode(NOISE_LINE), None);
        assert_eq!(decode("Resending"), None);
        assert_eq!(decode("B0 F2 EA 6D B1 13 2A"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_decode_rejects_unparseable_lines() {
        assert_eq!(decode("0123456789012345678901"), None);
        assert_eq!(decode("\nB0 F2 EA ZZ B1 13 2A "), None);
    }

    #[test]
    fn test_decode_long_hex_token_keeps_low_byte() {
        let line = "B0 1 2 123456789AB 1 F";
        assert_eq!(line.len(), STATUS_LINE_LENGTH);

        let event = decode(line).unwrap();
        assert_eq!(event.id.as_str(), "12");
        assert_eq!(event.zone, 1);
        assert_eq!(event.button, Button::ColorFader);
        assert_eq!(event.color, milight_index_to_rgb(0xab));
        assert_eq!(event.raw, vec!["B0", "1", "2", "123456789AB", "1"]);
    }

    #[test]
    fn test_decode_reads_what_encode_reports() {
        // the bridge reports a set-color packet with the same color byte
        let packet = encode(&id(), zone(2), &Command::SetColor(Rgb::new(0, 0, 255)), 3).unwrap();
        let color = &packet.command_line()[6..8];
        let line = format!("\nB0 11 22 {} 02 0F 03 ", color.to_uppercase());
        let event = decode(&line).unwrap();
        assert_eq!(event.zone, 2);
        assert_eq!(event.button, Button::ColorFader);
        assert_eq!(event.color, Rgb::new(4, 0, 255));
    }
}
