use std::io::{self, Read, Write};
use std::thread;

use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::mpsc;

use crate::protocol::codec::CRLF;
use crate::util::config::SerialConfig;
use crate::util::traits::{LineReceiver, Transport};

/// Splits a byte stream into lines on a delimiter and decodes them as ASCII.
///
/// Bytes after the last delimiter are kept until the next push.
#[derive(Debug)]
pub struct LineSplitter {
    delimiter: &'static [u8],
    buffer: Vec<u8>,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::with_delimiter(CRLF)
    }

    pub fn with_delimiter(delimiter: &'static [u8]) -> Self {
        LineSplitter {
            delimiter,
            buffer: Vec::new(),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(end) = self
            .buffer
            .windows(self.delimiter.len())
            .position(|w| w == self.delimiter)
        {
            let line: Vec<u8> = self.buffer.drain(..end + self.delimiter.len()).collect();
            lines.push(ascii(&line[..end]));
        }
        lines
    }

    /// Bytes waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                b as char
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect()
}

/// A bridge board attached to a serial port, 8N1 without flow control.
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        SerialTransport { config, port: None }
    }

    fn port(&mut self) -> anyhow::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| anyhow!("Serial port {} is not open", self.config.port))
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> anyhow::Result<LineReceiver> {
        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .timeout(self.config.read_timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .with_context(|| format!("Failed to open serial port {}", self.config.port))?;
        let reader = port
            .try_clone()
            .context("Failed to clone serial port for reading")?;

        let (lines, receiver) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("milight-rf24-reader".to_string())
            .spawn(move || read_lines(reader, lines))
            .context("Failed to spawn serial reader thread")?;

        info!(
            "Opened serial port {} at {} baud",
            self.config.port, self.config.baud_rate
        );
        self.port = Some(port);
        Ok(receiver)
    }

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.port()?
            .write_all(bytes)
            .context("Failed to write to serial port")
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.port()?
            .flush()
            .context("Failed to flush serial port")
    }
}

fn read_lines(mut port: Box<dyn SerialPort>, lines: mpsc::UnboundedSender<String>) {
    let mut splitter = LineSplitter::new();
    let mut buffer = [0u8; 256];

    loop {
        match port.read(&mut buffer) {
            Ok(0) => {}
            Ok(n) => {
                for line in splitter.push(&buffer[..n]) {
                    if lines.send(line).is_err() {
                        debug!("Line receiver dropped, stopping serial reader");
                        return;
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                if lines.is_closed() {
                    debug!("Line receiver dropped, stopping serial reader");
                    return;
                }
            }
            Err(err) => {
                warn!("Serial read failed, stopping reader: {}", err);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_partial_line() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"B0 11 2").is_empty());
        assert_eq!(splitter.pending(), 7);
        assert_eq!(splitter.push(b"2\r\nxr"), vec!["B0 11 22"]);
        assert_eq!(splitter.pending(), 2);
    }

    #[test]
    fn test_split_several_lines_in_one_chunk() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"one\r\n\r\n\nthree\r\n");
        assert_eq!(lines, vec!["one", "", "\nthree"]);
        assert_eq!(splitter.pending(), 0);
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"Resending\r").is_empty());
        assert_eq!(splitter.push(b"\n"), vec!["Resending"]);
    }

    #[test]
    fn test_non_ascii_is_replaced() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"a\xffb\r\n"), vec!["a\u{fffd}b"]);
    }

    #[test]
    fn test_write_before_open_fails() {
        let mut transport = SerialTransport::new(SerialConfig::default());
        assert!(transport.write(b"xr\r\n").is_err());
        assert!(transport.flush().is_err());
    }
}
