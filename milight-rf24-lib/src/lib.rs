//! # MiLight RF24 Bridge Library
//!
//! `milight-rf24-lib` drives MiLight RGBW bulbs through an Arduino-style RF24 bridge
//! board attached to a serial port. It encodes lighting commands into the bridge's
//! ASCII packet format, sends them one at a time with the pacing the radio needs,
//! and decodes the status lines the bridge prints when it overhears a remote.
//!
//! ## Features
//!
//! - Set color, brightness, disco mode and press remote buttons per remote id and zone
//! - A paced FIFO send queue with a rolling packet counter
//! - Decoding of overheard remote packets into typed events
//! - Conversion between RGB and the bulbs' 256-step hue wheel and 25-step brightness scale
//!
//! ## Example
//!
//! ```no_run
//! use milight_rf24_lib::control_interface::{Controller, ControllerEvent, SendPayload};
//! use milight_rf24_lib::led::led_color::Rgb;
//! use milight_rf24_lib::util::config::Config;
//! use milight_rf24_lib::util::serial::SerialTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let mut controller =
//!         Controller::new(SerialTransport::new(config.serial), config.controller);
//!     let mut events = controller.subscribe();
//!
//!     let id = "1122".parse()?;
//!     controller.set_color(&id, 1, Rgb::new(255, 0, 0))?;
//!     controller.open().await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let ControllerEvent::Sending(SendPayload::QueueFinished) = event {
//!             break;
//!         }
//!     }
//!     controller.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Disclaimer
//!
//! This project is not affiliated with, authorized by, endorsed by, or in any way officially connected
//! with MiLight or its affiliates.
//!
//! ## License
//!
//! This project is dual-licensed under the MIT License and the Apache License, Version 2.0.
//! You may choose to use either license, depending on your project needs.

// The `control_interface` module owns the connection to a bridge. The `Controller`
// validates commands, queues the encoded packets and sends them after the bridge
// has warmed up, emitting an event for every packet and every decoded status line.
//
// Example usage:
//
// ```
// let controller = Controller::new(transport, ControllerConfig::default());
// controller.set_brightness(&"1122".parse()?, 2, 50)?;
// controller.open().await?;
// ```
pub mod control_interface;

// The `led` module converts between RGB colors and the bulbs' hue wheel, and between
// brightness percentages and the device's brightness codes.
//
// Example usage:
//
// ```
// use milight_rf24_lib::led::led_color::{rgb_to_milight_hue, Rgb};
//
// let hue = rgb_to_milight_hue(Rgb::new(255, 0, 0));
// assert_eq!(hue, 0x1a);
// ```
pub mod led;

// The `protocol` module holds the command model, the remote's button codes and the
// packet codec for the bridge's ASCII line format.
pub mod protocol;

// The `util` module provides the transport abstraction, the serial port transport
// and the configuration file loader.
pub mod util;
