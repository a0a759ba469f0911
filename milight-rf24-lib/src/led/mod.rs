// Color and brightness conversion between the familiar RGB/HSV/percent
// representations and the encodings the bridge puts on the wire.
pub mod brightness;
pub mod led_color;
