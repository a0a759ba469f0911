// The bridge's ASCII line protocol: remote buttons, commands and the codec
// translating them to and from wire lines.
pub mod button;
pub mod codec;
pub mod command;
