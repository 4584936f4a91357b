//! Wire protocol for the panel's ASCII framing
//!
//! The panel speaks a line-oriented protocol: one frame per CR-LF
//! terminated line, with an ASCII-hex length prefix, a two-character
//! message tag, a variable payload, and an additive checksum. `frame`
//! handles the outer layer, `message` the per-tag payload schemas, and
//! `omnistat` the thermostat sub-protocol tunnelled inside `T2` replies.

pub mod frame;
pub mod message;
pub mod omnistat;

pub use frame::Frame;
pub use message::MessageKind;
