//! Protocol module containing message types, the binary codec, and stream
//! reassembly.

pub mod codec;
pub mod framing;
pub mod messages;
pub mod sequence;

pub use codec::{decode_message, encode_message, encode_message_now, ProtocolError};
pub use framing::FrameReader;
pub use messages::*;
pub use sequence::SequenceCounter;
