//! treffpunkt-protocol – Netzwerkprotokoll des Treffpunkt-Servers
//!
//! Dieses Crate definiert alle Nachrichten die zwischen Client und Server
//! ausgetauscht werden, ihre JSON-Kodierung mit Trenn-Token und das
//! laengenpraefixierte Framing auf dem TCP-Stream.
//!
//! ## Schichten
//!
//! ```text
//! ProtocolMessage --encode--> JSON + DELIMITER --(Batch)--> Payload
//! Payload --(AES-GCM, treffpunkt-crypto)--> Frame --FrameCodec--> [u32 LE][Bytes]
//! ```

pub mod codec;
pub mod error;
pub mod message;
pub mod wire;

pub use codec::{decode, encode, encode_batch, split, Dekodiert, DELIMITER, PROTOKOLL_VERSION};
pub use error::{ProtokollFehler, ProtokollResult};
pub use message::{ErrorCode, MedienFlags, ProtocolMessage};
pub use wire::FrameCodec;
