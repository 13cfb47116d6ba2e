//! # treffpunkt-crypto
//!
//! Transportverschluesselung einer Client-Verbindung.
//!
//! ## Ablauf
//! 1. Der Client schickt seinen RSA-Public-Key (PEM oder JSON-Parameter)
//! 2. Der Server erzeugt [`SitzungsSchluessel`] (AES-256-Key + 96-Bit-IV) und
//!    schickt ihn RSA-OAEP-verschluesselt zurueck
//! 3. Ab dann ist jeder Frame AES-256-GCM-Chiffrat mit eigener Nonce
//!
//! ## Module
//! - `handshake` - Public-Key-Import und Schluessel-Verpackung
//! - `sitzung` - Frame-Verschluesselung mit Nonce-Zaehler pro Richtung
//! - `error` - Fehlertypen

pub mod error;
pub mod handshake;
pub mod sitzung;

pub use error::{CryptoError, CryptoResult};
pub use handshake::{
    oeffentlichen_schluessel_als_json, oeffentlichen_schluessel_lesen, schluessel_entpacken,
    schluessel_verpacken, SitzungsSchluessel, MIN_RSA_BITS,
};
pub use sitzung::{
    fuer_client, fuer_server, Entschluesseler, Richtung, Verschluesseler, TAG_LAENGE,
};
