//! Frame-Verschluesselung einer Sitzung
//!
//! AES-256-GCM mit einer Nonce pro Frame:
//!
//! ```text
//! Nonce = IV XOR ( 0x00 0x00 0x00 | richtung(1) | zaehler(8, BE) )
//! ```
//!
//! Jede Richtung zaehlt ihre Frames ab 0. Da sich die Richtungs-Bytes
//! unterscheiden, wird unter einem Schluessel keine Nonce zweimal benutzt.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::error::{CryptoError, CryptoResult};
use crate::handshake::{SitzungsSchluessel, IV_LAENGE};

/// Laenge des GCM-Tags, um die ein Frame waechst
pub const TAG_LAENGE: usize = 16;

/// Senderichtung eines Frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Richtung {
    ClientZuServer = 0,
    ServerZuClient = 1,
}

fn nonce_fuer(iv: &[u8; IV_LAENGE], richtung: Richtung, zaehler: u64) -> [u8; IV_LAENGE] {
    let mut nonce = *iv;
    nonce[3] ^= richtung as u8;
    for (ziel, byte) in nonce[4..].iter_mut().zip(zaehler.to_be_bytes()) {
        *ziel ^= byte;
    }
    nonce
}

/// Naechster Zaehlerstand; der letzte Wert wird nie benutzt
fn weiterzaehlen(zaehler: &mut u64) -> CryptoResult<u64> {
    let aktuell = *zaehler;
    *zaehler = aktuell.checked_add(1).ok_or(CryptoError::ZaehlerErschoepft)?;
    Ok(aktuell)
}

// ---------------------------------------------------------------------------
// Verschluesseler
// ---------------------------------------------------------------------------

/// Verschluesselt ausgehende Frames einer Richtung
pub struct Verschluesseler {
    cipher: Aes256Gcm,
    iv: [u8; IV_LAENGE],
    richtung: Richtung,
    zaehler: u64,
}

impl Verschluesseler {
    pub fn neu(schluessel: &SitzungsSchluessel, richtung: Richtung) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(schluessel.key())),
            iv: *schluessel.iv(),
            richtung,
            zaehler: 0,
        }
    }

    /// Verschluesselt einen Frame-Payload (Ergebnis: Chiffrat + Tag)
    pub fn verschluesseln(&mut self, klartext: &[u8]) -> CryptoResult<Vec<u8>> {
        let zaehler = weiterzaehlen(&mut self.zaehler)?;
        let nonce = nonce_fuer(&self.iv, self.richtung, zaehler);

        self.cipher
            .encrypt(Nonce::from_slice(&nonce), klartext)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
    }

    /// Anzahl bisher verschluesselter Frames
    pub fn frames(&self) -> u64 {
        self.zaehler
    }
}

// ---------------------------------------------------------------------------
// Entschluesseler
// ---------------------------------------------------------------------------

/// Entschluesselt eingehende Frames einer Richtung
///
/// Frames muessen in Sendereihenfolge ankommen (TCP garantiert das).
pub struct Entschluesseler {
    cipher: Aes256Gcm,
    iv: [u8; IV_LAENGE],
    richtung: Richtung,
    zaehler: u64,
}

impl Entschluesseler {
    pub fn neu(schluessel: &SitzungsSchluessel, richtung: Richtung) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(schluessel.key())),
            iv: *schluessel.iv(),
            richtung,
            zaehler: 0,
        }
    }

    /// Entschluesselt und authentifiziert einen Frame
    pub fn entschluesseln(&mut self, chiffrat: &[u8]) -> CryptoResult<Vec<u8>> {
        let zaehler = weiterzaehlen(&mut self.zaehler)?;
        let nonce = nonce_fuer(&self.iv, self.richtung, zaehler);

        self.cipher
            .decrypt(Nonce::from_slice(&nonce), chiffrat)
            .map_err(|_| CryptoError::Entschluesselung("Tag ungueltig".into()))
    }
}

/// Schluesselpaar fuer die Server-Seite: (ausgehend, eingehend)
pub fn fuer_server(schluessel: &SitzungsSchluessel) -> (Verschluesseler, Entschluesseler) {
    (
        Verschluesseler::neu(schluessel, Richtung::ServerZuClient),
        Entschluesseler::neu(schluessel, Richtung::ClientZuServer),
    )
}

/// Schluesselpaar fuer die Client-Seite: (ausgehend, eingehend)
pub fn fuer_client(schluessel: &SitzungsSchluessel) -> (Verschluesseler, Entschluesseler) {
    (
        Verschluesseler::neu(schluessel, Richtung::ClientZuServer),
        Entschluesseler::neu(schluessel, Richtung::ServerZuClient),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
