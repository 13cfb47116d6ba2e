//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
///
/// Jeder dieser Fehler beendet die betroffene Verbindung.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Ungueltiger oeffentlicher Schluessel: {0}")]
    OeffentlicherSchluessel(String),

    #[error("RSA-Schluessel zu klein: {bits} Bit (Minimum: {minimum} Bit)")]
    SchluesselZuKlein { bits: usize, minimum: usize },

    #[error("Key-Exchange fehlgeschlagen: {0}")]
    KeyExchange(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Nonce-Zaehler erschoepft")]
    ZaehlerErschoepft,

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("RSA-Fehler: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
