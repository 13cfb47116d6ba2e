//! Fehlertypen fuer den Signaling-Service

use thiserror::Error;
use treffpunkt_auth::AuthError;
use treffpunkt_chat::ChatError;
use treffpunkt_crypto::CryptoError;
use treffpunkt_protocol::ProtokollFehler;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket, Framing)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Handshake oder Frame-Verschluesselung fehlgeschlagen
    #[error("Kryptofehler: {0}")]
    Krypto(#[from] CryptoError),

    /// Kodierung einer ausgehenden Nachricht fehlgeschlagen
    #[error("Kodierfehler: {0}")]
    Kodierung(#[from] ProtokollFehler),

    #[error("Authentifizierungsfehler: {0}")]
    Auth(#[from] AuthError),

    #[error("Chatfehler: {0}")]
    Chat(#[from] ChatError),

    /// Verbindung wurde getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Protokollfehler (ungueltiges Frame, falscher Zustand)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Berechtigung verweigert
    #[error("Berechtigung verweigert: {0}")]
    ZugriffVerweigert(String),

    /// Medien-Raum existiert nicht
    #[error("Unbekannter Raum: {0}")]
    UnbekannterRaum(u32),

    /// Benutzer ist nicht Mitglied des Raums
    #[error("Nicht im Raum: {0}")]
    NichtImRaum(u32),

    /// Benutzer hat bereits eine angemeldete Sitzung
    #[error("Benutzer ist bereits verbunden")]
    BereitsVerbunden,

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl SignalingError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
