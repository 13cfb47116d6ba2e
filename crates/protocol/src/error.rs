//! Fehlertypen des Protokoll-Crates

use thiserror::Error;

/// Result-Alias fuer Protokoll-Operationen
pub type ProtokollResult<T> = std::result::Result<T, ProtokollFehler>;

#[derive(Debug, Error)]
pub enum ProtokollFehler {
    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[from] serde_json::Error),

    #[error("Nachricht ist kein JSON-Objekt")]
    KeinObjekt,

    #[error("Frame zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)")]
    FrameZuGross { laenge: usize, maximum: usize },
}
