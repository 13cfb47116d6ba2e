//! Fehlertypen fuer das Chat-Crate

use thiserror::Error;

/// Chat-Fehlertypen
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Speicher-Fehler: {0}")]
    SpeicherFehler(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
