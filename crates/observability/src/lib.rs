//! # treffpunkt-observability
//!
//! Structured Logging fuer den Treffpunkt-Server via tracing-subscriber.
//! Text- oder JSON-Ausgabe, Level und Format per Konfiguration oder
//! Umgebungsvariable.

pub mod logging;

pub use logging::{logging_initialisieren, LogEinstellungen, LogFormat};
