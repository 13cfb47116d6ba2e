//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable, die Vorrang vor der
//! Konfigurationsdatei hat:
//! - `TP_LOG_LEVEL`: Filter-Ausdruck (z.B. `info` oder `treffpunkt_signaling=debug`)
//! - `TP_LOG_FORMAT`: Format (text/json)
//!
//! Die Peer-Adresse jeder Sitzung steht als Span-Feld an allen Ereignissen.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LEVEL: &str = "TP_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const ENV_FORMAT: &str = "TP_LOG_FORMAT";

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Liest ein Format, Gross-/Kleinschreibung ist egal
    pub fn parsen(wert: &str) -> Option<Self> {
        match wert.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Aufgeloeste Logging-Einstellungen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEinstellungen {
    pub filter: String,
    pub format: LogFormat,
}

impl LogEinstellungen {
    /// Kombiniert Konfiguration und Umgebung
    ///
    /// `env` liefert den Wert einer Umgebungsvariable. Ungueltige Formate
    /// fallen auf Text zurueck, ein leerer Filter auf `info`.
    pub fn aufloesen(level: &str, format: &str, env: impl Fn(&str) -> Option<String>) -> Self {
        let filter = env(ENV_LEVEL)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| level.to_string());
        let filter = if filter.trim().is_empty() {
            "info".to_string()
        } else {
            filter
        };

        let format = env(ENV_FORMAT)
            .and_then(|f| LogFormat::parsen(&f))
            .or_else(|| LogFormat::parsen(format))
            .unwrap_or_default();

        Self { filter, format }
    }
}

/// Initialisiert das Logging-System
///
/// Darf nur einmal pro Prozess aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<()> {
    let einstellungen = LogEinstellungen::aufloesen(level, format, |name| std::env::var(name).ok());
    let filter = EnvFilter::try_new(&einstellungen.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let ergebnis = match einstellungen.format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|e| anyhow!("Logging bereits initialisiert: {e}"))?;

    tracing::debug!(
        filter = %einstellungen.filter,
        format = ?einstellungen.format,
        "Logging initialisiert"
    );
    Ok(())
}
