//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use treffpunkt_auth::STANDARD_SCHWELLE;
use treffpunkt_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use treffpunkt_signaling::{SignalingConfig, ZulassungsKonfig, STANDARD_RAUM_ANZAHL};

/// Umgebungsvariable mit dem Pfad der Konfigurationsdatei
pub const CONFIG_ENV: &str = "TREFFPUNKT_CONFIG";
/// Standard-Pfad der Konfigurationsdatei
pub const STANDARD_PFAD: &str = "config.toml";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Verbindungsbegrenzung pro IP
    pub zulassung: ZulassungsEinstellungen,
    /// Medien-Raeume
    pub medien: MedienEinstellungen,
    /// Login-Sperre
    pub login: LoginEinstellungen,
    /// Chat-Verlauf
    pub chat: ChatEinstellungen,
    /// Moderations-Bots
    pub bots: BotEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Benutzernamen, die beim Anlegen die Admin-Rolle bekommen
    pub admins: Vec<String>,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Treffpunkt".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse des Listeners
    pub bind_adresse: String,
    /// TCP-Port
    pub port: u16,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_bytes: usize,
    /// Groesse der Send-Queue pro Sitzung
    pub queue_groesse: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 500,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
            queue_groesse: 64,
        }
    }
}

/// Verbindungsbegrenzung pro IP
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZulassungsEinstellungen {
    /// Erlaubte Verbindungen pro Fenster
    pub max_verbindungen: usize,
    /// Fensterlaenge in Sekunden
    pub fenster_sek: u64,
}

impl Default for ZulassungsEinstellungen {
    fn default() -> Self {
        let standard = ZulassungsKonfig::default();
        Self {
            max_verbindungen: standard.max_verbindungen,
            fenster_sek: standard.fenster.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MedienEinstellungen {
    /// Anzahl der Medien-Raeume (IDs 1..=n)
    pub raeume: u32,
}

impl Default for MedienEinstellungen {
    fn default() -> Self {
        Self {
            raeume: STANDARD_RAUM_ANZAHL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginEinstellungen {
    /// Fehlversuche bis zur ersten Sperre
    pub fehlversuche_bis_sperre: u32,
}

impl Default for LoginEinstellungen {
    fn default() -> Self {
        Self {
            fehlversuche_bis_sperre: STANDARD_SCHWELLE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatEinstellungen {
    /// Gespeicherte Nachrichten pro Chat-Raum, 0 = unbegrenzt
    pub verlauf_limit: usize,
}

impl Default for ChatEinstellungen {
    fn default() -> Self {
        Self {
            verlauf_limit: 1000,
        }
    }
}

/// Moderations-Bots
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotEinstellungen {
    /// Praefix fuer Bot-Befehle
    pub befehls_praefix: String,
    /// Woerter, die der Filter-Bot abfaengt
    pub gesperrte_woerter: Vec<String>,
}

impl Default for BotEinstellungen {
    fn default() -> Self {
        Self {
            befehls_praefix: "!".into(),
            gesperrte_woerter: Vec::new(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Filter-Ausdruck, z.B. "info" oder "treffpunkt_signaling=debug"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Pfad aus `TREFFPUNKT_CONFIG` oder `config.toml`
    pub fn pfad_aus_env() -> String {
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| STANDARD_PFAD.into())
    }

    /// Vollstaendige Bind-Adresse des Listeners
    pub fn bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let text = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port);
        text.parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Bind-Adresse '{text}': {e}"))
    }

    /// Einstellungen fuer den Signaling-Crate
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            server_name: self.server.name.clone(),
            max_frame_groesse: self.netzwerk.max_frame_bytes,
            queue_groesse: self.netzwerk.queue_groesse.max(1),
            zulassung: ZulassungsKonfig {
                max_verbindungen: self.zulassung.max_verbindungen,
                fenster: Duration::from_secs(self.zulassung.fenster_sek),
            },
            medien_raeume: self.medien.raeume,
            login_schwelle: self.login.fehlversuche_bis_sperre,
        }
    }
}
