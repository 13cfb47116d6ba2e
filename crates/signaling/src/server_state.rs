//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Ein `ServerState` pro Server-Instanz. Mehrere unabhaengige Server koennen
//! im selben Prozess laufen (z.B. in Tests), es gibt keinen globalen Zustand.

use std::sync::Arc;
use treffpunkt_auth::{CredentialStore, Mailer, STANDARD_SCHWELLE};
use treffpunkt_chat::{BotPipeline, ChatHistoryStore};
use treffpunkt_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::admission::{Zulassung, ZulassungsKonfig};
use crate::coordinator::RaumKoordinator;
use crate::registry::Verbindungsregister;
use crate::rooms::{MedienRaeume, STANDARD_RAUM_ANZAHL};

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
    /// Groesse der Send-Queue pro Sitzung
    pub queue_groesse: usize,
    /// Zulassungskontrolle pro IP
    pub zulassung: ZulassungsKonfig,
    /// Anzahl der Medien-Raeume (IDs 1..=n)
    pub medien_raeume: u32,
    /// Fehlversuche bis zur Login-Sperre
    pub login_schwelle: u32,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Treffpunkt".to_string(),
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
            queue_groesse: 64,
            zulassung: ZulassungsKonfig::default(),
            medien_raeume: STANDARD_RAUM_ANZAHL,
            login_schwelle: STANDARD_SCHWELLE,
        }
    }
}

/// Externe Kollaborateure des Servers
#[derive(Clone)]
pub struct Dienste {
    pub konten: Arc<dyn CredentialStore>,
    pub mailer: Arc<dyn Mailer>,
    pub verlauf: Arc<dyn ChatHistoryStore>,
    pub bots: Arc<dyn BotPipeline>,
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct ServerState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Zulassungskontrolle im Accept-Loop
    pub zulassung: Zulassung,
    /// Alle Sitzungen und angemeldeten Benutzer
    pub registry: Arc<Verbindungsregister>,
    /// Medien-Raeume und Flags
    pub raeume: Arc<MedienRaeume>,
    /// Chat und Raum-Signaling
    pub koordinator: RaumKoordinator,
    pub konten: Arc<dyn CredentialStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl ServerState {
    /// Erstellt einen neuen ServerState
    pub fn neu(config: SignalingConfig, dienste: Dienste) -> Arc<Self> {
        let registry = Arc::new(Verbindungsregister::neu());
        let raeume = Arc::new(MedienRaeume::neu(config.medien_raeume));
        let koordinator = RaumKoordinator::neu(
            Arc::clone(&registry),
            Arc::clone(&raeume),
            Arc::clone(&dienste.konten),
            dienste.verlauf,
            dienste.bots,
        );

        Arc::new(Self {
            zulassung: Zulassung::neu(config.zulassung),
            config: Arc::new(config),
            registry,
            raeume,
            koordinator,
            konten: dienste.konten,
            mailer: dienste.mailer,
        })
    }
}
