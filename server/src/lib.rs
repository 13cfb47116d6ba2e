//! treffpunkt-server – Bibliotheks-Root
//!
//! Baut aus der Konfiguration die Dienste zusammen und startet den
//! Signaling-Server. Als Bibliothek getrennt von `main`, damit der Aufbau
//! testbar bleibt.

pub mod config;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use treffpunkt_auth::{LogMailer, PasswortHasher, SpeicherKonten};
use treffpunkt_chat::{BefehlsBot, BotKette, SpeicherVerlauf, WortFilterBot};
use treffpunkt_signaling::{Dienste, ServerState, SignalingServer};

use config::ServerConfig;

/// Haelt den Server-Zustand bis zum Start zusammen
pub struct Server {
    pub config: ServerConfig,
    state: Arc<ServerState>,
}

impl Server {
    /// Erstellt den Server samt In-Memory-Diensten
    pub fn neu(config: ServerConfig) -> Result<Self> {
        let dienste = dienste_aufbauen(&config)?;
        let state = ServerState::neu(config.signaling_config(), dienste);
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let bind_addr = self.config.bind_adresse()?;
        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            raeume = self.config.medien.raeume,
            "Server startet"
        );

        SignalingServer::neu(self.state, bind_addr)
            .starten(shutdown_rx)
            .await?;
        Ok(())
    }
}

/// Konten, Mailer, Verlauf und Bot-Kette nach Konfiguration
pub fn dienste_aufbauen(config: &ServerConfig) -> Result<Dienste> {
    let hasher = PasswortHasher::standard()?;
    let konten = SpeicherKonten::neu(hasher).mit_admins(config.admins.iter().cloned());

    let mut bots = BotKette::neu().mit(Arc::new(BefehlsBot::neu(
        config.bots.befehls_praefix.clone(),
        config.bots.gesperrte_woerter.clone(),
    )));
    if !config.bots.gesperrte_woerter.is_empty() {
        bots = bots.mit(Arc::new(WortFilterBot::neu(
            config.bots.gesperrte_woerter.iter().cloned(),
        )));
    }
    let verlauf = match config.chat.verlauf_limit {
        0 => SpeicherVerlauf::neu(),
        limit => SpeicherVerlauf::mit_limit(limit),
    };
    tracing::debug!(
        bots = bots.anzahl(),
        admins = config.admins.len(),
        verlauf_limit = config.chat.verlauf_limit,
        "Dienste aufgebaut"
    );

    Ok(Dienste {
        konten: Arc::new(konten),
        mailer: Arc::new(LogMailer),
        verlauf: Arc::new(verlauf),
        bots: Arc::new(bots),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use treffpunkt_auth::{CredentialStore, NeuesKonto};
    use chrono::Utc;
    use treffpunkt_chat::{ChatEintrag, ChatHistoryStore};
    use treffpunkt_core::{ChatRaumId, Rolle, UserId};

    #[tokio::test]
    async fn admins_aus_konfiguration() {
        let mut config = ServerConfig::default();
        config.admins = vec!["chef".into()];
        let server = Server::neu(config).unwrap();

        let profil = server
            .state()
            .konten
            .anlegen(NeuesKonto {
                username: "chef".into(),
                passwort: "geheim".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(profil.rolle, Rolle::Admin);
    }

    #[tokio::test]
    async fn verlauf_limit_aus_konfiguration() {
        let mut config = ServerConfig::default();
        config.chat.verlauf_limit = 2;
        let dienste = dienste_aufbauen(&config).unwrap();

        for (i, text) in ["eins", "zwei", "drei"].into_iter().enumerate() {
            dienste
                .verlauf
                .anhaengen(ChatEintrag {
                    user_id: UserId::new(),
                    username: "anna".into(),
                    text: text.into(),
                    gesendet_am: Utc::now() + chrono::Duration::seconds(i as i64),
                    chat_raum_id: ChatRaumId(1),
                })
                .await
                .unwrap();
        }

        let texte: Vec<_> = dienste
            .verlauf
            .abfragen(ChatRaumId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.text)
            .collect();
        assert_eq!(texte, vec!["zwei", "drei"]);
    }

    #[tokio::test]
    async fn server_stoppt_bei_shutdown() {
        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config.netzwerk.port = 0;
        let server = Server::neu(config).unwrap();

        let (tx, rx) = watch::channel(false);
        let lauf = tokio::spawn(server.starten(rx));
        tx.send(true).unwrap();

        let ergebnis = tokio::time::timeout(std::time::Duration::from_secs(5), lauf)
            .await
            .expect("Server haette stoppen muessen")
            .unwrap();
        assert!(ergebnis.is_ok());
    }
}
