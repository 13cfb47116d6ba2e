//! Raum-Koordinator – Chat-Verteilung und Medien-Raum-Signaling
//!
//! Verbindet Verbindungsregister, Medien-Raeume und die externen
//! Kollaborateure (Verlauf, Bots, Konten). Jede Operation sammelt zuerst
//! den noetigen Zustand und verschickt dann; waehrend eines `await`
//! wird kein Lock gehalten.

use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use treffpunkt_auth::CredentialStore;
use treffpunkt_chat::{text_pruefen, BotPipeline, ChatEintrag, ChatHistoryStore};
use treffpunkt_core::{ChatRaumId, RaumId, Rolle, UserId};
use treffpunkt_protocol::message::{
    ChatMessage, DeafenState, ExistingParticipants, HistoryResult, JoinChannel, LeaveChannel,
    MuteState, NewParticipant, ParticipantInfo, ParticipantLeft, UserDisconnected, VideoMuteState,
};
use treffpunkt_protocol::ProtocolMessage;

use crate::error::SignalingResult;
use crate::registry::Verbindungsregister;
use crate::rooms::{FlagArt, MedienRaeume};

/// Koordiniert Chat und Medien-Raeume
#[derive(Clone)]
pub struct RaumKoordinator {
    registry: Arc<Verbindungsregister>,
    raeume: Arc<MedienRaeume>,
    konten: Arc<dyn CredentialStore>,
    verlauf: Arc<dyn ChatHistoryStore>,
    bots: Arc<dyn BotPipeline>,
}

fn chat_nachricht(eintrag: ChatEintrag) -> ChatMessage {
    ChatMessage {
        user_id: eintrag.user_id,
        username: eintrag.username,
        text: eintrag.text,
        sent_at: eintrag.gesendet_am,
        chat_room_id: eintrag.chat_raum_id,
    }
}

impl RaumKoordinator {
    pub fn neu(
        registry: Arc<Verbindungsregister>,
        raeume: Arc<MedienRaeume>,
        konten: Arc<dyn CredentialStore>,
        verlauf: Arc<dyn ChatHistoryStore>,
        bots: Arc<dyn BotPipeline>,
    ) -> Self {
        Self {
            registry,
            raeume,
            konten,
            verlauf,
            bots,
        }
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// Verarbeitet eine ausgehende Chat-Nachricht
    ///
    /// Verbraucht ein Bot die Nachricht, gehen nur seine Antworten an den
    /// Absender. Sonst wird sie gespeichert und an alle anderen verteilt.
    pub async fn chat_senden(
        &self,
        user_id: UserId,
        username: &str,
        text: &str,
        raum: ChatRaumId,
    ) -> SignalingResult<()> {
        text_pruefen(text)?;

        let entscheidung = self.bots.try_handle(user_id, username, text, raum).await;
        if entscheidung.behandelt {
            tracing::debug!(
                user_id = %user_id,
                antworten = entscheidung.antworten.len(),
                "Chat-Nachricht von Bot verbraucht"
            );
            for antwort in entscheidung.antworten {
                let nachricht = ProtocolMessage::MessageFromOther(ChatMessage {
                    user_id: antwort.bot_id,
                    username: antwort.bot_name,
                    text: antwort.text,
                    sent_at: Utc::now(),
                    chat_room_id: raum,
                });
                self.registry.an_user_senden(&user_id, nachricht);
            }
            return Ok(());
        }

        let eintrag = ChatEintrag {
            user_id,
            username: username.to_string(),
            text: text.to_string(),
            gesendet_am: Utc::now(),
            chat_raum_id: raum,
        };
        if let Err(e) = self.verlauf.anhaengen(eintrag.clone()).await {
            tracing::error!(user_id = %user_id, raum = %raum, fehler = %e, "Chat-Verlauf nicht speicherbar");
            return Err(e.into());
        }

        let empfaenger = self
            .registry
            .an_alle_ausser_senden(&user_id, ProtocolMessage::MessageFromOther(chat_nachricht(eintrag)));
        tracing::debug!(user_id = %user_id, raum = %raum, empfaenger, "Chat-Nachricht verteilt");
        Ok(())
    }

    /// Schickt den Verlauf eines Chat-Raums an den Anfragenden
    pub async fn verlauf_senden(&self, user_id: UserId, raum: ChatRaumId) -> SignalingResult<()> {
        let eintraege = match self.verlauf.abfragen(raum).await {
            Ok(e) => e,
            Err(e) => {
                tracing::error!(user_id = %user_id, raum = %raum, fehler = %e, "Chat-Verlauf nicht lesbar");
                return Err(e.into());
            }
        };

        let ergebnis = ProtocolMessage::HistoryResult(HistoryResult {
            chat_room_id: raum,
            messages: eintraege.into_iter().map(chat_nachricht).collect(),
        });
        self.registry.an_user_senden(&user_id, ergebnis);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Medien-Raeume
    // -----------------------------------------------------------------------

    fn ip_von(&self, user_id: &UserId) -> String {
        self.registry
            .endpunkt_von(user_id)
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    }

    fn name_von(&self, user_id: &UserId) -> String {
        self.registry.username_von(user_id).unwrap_or_default()
    }

    /// Profilbild und Rolle aus dem Konten-Speicher
    async fn profil_daten(&self, user_id: UserId) -> (Vec<u8>, Rolle) {
        match self.konten.profil(user_id).await {
            Ok(Some(p)) => (p.profilbild, p.rolle),
            Ok(None) => (Vec::new(), Rolle::default()),
            Err(e) => {
                tracing::warn!(user_id = %user_id, fehler = %e, "Profil nicht lesbar");
                (Vec::new(), Rolle::default())
            }
        }
    }

    /// Tritt einem Medien-Raum bei
    pub async fn beitreten(&self, raum: RaumId, user_id: UserId, port: u16) -> SignalingResult<()> {
        let beitritt = self.raeume.beitreten(raum, user_id, port)?;
        if !beitritt.neu {
            tracing::debug!(user_id = %user_id, raum = %raum, "Bereits im Raum");
            return Ok(());
        }

        let username = self.name_von(&user_id);

        // Bisherige Mitglieder erfahren vom Neuen
        let neuer = NewParticipant {
            user_id,
            username: username.clone(),
            ip: self.ip_von(&user_id),
            media_port: port,
        };
        for (mitglied, _) in &beitritt.bisherige {
            self.registry.an_user_senden(
                mitglied,
                ProtocolMessage::NewParticipantBroadcast(neuer.clone()),
            );
        }

        // Der Neue bekommt die komplette bisherige Belegung
        let teilnehmer = beitritt
            .bisherige
            .iter()
            .map(|(mitglied, mitglied_port)| ParticipantInfo {
                ip: self.ip_von(mitglied),
                media_port: *mitglied_port,
                user_id: *mitglied,
                username: self.name_von(mitglied),
                flags: self.raeume.flags(mitglied),
            })
            .collect();
        self.registry.an_user_senden(
            &user_id,
            ProtocolMessage::ExistingParticipantsList(ExistingParticipants {
                media_room_id: raum,
                participants: teilnehmer,
            }),
        );

        let (profile_picture, role) = self.profil_daten(user_id).await;
        self.registry
            .an_alle_senden(ProtocolMessage::JoinChannelBroadcast(JoinChannel {
                user_id,
                username,
                media_room_id: raum,
                profile_picture,
                role,
                flags: self.raeume.flags(&user_id),
            }));

        tracing::info!(
            user_id = %user_id,
            raum = %raum,
            port,
            bisherige = beitritt.bisherige.len(),
            "Medien-Raum betreten"
        );
        Ok(())
    }

    /// Verlaesst einen Medien-Raum
    pub fn verlassen(&self, raum: RaumId, user_id: UserId) -> SignalingResult<()> {
        let ip = self.ip_von(&user_id);
        self.verlassen_mit_ip(raum, user_id, ip)
    }

    fn verlassen_mit_ip(&self, raum: RaumId, user_id: UserId, ip: String) -> SignalingResult<()> {
        let verbleibende = self.raeume.verlassen(raum, &user_id)?;

        let gegangen = ParticipantLeft {
            user_id,
            ip,
            media_room_id: raum,
        };
        for mitglied in &verbleibende {
            self.registry.an_user_senden(
                mitglied,
                ProtocolMessage::ParticipantLeftBroadcast(gegangen.clone()),
            );
        }
        self.registry
            .an_alle_senden(ProtocolMessage::LeaveChannelBroadcast(LeaveChannel {
                user_id,
                media_room_id: raum,
            }));

        tracing::info!(user_id = %user_id, raum = %raum, "Medien-Raum verlassen");
        Ok(())
    }

    /// Setzt ein Medien-Flag und verteilt den neuen Wert an alle
    pub fn flag_setzen(&self, akteur: UserId, ziel: UserId, art: FlagArt, wert: bool) {
        self.raeume.flag_setzen(ziel, art, wert);

        if akteur != ziel {
            tracing::info!(
                akteur = %akteur,
                ziel = %ziel,
                flag = ?art,
                wert,
                "Medien-Flag durch Moderation geaendert"
            );
        }

        let nachricht = match art {
            FlagArt::Stumm => ProtocolMessage::MuteState(MuteState {
                user_id: ziel,
                is_muted: wert,
            }),
            FlagArt::Taub => ProtocolMessage::DeafenState(DeafenState {
                user_id: ziel,
                is_deafened: wert,
            }),
            FlagArt::VideoAus => ProtocolMessage::VideoMuteState(VideoMuteState {
                user_id: ziel,
                is_video_muted: wert,
            }),
        };
        self.registry.an_alle_senden(nachricht);
    }

    /// Wirft einen Teilnehmer aus einem Medien-Raum
    pub fn trennen_erzwingen(&self, akteur: UserId, ziel: UserId, raum: RaumId) -> SignalingResult<()> {
        self.verlassen(raum, ziel)?;
        tracing::info!(akteur = %akteur, ziel = %ziel, raum = %raum, "Teilnehmer getrennt");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sitzungsende
    // -----------------------------------------------------------------------

    /// Raeumt alles auf, was zu einer beendeten Sitzung gehoert
    ///
    /// Nimmt den Benutzer aus allen Medien-Raeumen, entfernt danach die
    /// Sitzung aus dem Register und meldet ihn bei allen anderen ab.
    pub fn sitzung_beenden(&self, peer: SocketAddr) {
        // Raeume nur verlassen solange diese Sitzung den Benutzer noch haelt.
        // Ein neuer Login desselben Benutzers scheitert bis dahin.
        if let Some(anmeldung) = self.registry.anmeldung(&peer) {
            let user_id = anmeldung.user_id;
            let ip = peer.ip().to_string();
            for raum in self.raeume.raeume_von(&user_id) {
                if let Err(e) = self.verlassen_mit_ip(raum, user_id, ip.clone()) {
                    tracing::debug!(user_id = %user_id, raum = %raum, fehler = %e, "Raum bereits verlassen");
                }
            }
        }

        let Some(anmeldung) = self.registry.entfernen(&peer) else {
            return;
        };
        let user_id = anmeldung.user_id;

        self.registry
            .an_alle_senden(ProtocolMessage::UserDisconnected(UserDisconnected { user_id }));
        tracing::info!(user_id = %user_id, username = %anmeldung.username, "Benutzer abgemeldet");
    }

    pub fn registry(&self) -> &Arc<Verbindungsregister> {
        &self.registry
    }

    pub fn raeume(&self) -> &Arc<MedienRaeume> {
        &self.raeume
    }
}
