//! Verbindungsregister – Wer ist verbunden, wer ist angemeldet
//!
//! Jede Sitzung wird nach ihrem Endpunkt (`SocketAddr`) abgelegt und haelt
//! die Send-Queue zu ihrem Writer-Task. Nach der Anmeldung ist sie zusaetzlich
//! ueber die `UserId` auffindbar.
//!
//! ## Gezieltes Senden
//! - An alle angemeldeten Sitzungen: `an_alle_senden`
//! - An alle ausser einen Benutzer: `an_alle_ausser_senden`
//! - An einen Benutzer: `an_user_senden` (No-op wenn offline)
//!
//! Alle Sendevorgaenge sind nicht-blockierend. Eine volle Queue verwirft
//! die Nachricht mit einer Warnung.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use tokio::sync::mpsc;
use treffpunkt_core::UserId;
use treffpunkt_protocol::ProtocolMessage;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Sitzung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub peer: SocketAddr,
    pub tx: mpsc::Sender<ProtocolMessage>,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an die Sitzung
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ProtocolMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(
                    peer = %self.peer,
                    kind = n.kind(),
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(peer = %self.peer, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Eintraege
// ---------------------------------------------------------------------------

/// Angemeldeter Benutzer einer Sitzung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anmeldung {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug)]
struct SitzungsEintrag {
    sender: ClientSender,
    anmeldung: Option<Anmeldung>,
}

// ---------------------------------------------------------------------------
// Verbindungsregister
// ---------------------------------------------------------------------------

/// Register aller Sitzungen des Servers
///
/// Invariante: eine `UserId` ist an hoechstens eine Sitzung gebunden.
#[derive(Default)]
pub struct Verbindungsregister {
    sitzungen: DashMap<SocketAddr, SitzungsEintrag>,
    nach_user: DashMap<UserId, SocketAddr>,
}

impl Verbindungsregister {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Nimmt eine neue, noch nicht angemeldete Sitzung auf
    pub fn registrieren(&self, peer: SocketAddr, tx: mpsc::Sender<ProtocolMessage>) {
        self.sitzungen.insert(
            peer,
            SitzungsEintrag {
                sender: ClientSender { peer, tx },
                anmeldung: None,
            },
        );
        tracing::debug!(peer = %peer, "Sitzung registriert");
    }

    /// Entfernt eine Sitzung und gibt ihre Anmeldung zurueck (falls vorhanden)
    pub fn entfernen(&self, peer: &SocketAddr) -> Option<Anmeldung> {
        let (_, eintrag) = self.sitzungen.remove(peer)?;
        let anmeldung = eintrag.anmeldung?;
        self.nach_user
            .remove_if(&anmeldung.user_id, |_, addr| addr == peer);
        tracing::debug!(peer = %peer, user_id = %anmeldung.user_id, "Sitzung entfernt");
        Some(anmeldung)
    }

    /// Bindet einen Benutzer an eine Sitzung
    ///
    /// Pruefung und Bindung sind ein Schritt: von zwei gleichzeitigen
    /// Anmeldungen desselben Benutzers gewinnt genau eine.
    pub fn anmelden(
        &self,
        peer: SocketAddr,
        user_id: UserId,
        username: impl Into<String>,
    ) -> SignalingResult<()> {
        match self.nach_user.entry(user_id) {
            Entry::Occupied(_) => Err(SignalingError::BereitsVerbunden),
            Entry::Vacant(frei) => {
                let mut eintrag = self
                    .sitzungen
                    .get_mut(&peer)
                    .ok_or_else(|| SignalingError::intern("Sitzung nicht registriert"))?;
                if eintrag.anmeldung.is_some() {
                    return Err(SignalingError::protokoll("Sitzung ist bereits angemeldet"));
                }
                eintrag.anmeldung = Some(Anmeldung {
                    user_id,
                    username: username.into(),
                });
                frei.insert(peer);
                tracing::debug!(peer = %peer, user_id = %user_id, "Benutzer angemeldet");
                Ok(())
            }
        }
    }

    /// Loest die Bindung ohne die Sitzung zu schliessen
    pub fn abmelden(&self, peer: &SocketAddr) -> Option<Anmeldung> {
        let anmeldung = self.sitzungen.get_mut(peer)?.anmeldung.take()?;
        self.nach_user
            .remove_if(&anmeldung.user_id, |_, addr| addr == peer);
        Some(anmeldung)
    }

    pub fn ist_online(&self, user_id: &UserId) -> bool {
        self.nach_user.contains_key(user_id)
    }

    /// Anmeldung einer Sitzung
    pub fn anmeldung(&self, peer: &SocketAddr) -> Option<Anmeldung> {
        self.sitzungen.get(peer)?.anmeldung.clone()
    }

    pub fn username_von(&self, user_id: &UserId) -> Option<String> {
        let peer = *self.nach_user.get(user_id)?;
        let eintrag = self.sitzungen.get(&peer)?;
        eintrag.anmeldung.as_ref().map(|a| a.username.clone())
    }

    /// IP-Adresse unter der ein Benutzer fuer Peer-Verbindungen erreichbar ist
    pub fn endpunkt_von(&self, user_id: &UserId) -> Option<IpAddr> {
        self.nach_user.get(user_id).map(|peer| peer.ip())
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Sendet an einen Benutzer; No-op wenn er offline ist
    pub fn an_user_senden(&self, user_id: &UserId, nachricht: ProtocolMessage) -> bool {
        let Some(peer) = self.nach_user.get(user_id).map(|p| *p) else {
            tracing::trace!(user_id = %user_id, "Empfaenger offline – Nachricht verworfen");
            return false;
        };
        match self.sitzungen.get(&peer) {
            Some(eintrag) => eintrag.sender.senden(nachricht),
            None => false,
        }
    }

    /// Sendet an alle angemeldeten Sitzungen
    ///
    /// Gibt die Anzahl erfolgreich eingereihter Nachrichten zurueck.
    pub fn an_alle_senden(&self, nachricht: ProtocolMessage) -> usize {
        self.sitzungen
            .iter()
            .filter(|e| e.anmeldung.is_some())
            .filter(|e| e.sender.senden(nachricht.clone()))
            .count()
    }

    /// Sendet an alle angemeldeten Sitzungen ausser der von `ausser`
    pub fn an_alle_ausser_senden(&self, ausser: &UserId, nachricht: ProtocolMessage) -> usize {
        self.sitzungen
            .iter()
            .filter(|e| {
                e.anmeldung
                    .as_ref()
                    .is_some_and(|a| &a.user_id != ausser)
            })
            .filter(|e| e.sender.senden(nachricht.clone()))
            .count()
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Anzahl aller Sitzungen (angemeldet oder nicht)
    pub fn anzahl(&self) -> usize {
        self.sitzungen.len()
    }

    pub fn angemeldet_anzahl(&self) -> usize {
        self.nach_user.len()
    }
}
