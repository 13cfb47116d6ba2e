//! Medien-Raeume und fluechtige Medien-Flags
//!
//! Feste Anzahl von Raeumen mit den IDs `1..=n`. Jeder Raum haelt seine
//! Mitglieder (`UserId -> Medien-Port`) hinter einem eigenen Mutex.
//! Ein Benutzer darf in mehreren Raeumen gleichzeitig sein.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use treffpunkt_core::{RaumId, UserId};
use treffpunkt_protocol::MedienFlags;

use crate::error::{SignalingError, SignalingResult};

/// Standard-Anzahl der Medien-Raeume
pub const STANDARD_RAUM_ANZAHL: u32 = 3;

/// Welches Medien-Flag gesetzt wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagArt {
    Stumm,
    Taub,
    VideoAus,
}

/// Ergebnis eines Beitritts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beitritt {
    /// `false` wenn der Benutzer schon Mitglied war
    pub neu: bool,
    /// Mitglieder vor dem Beitritt (ohne den Beitretenden)
    pub bisherige: Vec<(UserId, u16)>,
}

// ---------------------------------------------------------------------------
// MedienRaum
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MedienRaum {
    id: RaumId,
    mitglieder: Mutex<HashMap<UserId, u16>>,
}

impl MedienRaum {
    fn neu(id: RaumId) -> Self {
        Self {
            id,
            mitglieder: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> RaumId {
        self.id
    }

    pub fn ist_mitglied(&self, user_id: &UserId) -> bool {
        self.mitglieder.lock().contains_key(user_id)
    }

    pub fn port_von(&self, user_id: &UserId) -> Option<u16> {
        self.mitglieder.lock().get(user_id).copied()
    }

    /// Momentaufnahme der Mitglieder
    pub fn mitglieder(&self) -> Vec<(UserId, u16)> {
        self.mitglieder
            .lock()
            .iter()
            .map(|(uid, port)| (*uid, *port))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// MedienRaeume
// ---------------------------------------------------------------------------

/// Alle Medien-Raeume des Servers plus die Flags aller Benutzer
#[derive(Debug)]
pub struct MedienRaeume {
    raeume: Vec<MedienRaum>,
    flags: DashMap<UserId, MedienFlags>,
}

impl MedienRaeume {
    pub fn neu(anzahl: u32) -> Self {
        Self {
            raeume: (1..=anzahl).map(|id| MedienRaum::neu(RaumId(id))).collect(),
            flags: DashMap::new(),
        }
    }

    pub fn raum(&self, id: RaumId) -> SignalingResult<&MedienRaum> {
        self.raeume
            .iter()
            .find(|r| r.id == id)
            .ok_or(SignalingError::UnbekannterRaum(id.0))
    }

    pub fn ids(&self) -> Vec<RaumId> {
        self.raeume.iter().map(|r| r.id).collect()
    }

    /// Fuegt einen Benutzer hinzu (idempotent, der erste Port bleibt)
    pub fn beitreten(&self, id: RaumId, user_id: UserId, port: u16) -> SignalingResult<Beitritt> {
        let raum = self.raum(id)?;
        let mut mitglieder = raum.mitglieder.lock();
        if mitglieder.contains_key(&user_id) {
            return Ok(Beitritt {
                neu: false,
                bisherige: Vec::new(),
            });
        }
        let bisherige = mitglieder.iter().map(|(u, p)| (*u, *p)).collect();
        mitglieder.insert(user_id, port);
        Ok(Beitritt {
            neu: true,
            bisherige,
        })
    }

    /// Entfernt einen Benutzer und gibt die verbleibenden Mitglieder zurueck
    pub fn verlassen(&self, id: RaumId, user_id: &UserId) -> SignalingResult<Vec<UserId>> {
        let raum = self.raum(id)?;
        let mut mitglieder = raum.mitglieder.lock();
        if mitglieder.remove(user_id).is_none() {
            return Err(SignalingError::NichtImRaum(id.0));
        }
        Ok(mitglieder.keys().copied().collect())
    }

    /// Alle Raeume in denen der Benutzer ist, aufsteigend
    pub fn raeume_von(&self, user_id: &UserId) -> Vec<RaumId> {
        self.raeume
            .iter()
            .filter(|r| r.ist_mitglied(user_id))
            .map(|r| r.id)
            .collect()
    }

    pub fn erster_raum_von(&self, user_id: &UserId) -> Option<RaumId> {
        self.raeume
            .iter()
            .find(|r| r.ist_mitglied(user_id))
            .map(|r| r.id)
    }

    // -----------------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------------

    /// Flags eines Benutzers; unbekannte Benutzer haben alles auf `false`
    pub fn flags(&self, user_id: &UserId) -> MedienFlags {
        self.flags.get(user_id).map(|f| *f).unwrap_or_default()
    }

    pub fn flag_setzen(&self, user_id: UserId, art: FlagArt, wert: bool) -> MedienFlags {
        let mut flags = self.flags.entry(user_id).or_default();
        match art {
            FlagArt::Stumm => flags.is_muted = wert,
            FlagArt::Taub => flags.is_deafened = wert,
            FlagArt::VideoAus => flags.is_video_muted = wert,
        }
        *flags
    }
}

impl Default for MedienRaeume {
    fn default() -> Self {
        Self::neu(STANDARD_RAUM_ANZAHL)
    }
}
