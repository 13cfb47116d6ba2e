//! Gemeinsame Identifikationstypen fuer Treffpunkt
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Benutzer-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Absender-ID fuer Server- und Bot-Nachrichten
    pub const SYSTEM: UserId = UserId(Uuid::nil());

    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

/// Neutraler Wert fuer nicht gesetzte Felder
impl Default for UserId {
    fn default() -> Self {
        Self::SYSTEM
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// ID eines Medien-Raums (Voice/Video-Kanal)
///
/// Die Raeume bilden einen festen Pool, nummeriert ab 1.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RaumId(pub u32);

impl std::fmt::Display for RaumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "raum:{}", self.0)
    }
}

/// ID eines Text-Chat-Raums
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatRaumId(pub u32);

impl std::fmt::Display for ChatRaumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chat:{}", self.0)
    }
}

/// Rolle eines Benutzers auf dem Server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rolle {
    Admin,
    Moderator,
    #[default]
    Mitglied,
    Bot,
}

impl Rolle {
    /// Darf andere Teilnehmer stummschalten oder aus Raeumen werfen
    pub fn darf_moderieren(&self) -> bool {
        matches!(self, Self::Admin | Self::Moderator)
    }

    /// Darf Rollen anderer Benutzer aendern
    pub fn darf_rollen_vergeben(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Rolle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::Mitglied => "mitglied",
            Self::Bot => "bot",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_eindeutig() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b, "Zwei neue UserIds muessen verschieden sein");
    }

    #[test]
    fn system_id_ist_nil() {
        assert!(UserId::SYSTEM.inner().is_nil());
        assert!(UserId::SYSTEM.to_string().starts_with("user:"));
    }

    #[test]
    fn raum_id_display() {
        assert_eq!(RaumId(2).to_string(), "raum:2");
        assert_eq!(ChatRaumId(7).to_string(), "chat:7");
    }

    #[test]
    fn ids_sind_transparent_serialisiert() {
        assert_eq!(serde_json::to_string(&RaumId(3)).unwrap(), "3");
        let uid = UserId::new();
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, format!("\"{}\"", uid.inner()));
        let uid2: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(uid, uid2);
    }

    #[test]
    fn rollen_rechte() {
        assert!(Rolle::Admin.darf_moderieren());
        assert!(Rolle::Moderator.darf_moderieren());
        assert!(!Rolle::Mitglied.darf_moderieren());
        assert!(Rolle::Admin.darf_rollen_vergeben());
        assert!(!Rolle::Moderator.darf_rollen_vergeben());
        assert_eq!(serde_json::to_string(&Rolle::Moderator).unwrap(), "\"moderator\"");
    }
}
