//! Chat-Verlauf
//!
//! Das `ChatHistoryStore`-Trait abstrahiert die Persistenz (Datenbank,
//! Dokumentenspeicher, ...). `SpeicherVerlauf` haelt den Verlauf pro Raum
//! im Speicher, aufsteigend nach Zeitstempel.

use async_trait::async_trait;
use dashmap::DashMap;
use treffpunkt_core::ChatRaumId;

use crate::error::ChatResult;
use crate::types::ChatEintrag;

/// Persistenz fuer Chat-Nachrichten
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    /// Nachricht speichern
    async fn anhaengen(&self, eintrag: ChatEintrag) -> ChatResult<()>;

    /// Alle Nachrichten eines Raums, aufsteigend nach Zeit
    async fn abfragen(&self, raum: ChatRaumId) -> ChatResult<Vec<ChatEintrag>>;
}

/// In-Memory Chat-Verlauf
#[derive(Debug, Default)]
pub struct SpeicherVerlauf {
    raeume: DashMap<ChatRaumId, Vec<ChatEintrag>>,
    /// Aelteste Eintraege fallen weg sobald ein Raum voll ist
    max_pro_raum: Option<usize>,
}

impl SpeicherVerlauf {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Verlauf mit Obergrenze pro Raum
    pub fn mit_limit(max_pro_raum: usize) -> Self {
        Self {
            raeume: DashMap::new(),
            max_pro_raum: Some(max_pro_raum),
        }
    }
}

#[async_trait]
impl ChatHistoryStore for SpeicherVerlauf {
    async fn anhaengen(&self, eintrag: ChatEintrag) -> ChatResult<()> {
        let mut raum = self.raeume.entry(eintrag.chat_raum_id).or_default();

        // Stabil einsortieren: gleiche Zeitstempel behalten Ankunftsreihenfolge
        let pos = raum.partition_point(|e| e.gesendet_am <= eintrag.gesendet_am);
        raum.insert(pos, eintrag);

        if let Some(max) = self.max_pro_raum {
            if raum.len() > max {
                let ueberschuss = raum.len() - max;
                raum.drain(..ueberschuss);
            }
        }
        Ok(())
    }

    async fn abfragen(&self, raum: ChatRaumId) -> ChatResult<Vec<ChatEintrag>> {
        Ok(self
            .raeume
            .get(&raum)
            .map(|eintraege| eintraege.clone())
            .unwrap_or_default())
    }
}
