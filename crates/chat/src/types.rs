//! Oeffentliche Typen fuer Chat und Bots

use chrono::{DateTime, Utc};
use treffpunkt_core::{ChatRaumId, UserId};

use crate::error::{ChatError, ChatResult};

/// Maximale Laenge einer Chat-Nachricht in Zeichen
pub const MAX_TEXT_LAENGE: usize = 4096;

/// Eine gespeicherte Chat-Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEintrag {
    pub user_id: UserId,
    pub username: String,
    pub text: String,
    /// Vom Server vergeben
    pub gesendet_am: DateTime<Utc>,
    pub chat_raum_id: ChatRaumId,
}

/// Eine Bot-Antwort, geht nur an den Absender der Ausloeser-Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotAntwort {
    pub bot_id: UserId,
    pub bot_name: String,
    pub text: String,
}

/// Ergebnis einer Bot-Pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotEntscheidung {
    /// Nachricht wurde verbraucht und wird nicht verteilt
    pub behandelt: bool,
    pub antworten: Vec<BotAntwort>,
}

impl BotEntscheidung {
    pub fn nicht_behandelt() -> Self {
        Self::default()
    }

    pub fn behandelt(antworten: Vec<BotAntwort>) -> Self {
        Self {
            behandelt: true,
            antworten,
        }
    }
}

/// Prueft den Text einer ausgehenden Nachricht
pub fn text_pruefen(text: &str) -> ChatResult<()> {
    if text.trim().is_empty() {
        return Err(ChatError::UngueltigeEingabe(
            "Nachrichteninhalt darf nicht leer sein".into(),
        ));
    }

    let zeichen = text.chars().count();
    if zeichen > MAX_TEXT_LAENGE {
        return Err(ChatError::UngueltigeEingabe(format!(
            "Nachricht zu lang: {zeichen} Zeichen (Maximum: {MAX_TEXT_LAENGE})"
        )));
    }

    Ok(())
}
