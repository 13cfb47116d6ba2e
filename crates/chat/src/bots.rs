//! Bot-Pipeline
//!
//! Jede ausgehende Chat-Nachricht wird zuerst der `BotPipeline` angeboten.
//! Verbraucht ein Bot die Nachricht, wird sie weder gespeichert noch
//! verteilt; seine Antworten gehen nur an den Absender.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use treffpunkt_core::{ChatRaumId, UserId};

use crate::types::{BotAntwort, BotEntscheidung};

/// Anzeigename der eingebauten Bots
pub const BOT_NAME: &str = "ModBot";

const REGELN: &str = "Serverregeln:\n\
    1. Respektvoller Umgang mit allen Mitgliedern\n\
    2. Keine Beleidigungen oder Belaestigung\n\
    3. Kein Spam\n\
    4. Themen in den passenden Raeumen besprechen\n\
    5. Anweisungen von Admins und Moderatoren befolgen";

/// Gibt einer ausgehenden Nachricht die Chance, verbraucht zu werden
#[async_trait]
pub trait BotPipeline: Send + Sync {
    async fn try_handle(
        &self,
        user_id: UserId,
        username: &str,
        text: &str,
        raum: ChatRaumId,
    ) -> BotEntscheidung;
}

fn antwort(text: impl Into<String>) -> BotAntwort {
    BotAntwort {
        bot_id: UserId::SYSTEM,
        bot_name: BOT_NAME.to_string(),
        text: text.into(),
    }
}

// ---------------------------------------------------------------------------
// BotKette
// ---------------------------------------------------------------------------

/// Fragt Bots der Reihe nach; der erste der behandelt gewinnt
#[derive(Default, Clone)]
pub struct BotKette {
    bots: Vec<Arc<dyn BotPipeline>>,
}

impl BotKette {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn mit(mut self, bot: Arc<dyn BotPipeline>) -> Self {
        self.bots.push(bot);
        self
    }

    pub fn anzahl(&self) -> usize {
        self.bots.len()
    }
}

#[async_trait]
impl BotPipeline for BotKette {
    async fn try_handle(
        &self,
        user_id: UserId,
        username: &str,
        text: &str,
        raum: ChatRaumId,
    ) -> BotEntscheidung {
        for bot in &self.bots {
            let entscheidung = bot.try_handle(user_id, username, text, raum).await;
            if entscheidung.behandelt {
                return entscheidung;
            }
        }
        BotEntscheidung::nicht_behandelt()
    }
}

// ---------------------------------------------------------------------------
// BefehlsBot
// ---------------------------------------------------------------------------

/// Reagiert auf Nachrichten mit Befehls-Praefix (z.B. `!help`)
///
/// Jede Nachricht mit Praefix und mindestens einem Wort wird verbraucht,
/// auch unbekannte Befehle.
#[derive(Debug, Clone)]
pub struct BefehlsBot {
    praefix: String,
    gesperrte_woerter: Vec<String>,
}

impl BefehlsBot {
    pub fn neu(praefix: impl Into<String>, gesperrte_woerter: Vec<String>) -> Self {
        Self {
            praefix: praefix.into(),
            gesperrte_woerter,
        }
    }

    fn hilfe(&self) -> String {
        let p = &self.praefix;
        format!(
            "Befehle:\n\
             {p}help - Zeigt diese Hilfe\n\
             {p}rules - Zeigt die Serverregeln\n\
             {p}bannedwords - Listet die gesperrten Woerter\n\
             {p}about - Informationen ueber diesen Bot"
        )
    }

    fn ausfuehren(&self, befehl: &str) -> String {
        match befehl {
            "help" => self.hilfe(),
            "about" => format!("Ich bin {}, der Moderations-Bot dieses Servers.", BOT_NAME),
            "rules" => REGELN.to_string(),
            "bannedwords" if self.gesperrte_woerter.is_empty() => {
                "Keine gesperrten Woerter.".to_string()
            }
            "bannedwords" => format!(
                "Gesperrte Woerter: {}",
                self.gesperrte_woerter.join(", ")
            ),
            unbekannt => format!(
                "Unbekannter Befehl '{}'. {}help zeigt alle Befehle.",
                unbekannt, self.praefix
            ),
        }
    }
}

#[async_trait]
impl BotPipeline for BefehlsBot {
    async fn try_handle(
        &self,
        user_id: UserId,
        _username: &str,
        text: &str,
        raum: ChatRaumId,
    ) -> BotEntscheidung {
        if self.praefix.is_empty() {
            return BotEntscheidung::nicht_behandelt();
        }
        let Some(rest) = text.strip_prefix(self.praefix.as_str()) else {
            return BotEntscheidung::nicht_behandelt();
        };
        let Some(befehl) = rest.split_whitespace().next() else {
            return BotEntscheidung::nicht_behandelt();
        };

        let befehl = befehl.to_lowercase();
        tracing::debug!(user_id = %user_id, raum = %raum, befehl = %befehl, "Bot-Befehl");
        BotEntscheidung::behandelt(vec![antwort(self.ausfuehren(&befehl))])
    }
}

// ---------------------------------------------------------------------------
// WortFilterBot
// ---------------------------------------------------------------------------

/// Verwirft Nachrichten die ein gesperrtes Wort enthalten
///
/// Verglichen werden ganze Woerter ohne Beachtung der Gross-/Kleinschreibung.
#[derive(Debug, Clone)]
pub struct WortFilterBot {
    woerter: HashSet<String>,
}

impl WortFilterBot {
    pub fn neu(woerter: impl IntoIterator<Item = String>) -> Self {
        Self {
            woerter: woerter.into_iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    /// Erstes gesperrtes Wort im Text
    pub fn treffer(&self, text: &str) -> Option<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .find(|wort| self.woerter.contains(wort))
    }
}

#[async_trait]
impl BotPipeline for WortFilterBot {
    async fn try_handle(
        &self,
        user_id: UserId,
        username: &str,
        text: &str,
        raum: ChatRaumId,
    ) -> BotEntscheidung {
        let Some(wort) = self.treffer(text) else {
            return BotEntscheidung::nicht_behandelt();
        };

        tracing::info!(user_id = %user_id, raum = %raum, "Nachricht mit gesperrtem Wort verworfen");
        BotEntscheidung::behandelt(vec![antwort(format!(
            "@{}, deine Nachricht mit dem gesperrten Wort '{}' wurde nicht gesendet.",
            username, wort
        ))])
    }
}
