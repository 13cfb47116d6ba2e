//! treffpunkt-chat – Chat-Verlauf und Bots
//!
//! Dieses Crate implementiert:
//! - `ChatHistoryStore`-Trait + `SpeicherVerlauf` (In-Memory, zeitlich sortiert)
//! - `BotPipeline`-Trait: ausgehende Nachrichten koennen von Bots
//!   verbraucht werden bevor sie verteilt werden
//! - `BotKette` mit `BefehlsBot` (Praefix-Befehle) und `WortFilterBot`
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use treffpunkt_chat::{BefehlsBot, BotKette, BotPipeline, WortFilterBot};
//!
//! let woerter = vec!["mist".to_string()];
//! let kette = BotKette::neu()
//!     .mit(Arc::new(BefehlsBot::neu("!", woerter.clone())))
//!     .mit(Arc::new(WortFilterBot::neu(woerter)));
//! let _pipeline: Arc<dyn BotPipeline> = Arc::new(kette);
//! ```

pub mod bots;
pub mod error;
pub mod types;
pub mod verlauf;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use bots::{BefehlsBot, BotKette, BotPipeline, WortFilterBot, BOT_NAME};
pub use error::{ChatError, ChatResult};
pub use types::{text_pruefen, BotAntwort, BotEntscheidung, ChatEintrag, MAX_TEXT_LAENGE};
pub use verlauf::{ChatHistoryStore, SpeicherVerlauf};
