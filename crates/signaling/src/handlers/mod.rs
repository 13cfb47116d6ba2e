//! Handler fuer alle Client-Nachrichten
//!
//! Jeder Handler ist fuer eine Nachrichtenfamilie zustaendig und hat Zugriff
//! auf den gemeinsamen `ServerState`. Fachliche Fehler werden als
//! `Error`-Nachricht beantwortet, die Verbindung bleibt offen.

pub mod auth_handler;
pub mod chat_handler;
pub mod media_handler;
pub mod roster_handler;

use treffpunkt_auth::AuthError;
use treffpunkt_chat::ChatError;
use treffpunkt_core::{Rolle, UserId};
use treffpunkt_protocol::{ErrorCode, ProtocolMessage};

use crate::error::SignalingError;
use crate::server_state::ServerState;

/// Uebersetzt einen Fehler in die Antwort an den Client
pub(crate) fn fehler_nachricht(fehler: &SignalingError) -> ProtocolMessage {
    let code = match fehler {
        SignalingError::UnbekannterRaum(_) => ErrorCode::NotFound,
        SignalingError::NichtImRaum(_) => ErrorCode::NotInRoom,
        SignalingError::ZugriffVerweigert(_) => ErrorCode::PermissionDenied,
        SignalingError::BereitsVerbunden => ErrorCode::AlreadyConnected,
        SignalingError::Protokoll(_) | SignalingError::Chat(ChatError::UngueltigeEingabe(_)) => {
            ErrorCode::InvalidRequest
        }
        SignalingError::Auth(AuthError::BenutzernameVergeben(_)) => ErrorCode::UsernameTaken,
        SignalingError::Auth(AuthError::BenutzerNichtGefunden(_)) => ErrorCode::NotFound,
        _ => ErrorCode::Internal,
    };

    // Interne Details bleiben im Log
    let text = match code {
        ErrorCode::Internal => "Interner Serverfehler".to_string(),
        _ => fehler.to_string(),
    };
    ProtocolMessage::fehler(code, text)
}

/// Rolle eines Benutzers; nicht lesbar gilt als `Mitglied`
pub(crate) async fn rolle_von(state: &ServerState, user_id: UserId) -> Rolle {
    match state.konten.rolle(user_id).await {
        Ok(Some(rolle)) => rolle,
        Ok(None) => Rolle::default(),
        Err(e) => {
            tracing::warn!(user_id = %user_id, fehler = %e, "Rolle nicht lesbar");
            Rolle::default()
        }
    }
}
