//! Chat-Handler – Nachrichten senden und Verlauf abfragen
//!
//! Beide Operationen antworten ueber die Send-Queue (Broadcast bzw.
//! `HistoryResult` an den Anfragenden). Eine direkte Antwort gibt es nur
//! im Fehlerfall.

use treffpunkt_protocol::message::{HistoryRequest, SendMessageRequest};
use treffpunkt_protocol::{ErrorCode, ProtocolMessage};

use crate::error::SignalingError;
use crate::handlers::fehler_nachricht;
use crate::registry::Anmeldung;
use crate::server_state::ServerState;

/// Verarbeitet eine ausgehende Chat-Nachricht
pub async fn handle_send_message(
    request: SendMessageRequest,
    absender: &Anmeldung,
    state: &ServerState,
) -> Option<ProtocolMessage> {
    state
        .koordinator
        .chat_senden(
            absender.user_id,
            &absender.username,
            &request.text,
            request.chat_room_id,
        )
        .await
        .err()
        .map(|e| fehler_nachricht(&e))
}

/// Schickt den Verlauf eines Chat-Raums
pub async fn handle_get_history(
    request: HistoryRequest,
    absender: &Anmeldung,
    state: &ServerState,
) -> Option<ProtocolMessage> {
    match state
        .koordinator
        .verlauf_senden(absender.user_id, request.chat_room_id)
        .await
    {
        Ok(()) => None,
        Err(SignalingError::Chat(_)) => Some(ProtocolMessage::fehler(
            ErrorCode::Internal,
            "Verlauf nicht verfuegbar",
        )),
        Err(e) => Some(fehler_nachricht(&e)),
    }
}
