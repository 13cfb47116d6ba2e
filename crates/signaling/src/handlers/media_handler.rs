//! Medien-Handler – Raeume betreten/verlassen, Flags, erzwungene Trennung
//!
//! Fremde Flags und Trennungen sind nur fuer Admins und Moderatoren erlaubt.

use treffpunkt_core::UserId;
use treffpunkt_protocol::message::{ConnectToRoom, DisconnectFromRoom, FlagSetzen, ForceDisconnect};
use treffpunkt_protocol::ProtocolMessage;

use crate::error::SignalingError;
use crate::handlers::{fehler_nachricht, rolle_von};
use crate::rooms::FlagArt;
use crate::server_state::ServerState;

/// Ziel einer Aktion; `UserId::SYSTEM` steht fuer den Absender selbst
fn ziel_von(angegeben: UserId, absender: UserId) -> UserId {
    if angegeben == UserId::SYSTEM {
        absender
    } else {
        angegeben
    }
}

async fn moderation_pruefen(
    state: &ServerState,
    akteur: UserId,
    ziel: UserId,
) -> Result<(), SignalingError> {
    if akteur == ziel || rolle_von(state, akteur).await.darf_moderieren() {
        Ok(())
    } else {
        tracing::warn!(akteur = %akteur, ziel = %ziel, "Moderation ohne Berechtigung");
        Err(SignalingError::ZugriffVerweigert(
            "Nur Admins und Moderatoren duerfen andere Teilnehmer aendern".into(),
        ))
    }
}

pub async fn handle_connect_to_room(
    request: ConnectToRoom,
    user_id: UserId,
    state: &ServerState,
) -> Option<ProtocolMessage> {
    state
        .koordinator
        .beitreten(request.media_room_id, user_id, request.media_port)
        .await
        .err()
        .map(|e| fehler_nachricht(&e))
}

pub async fn handle_disconnect_from_room(
    request: DisconnectFromRoom,
    user_id: UserId,
    state: &ServerState,
) -> Option<ProtocolMessage> {
    state
        .koordinator
        .verlassen(request.media_room_id, user_id)
        .err()
        .map(|e| fehler_nachricht(&e))
}

/// Setzt Mute, Deafen oder Video-Mute
pub async fn handle_flag_setzen(
    request: FlagSetzen,
    art: FlagArt,
    user_id: UserId,
    state: &ServerState,
) -> Option<ProtocolMessage> {
    let ziel = ziel_von(request.user_id, user_id);
    if let Err(e) = moderation_pruefen(state, user_id, ziel).await {
        return Some(fehler_nachricht(&e));
    }
    state.koordinator.flag_setzen(user_id, ziel, art, request.value);
    None
}

/// Wirft einen Teilnehmer aus einem Medien-Raum
pub async fn handle_force_disconnect(
    request: ForceDisconnect,
    user_id: UserId,
    state: &ServerState,
) -> Option<ProtocolMessage> {
    let ziel = ziel_von(request.user_id, user_id);
    if let Err(e) = moderation_pruefen(state, user_id, ziel).await {
        return Some(fehler_nachricht(&e));
    }
    state
        .koordinator
        .trennen_erzwingen(user_id, ziel, request.media_room_id)
        .err()
        .map(|e| fehler_nachricht(&e))
}
