//! Roster-Handler – Profile, Benutzerliste, Rollen

use treffpunkt_core::UserId;
use treffpunkt_protocol::message::{
    AllUsersDetails, ConnectedSuccess, RoleUpdate, UserDetails, UserImageRequest, UserImageResult,
};
use treffpunkt_protocol::{ErrorCode, ProtocolMessage};

use crate::error::SignalingError;
use crate::handlers::{fehler_nachricht, rolle_von};
use crate::server_state::ServerState;

fn nicht_gefunden() -> ProtocolMessage {
    ProtocolMessage::fehler(ErrorCode::NotFound, "Benutzer nicht gefunden")
}

/// Eigenes Profil nach der Anmeldung
pub async fn handle_get_profile(user_id: UserId, state: &ServerState) -> ProtocolMessage {
    match state.konten.profil(user_id).await {
        Ok(Some(profil)) => ProtocolMessage::ConnectedSuccess(ConnectedSuccess {
            user_id: profil.user_id,
            username: profil.username,
            profile_picture: profil.profilbild,
            role: profil.rolle,
        }),
        Ok(None) => nicht_gefunden(),
        Err(e) => fehler_nachricht(&SignalingError::Auth(e)),
    }
}

/// Alle Konten mit Online-Status und erstem Medien-Raum
pub async fn handle_fetch_all_users(state: &ServerState) -> ProtocolMessage {
    let profile = match state.konten.alle_profile().await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(fehler = %e, "Benutzerliste nicht lesbar");
            return fehler_nachricht(&SignalingError::Auth(e));
        }
    };

    let users = profile
        .into_iter()
        .map(|p| UserDetails {
            is_online: state.registry.ist_online(&p.user_id),
            media_room_id: state.raeume.erster_raum_von(&p.user_id),
            user_id: p.user_id,
            username: p.username,
            profile_picture: p.profilbild,
            role: p.rolle,
        })
        .collect();

    ProtocolMessage::AllUsersDetailsResult(AllUsersDetails { users })
}

pub async fn handle_fetch_user_image(
    request: UserImageRequest,
    state: &ServerState,
) -> ProtocolMessage {
    match state.konten.profil(request.user_id).await {
        Ok(Some(profil)) => ProtocolMessage::UserImageResult(UserImageResult {
            user_id: profil.user_id,
            profile_picture: profil.profilbild,
        }),
        Ok(None) => nicht_gefunden(),
        Err(e) => fehler_nachricht(&SignalingError::Auth(e)),
    }
}

/// Rollen-Aenderung (nur Admins)
///
/// Bei Erfolg geht `RoleUpdatedBroadcast` an alle, auch an den Absender.
pub async fn handle_role_update(
    request: RoleUpdate,
    user_id: UserId,
    state: &ServerState,
) -> Option<ProtocolMessage> {
    if !rolle_von(state, user_id).await.darf_rollen_vergeben() {
        tracing::warn!(akteur = %user_id, ziel = %request.user_id, "Rollen-Aenderung verweigert");
        return Some(ProtocolMessage::fehler(
            ErrorCode::PermissionDenied,
            "Nur Admins duerfen Rollen vergeben",
        ));
    }

    if let Err(e) = state.konten.rolle_setzen(request.user_id, request.role).await {
        return Some(fehler_nachricht(&SignalingError::Auth(e)));
    }

    tracing::info!(
        akteur = %user_id,
        ziel = %request.user_id,
        rolle = %request.role,
        "Rolle geaendert"
    );
    state
        .registry
        .an_alle_senden(ProtocolMessage::RoleUpdatedBroadcast(request));
    None
}
