//! Auth-Handler – Registrierung, Login, Passwort-Reset
//!
//! Laeuft auch fuer nicht angemeldete Sitzungen. Der Fehlversuchs-Zaehler
//! und ein offener Passwort-Reset gehoeren zur Sitzung und liegen im
//! `DispatcherContext`.

use std::time::Instant;
use treffpunkt_auth::{bestaetigungscode_erzeugen, NeuesKonto, SperrStatus};
use treffpunkt_core::Rolle;
use treffpunkt_protocol::message::{
    CodeSentNotice, CooldownNotice, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    UpdatePasswordRequest, UserConnected, UsernameCheck,
};
use treffpunkt_protocol::{ErrorCode, ProtocolMessage};

use crate::dispatcher::DispatcherContext;
use crate::error::SignalingError;
use crate::handlers::fehler_nachricht;
use crate::registry::Anmeldung;
use crate::server_state::ServerState;

fn sperr_hinweis(minuten: u64) -> ProtocolMessage {
    ProtocolMessage::CooldownNotice(CooldownNotice {
        message: format!("Zu viele Fehlversuche. Bitte {minuten} Minute(n) warten."),
        minutes: minuten,
    })
}

/// Bindet die Sitzung an den Benutzer und meldet ihn bei allen anderen an
fn verbunden_melden(state: &ServerState, anmeldung: &Anmeldung, rolle: Rolle) {
    state.registry.an_alle_ausser_senden(
        &anmeldung.user_id,
        ProtocolMessage::UserConnected(UserConnected {
            user_id: anmeldung.user_id,
            username: anmeldung.username.clone(),
            role: rolle,
        }),
    );
}

/// Verarbeitet einen Login
///
/// Ablauf: Sperre pruefen, Zugangsdaten pruefen, Sitzung binden,
/// Bestaetigungscode mailen.
pub async fn handle_login(
    request: LoginRequest,
    jetzt: Instant,
    ctx: &mut DispatcherContext,
    state: &ServerState,
) -> ProtocolMessage {
    // Waehrend einer Sperre werden Zugangsdaten nicht geprueft
    if let SperrStatus::Gesperrt { minuten } = ctx.sperre.pruefen(jetzt) {
        tracing::debug!(username = %request.username, minuten, "Login waehrend Sperre");
        return sperr_hinweis(minuten);
    }

    let profil = match state
        .konten
        .verifizieren(&request.username, &request.password)
        .await
    {
        Ok(Some(profil)) => profil,
        Ok(None) => {
            let status = ctx.sperre.fehlschlag(jetzt);
            tracing::warn!(
                username = %request.username,
                fehlversuche = ctx.sperre.fehlversuche(),
                "Login fehlgeschlagen"
            );
            return match status {
                SperrStatus::Gesperrt { minuten } => sperr_hinweis(minuten),
                SperrStatus::Frei => ProtocolMessage::fehler(
                    ErrorCode::InvalidCredentials,
                    "Benutzername oder Passwort falsch",
                ),
            };
        }
        Err(e) => {
            tracing::error!(username = %request.username, fehler = %e, "Zugangsdaten nicht pruefbar");
            return fehler_nachricht(&SignalingError::Auth(e));
        }
    };

    ctx.sperre.erfolg();

    if let Err(e) = state
        .registry
        .anmelden(ctx.peer_addr, profil.user_id, &profil.username)
    {
        tracing::warn!(user_id = %profil.user_id, fehler = %e, "Login abgelehnt");
        return fehler_nachricht(&e);
    }

    let code = bestaetigungscode_erzeugen();
    if let Err(e) = state.mailer.senden(&code, &profil.email).await {
        tracing::error!(user_id = %profil.user_id, fehler = %e, "Bestaetigungscode nicht versendet");
        state.registry.abmelden(&ctx.peer_addr);
        return fehler_nachricht(&SignalingError::Auth(e));
    }

    let anmeldung = Anmeldung {
        user_id: profil.user_id,
        username: profil.username,
    };
    verbunden_melden(state, &anmeldung, profil.rolle);
    tracing::info!(user_id = %anmeldung.user_id, username = %anmeldung.username, "Login erfolgreich");
    ctx.anmeldung = Some(anmeldung);

    ProtocolMessage::CodeSentNotice(CodeSentNotice { code })
}

/// Legt ein neues Konto an und bindet die Sitzung daran
pub async fn handle_register(
    request: RegisterRequest,
    ctx: &mut DispatcherContext,
    state: &ServerState,
) -> ProtocolMessage {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return ProtocolMessage::fehler(
            ErrorCode::InvalidRequest,
            "Benutzername und Passwort erforderlich",
        );
    }

    match state.konten.existiert(&request.username).await {
        Ok(true) => {
            return ProtocolMessage::fehler(ErrorCode::UsernameTaken, "Benutzername bereits vergeben")
        }
        Ok(false) => {}
        Err(e) => return fehler_nachricht(&SignalingError::Auth(e)),
    }

    let profil = match state
        .konten
        .anlegen(NeuesKonto {
            username: request.username,
            passwort: request.password,
            vorname: request.first_name,
            nachname: request.last_name,
            email: request.email,
            stadt: request.city,
            geschlecht: request.gender,
            profilbild: request.profile_picture,
            ..Default::default()
        })
        .await
    {
        Ok(profil) => profil,
        Err(e) => return fehler_nachricht(&SignalingError::Auth(e)),
    };

    if let Err(e) = state
        .registry
        .anmelden(ctx.peer_addr, profil.user_id, &profil.username)
    {
        return fehler_nachricht(&e);
    }

    let anmeldung = Anmeldung {
        user_id: profil.user_id,
        username: profil.username,
    };
    verbunden_melden(state, &anmeldung, profil.rolle);
    ctx.anmeldung = Some(anmeldung);

    ProtocolMessage::RegistrationSuccess
}

/// Prueft ob ein Benutzername frei ist
pub async fn handle_check_username(request: UsernameCheck, state: &ServerState) -> ProtocolMessage {
    match state.konten.existiert(&request.username).await {
        Ok(true) => ProtocolMessage::fehler(ErrorCode::UsernameTaken, "Benutzername bereits vergeben"),
        Ok(false) => ProtocolMessage::UsernameAvailable,
        Err(e) => fehler_nachricht(&SignalingError::Auth(e)),
    }
}

/// Passwort vergessen
///
/// Antwortet immer mit `ForgotPasswordAccepted`, damit nicht erkennbar ist
/// ob der Benutzer existiert.
pub async fn handle_forgot_password(
    request: ForgotPasswordRequest,
    ctx: &mut DispatcherContext,
    state: &ServerState,
) -> ProtocolMessage {
    match state.konten.email(&request.username).await {
        Ok(Some(adresse)) => match state.mailer.senden(&request.code, &adresse).await {
            Ok(()) => {
                tracing::info!(username = %request.username, "Passwort-Reset angefordert");
                ctx.passwort_reset = Some(request.username);
            }
            Err(e) => {
                tracing::error!(username = %request.username, fehler = %e, "Reset-Code nicht versendet");
            }
        },
        Ok(None) => {
            tracing::debug!(username = %request.username, "Passwort-Reset fuer unbekannten Benutzer");
        }
        Err(e) => {
            tracing::error!(username = %request.username, fehler = %e, "Adresse nicht lesbar");
        }
    }
    ProtocolMessage::ForgotPasswordAccepted
}

/// Setzt ein neues Passwort
///
/// Erlaubt fuer den offenen Reset dieser Sitzung oder den eigenen Benutzer.
pub async fn handle_update_password(
    request: UpdatePasswordRequest,
    ctx: &mut DispatcherContext,
    state: &ServerState,
) -> ProtocolMessage {
    let erlaubt = ctx.passwort_reset.as_deref() == Some(request.username.as_str())
        || ctx
            .anmeldung
            .as_ref()
            .is_some_and(|a| a.username == request.username);
    if !erlaubt {
        tracing::warn!(peer = %ctx.peer_addr, username = %request.username, "Passwort-Aenderung verweigert");
        return ProtocolMessage::fehler(ErrorCode::PermissionDenied, "Keine Berechtigung");
    }
    if request.password.is_empty() {
        return ProtocolMessage::fehler(ErrorCode::InvalidRequest, "Leeres Passwort");
    }

    match state
        .konten
        .passwort_setzen(&request.username, &request.password)
        .await
    {
        Ok(()) => {
            ctx.passwort_reset = None;
            tracing::info!(username = %request.username, "Passwort geaendert");
            ProtocolMessage::PasswordUpdated
        }
        Err(e) => fehler_nachricht(&SignalingError::Auth(e)),
    }
}
