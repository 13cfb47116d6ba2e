//! Nachrichten-Dispatcher – Routet dekodierte Nachrichten an Handler
//!
//! Der Dispatcher empfaengt das Ergebnis des Dekodierens und ruft den
//! zustaendigen Handler auf. Nicht angemeldete Sitzungen duerfen nur die
//! Auth-Familie nutzen. Die direkte Antwort (falls vorhanden) wird von der
//! Verbindung in die eigene Send-Queue eingereiht.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use treffpunkt_auth::LoginSperre;
use treffpunkt_protocol::{Dekodiert, ErrorCode, ProtocolMessage};

use crate::handlers::{auth_handler, chat_handler, media_handler, roster_handler};
use crate::registry::Anmeldung;
use crate::rooms::FlagArt;
use crate::server_state::ServerState;

/// Zustand einer Sitzung, den der Dispatcher zwischen Nachrichten haelt
#[derive(Debug)]
pub struct DispatcherContext {
    /// Adresse des Clients
    pub peer_addr: SocketAddr,
    /// Angemeldeter Benutzer (nach Login oder Registrierung)
    pub anmeldung: Option<Anmeldung>,
    /// Fehlversuchs-Zaehler fuer Logins
    pub sperre: LoginSperre,
    /// Benutzername eines offenen Passwort-Resets
    pub passwort_reset: Option<String>,
}

impl DispatcherContext {
    pub fn neu(peer_addr: SocketAddr, login_schwelle: u32) -> Self {
        Self {
            peer_addr,
            anmeldung: None,
            sperre: LoginSperre::neu(login_schwelle),
            passwort_reset: None,
        }
    }
}

/// Routet Nachrichten an die zustaendigen Handler
pub struct MessageDispatcher {
    state: Arc<ServerState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine dekodierte Nachricht und gibt die Antwort zurueck
    ///
    /// `None` wenn die Antwort ueber die Send-Queue geht oder keine noetig ist.
    pub async fn dispatch(
        &self,
        eingang: Dekodiert,
        ctx: &mut DispatcherContext,
    ) -> Option<ProtocolMessage> {
        match eingang {
            Dekodiert::Nachricht(nachricht) => self.nachricht(nachricht, ctx).await,
            Dekodiert::Unbekannt { kind } => {
                tracing::warn!(peer = %ctx.peer_addr, kind = %kind, "Unbekannte Nachricht");
                Some(ProtocolMessage::fehler(
                    ErrorCode::InvalidRequest,
                    format!("Unbekannte Nachricht '{kind}'"),
                ))
            }
            Dekodiert::Fehlerhaft(grund) => {
                tracing::warn!(peer = %ctx.peer_addr, grund = %grund, "Nachricht nicht lesbar");
                Some(ProtocolMessage::fehler(
                    ErrorCode::InvalidRequest,
                    "Nachricht nicht lesbar",
                ))
            }
        }
    }

    async fn nachricht(
        &self,
        nachricht: ProtocolMessage,
        ctx: &mut DispatcherContext,
    ) -> Option<ProtocolMessage> {
        let state = self.state.as_ref();
        tracing::trace!(peer = %ctx.peer_addr, kind = nachricht.kind(), "Nachricht empfangen");

        if nachricht.ist_server_nachricht() {
            tracing::warn!(
                peer = %ctx.peer_addr,
                kind = nachricht.kind(),
                "Server->Client Nachricht vom Client empfangen"
            );
            return Some(ProtocolMessage::fehler(
                ErrorCode::InvalidRequest,
                "Unerwartete Nachricht",
            ));
        }

        match nachricht {
            // -------------------------------------------------------------------
            // Auth (auch ohne Anmeldung)
            // -------------------------------------------------------------------
            ProtocolMessage::Login(_) | ProtocolMessage::Register(_)
                if ctx.anmeldung.is_some() =>
            {
                Some(ProtocolMessage::fehler(
                    ErrorCode::AlreadyLoggedIn,
                    "Bereits angemeldet",
                ))
            }

            ProtocolMessage::Login(req) => {
                Some(auth_handler::handle_login(req, Instant::now(), ctx, state).await)
            }

            ProtocolMessage::Register(req) => {
                Some(auth_handler::handle_register(req, ctx, state).await)
            }

            ProtocolMessage::CheckUsernameExists(req) => {
                Some(auth_handler::handle_check_username(req, state).await)
            }

            ProtocolMessage::ForgotPassword(req) => {
                Some(auth_handler::handle_forgot_password(req, ctx, state).await)
            }

            ProtocolMessage::UpdatePassword(req) => {
                Some(auth_handler::handle_update_password(req, ctx, state).await)
            }

            // -------------------------------------------------------------------
            // Alles andere erfordert eine Anmeldung
            // -------------------------------------------------------------------
            andere => {
                let Some(anmeldung) = ctx.anmeldung.clone() else {
                    return Some(ProtocolMessage::fehler(
                        ErrorCode::NotAuthenticated,
                        "Nicht angemeldet",
                    ));
                };
                self.dispatch_authenticated(andere, &anmeldung).await
            }
        }
    }

    /// Routet Nachrichten die eine Anmeldung erfordern
    async fn dispatch_authenticated(
        &self,
        nachricht: ProtocolMessage,
        anmeldung: &Anmeldung,
    ) -> Option<ProtocolMessage> {
        let state = self.state.as_ref();
        let user_id = anmeldung.user_id;

        match nachricht {
            // -------------------------------------------------------------------
            // SessionInit / Roster
            // -------------------------------------------------------------------
            ProtocolMessage::GetProfile => {
                Some(roster_handler::handle_get_profile(user_id, state).await)
            }

            ProtocolMessage::FetchAllUsers => {
                Some(roster_handler::handle_fetch_all_users(state).await)
            }

            ProtocolMessage::FetchUserImage(req) => {
                Some(roster_handler::handle_fetch_user_image(req, state).await)
            }

            ProtocolMessage::RoleUpdateRequest(req) => {
                roster_handler::handle_role_update(req, user_id, state).await
            }

            // -------------------------------------------------------------------
            // Chat
            // -------------------------------------------------------------------
            ProtocolMessage::SendMessage(req) => {
                chat_handler::handle_send_message(req, anmeldung, state).await
            }

            ProtocolMessage::GetHistory(req) => {
                chat_handler::handle_get_history(req, anmeldung, state).await
            }

            // -------------------------------------------------------------------
            // Medien
            // -------------------------------------------------------------------
            ProtocolMessage::ConnectToRoom(req) => {
                media_handler::handle_connect_to_room(req, user_id, state).await
            }

            ProtocolMessage::DisconnectFromRoom(req) => {
                media_handler::handle_disconnect_from_room(req, user_id, state).await
            }

            ProtocolMessage::SetMute(req) => {
                media_handler::handle_flag_setzen(req, FlagArt::Stumm, user_id, state).await
            }

            ProtocolMessage::SetDeafen(req) => {
                media_handler::handle_flag_setzen(req, FlagArt::Taub, user_id, state).await
            }

            ProtocolMessage::SetVideoMute(req) => {
                media_handler::handle_flag_setzen(req, FlagArt::VideoAus, user_id, state).await
            }

            ProtocolMessage::ForceDisconnectParticipant(req) => {
                media_handler::handle_force_disconnect(req, user_id, state).await
            }

            // Auth-Familie und Server-Nachrichten wurden oben behandelt
            andere => {
                tracing::warn!(user_id = %user_id, kind = andere.kind(), "Nicht routbare Nachricht");
                Some(ProtocolMessage::fehler(
                    ErrorCode::InvalidRequest,
                    "Unerwartete Nachricht",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use treffpunkt_auth::{
        AuthError, AuthResult, CredentialStore, LogMailer, Mailer, NeuesKonto, PasswortHasher,
        SpeicherKonten,
    };
    use treffpunkt_chat::{BotKette, SpeicherVerlauf};
    use treffpunkt_core::{RaumId, Rolle, UserId};
    use treffpunkt_protocol::message::{
        ConnectToRoom, FlagSetzen, ForgotPasswordRequest, LoginRequest, RegisterRequest,
        RoleUpdate, UpdatePasswordRequest, UsernameCheck,
    };

    use crate::server_state::{Dienste, ServerState, SignalingConfig};

    struct KaputterMailer;

    #[async_trait]
    impl Mailer for KaputterMailer {
        async fn senden(&self, _code: &str, _adresse: &str) -> AuthResult<()> {
            Err(AuthError::MailVersand("kein Server".into()))
        }
    }

    fn state_mit(mailer: Arc<dyn Mailer>) -> Arc<ServerState> {
        let hasher = PasswortHasher::mit_parametern(8, 1, 1).unwrap();
        ServerState::neu(
            SignalingConfig::default(),
            Dienste {
                konten: Arc::new(SpeicherKonten::neu(hasher).mit_admins(["chef".to_string()])),
                mailer,
                verlauf: Arc::new(SpeicherVerlauf::neu()),
                bots: Arc::new(BotKette::neu()),
            },
        )
    }

    fn state() -> Arc<ServerState> {
        state_mit(Arc::new(LogMailer))
    }

    async fn konto(state: &ServerState, name: &str) -> UserId {
        state
            .konten
            .anlegen(NeuesKonto {
                username: name.into(),
                passwort: "geheim".into(),
                email: format!("{name}@example.org"),
                ..Default::default()
            })
            .await
            .unwrap()
            .user_id
    }

    /// Neue Sitzung im Register mit eigenem Kontext
    fn sitzung(
        state: &ServerState,
        port: u16,
    ) -> (DispatcherContext, mpsc::Receiver<ProtocolMessage>) {
        let peer = SocketAddr::from(([127, 0, 0, 1], port));
        let (tx, rx) = mpsc::channel(32);
        state.registry.registrieren(peer, tx);
        (DispatcherContext::neu(peer, 10), rx)
    }

    fn login(name: &str, passwort: &str) -> Dekodiert {
        Dekodiert::Nachricht(ProtocolMessage::Login(LoginRequest {
            username: name.into(),
            password: passwort.into(),
        }))
    }

    fn code_von(antwort: Option<ProtocolMessage>) -> ErrorCode {
        match antwort {
            Some(ProtocolMessage::Error(e)) => e.code,
            andere => panic!("keine Fehler-Antwort: {andere:?}"),
        }
    }

    #[tokio::test]
    async fn login_erfolgreich_sendet_code() {
        let state = state();
        let uid = konto(&state, "alice").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = sitzung(&state, 1000);

        match d.dispatch(login("alice", "geheim"), &mut ctx).await {
            Some(ProtocolMessage::CodeSentNotice(n)) => assert_eq!(n.code.len(), 6),
            andere => panic!("unerwartet: {andere:?}"),
        }
        assert_eq!(ctx.anmeldung.as_ref().unwrap().user_id, uid);
        assert!(state.registry.ist_online(&uid));

        // Zweiter Login in derselben Sitzung
        assert_eq!(
            code_von(d.dispatch(login("alice", "geheim"), &mut ctx).await),
            ErrorCode::AlreadyLoggedIn
        );
    }

    #[tokio::test]
    async fn zweite_sitzung_desselben_benutzers_wird_abgelehnt() {
        let state = state();
        let uid = konto(&state, "alice").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut erste, _rx1) = sitzung(&state, 1000);
        let (mut zweite, _rx2) = sitzung(&state, 1001);

        d.dispatch(login("alice", "geheim"), &mut erste).await;
        assert_eq!(
            code_von(d.dispatch(login("alice", "geheim"), &mut zweite).await),
            ErrorCode::AlreadyConnected
        );
        assert!(zweite.anmeldung.is_none());
        assert_eq!(
            state.registry.anmeldung(&erste.peer_addr).unwrap().user_id,
            uid
        );
    }

    #[tokio::test]
    async fn falsches_passwort_und_sperre() {
        let state = state();
        konto(&state, "alice").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = sitzung(&state, 1000);

        for _ in 0..9 {
            assert_eq!(
                code_von(d.dispatch(login("alice", "falsch"), &mut ctx).await),
                ErrorCode::InvalidCredentials
            );
        }
        match d.dispatch(login("alice", "falsch"), &mut ctx).await {
            Some(ProtocolMessage::CooldownNotice(n)) => assert_eq!(n.minutes, 1),
            andere => panic!("unerwartet: {andere:?}"),
        }
        // Auch das richtige Passwort wird waehrend der Sperre nicht geprueft
        assert!(matches!(
            d.dispatch(login("alice", "geheim"), &mut ctx).await,
            Some(ProtocolMessage::CooldownNotice(_))
        ));
        assert_eq!(ctx.sperre.fehlversuche(), 10);
        assert!(ctx.anmeldung.is_none());
    }

    #[tokio::test]
    async fn sperre_steigt_nach_ablauf() {
        let state = state();
        konto(&state, "alice").await;
        let (mut ctx, _rx) = sitzung(&state, 1000);
        let falsch = || LoginRequest {
            username: "alice".into(),
            password: "falsch".into(),
        };

        let t0 = Instant::now();
        for _ in 0..9 {
            auth_handler::handle_login(falsch(), t0, &mut ctx, &state).await;
        }
        let minuten = |m: ProtocolMessage| match m {
            ProtocolMessage::CooldownNotice(n) => n.minutes,
            andere => panic!("unerwartet: {andere:?}"),
        };

        let zehnter = auth_handler::handle_login(falsch(), t0, &mut ctx, &state).await;
        assert_eq!(minuten(zehnter), 1);

        let t1 = t0 + Duration::from_secs(61);
        let elfter = auth_handler::handle_login(falsch(), t1, &mut ctx, &state).await;
        assert_eq!(minuten(elfter), 5);

        let t2 = t1 + Duration::from_secs(5 * 60 + 1);
        let zwoelfter = auth_handler::handle_login(falsch(), t2, &mut ctx, &state).await;
        assert_eq!(minuten(zwoelfter), 10);

        // Erfolg setzt zurueck
        let t3 = t2 + Duration::from_secs(10 * 60 + 1);
        let ok = auth_handler::handle_login(
            LoginRequest {
                username: "alice".into(),
                password: "geheim".into(),
            },
            t3,
            &mut ctx,
            &state,
        )
        .await;
        assert!(matches!(ok, ProtocolMessage::CodeSentNotice(_)));
        assert_eq!(ctx.sperre.fehlversuche(), 0);
    }

    #[tokio::test]
    async fn mailfehler_loest_bindung() {
        let state = state_mit(Arc::new(KaputterMailer));
        let uid = konto(&state, "alice").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = sitzung(&state, 1000);

        assert_eq!(
            code_von(d.dispatch(login("alice", "geheim"), &mut ctx).await),
            ErrorCode::Internal
        );
        assert!(!state.registry.ist_online(&uid));
        assert!(ctx.anmeldung.is_none());
    }

    #[tokio::test]
    async fn ohne_anmeldung_nur_auth() {
        let state = state();
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = sitzung(&state, 1000);

        assert_eq!(
            code_von(
                d.dispatch(Dekodiert::Nachricht(ProtocolMessage::FetchAllUsers), &mut ctx)
                    .await
            ),
            ErrorCode::NotAuthenticated
        );
        assert_eq!(
            d.dispatch(
                Dekodiert::Nachricht(ProtocolMessage::CheckUsernameExists(UsernameCheck {
                    username: "frei".into()
                })),
                &mut ctx
            )
            .await,
            Some(ProtocolMessage::UsernameAvailable)
        );
    }

    #[tokio::test]
    async fn fehlerhafte_und_unbekannte_nachrichten() {
        let state = state();
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = sitzung(&state, 1000);

        assert_eq!(
            code_von(d.dispatch(Dekodiert::Fehlerhaft("kaputt".into()), &mut ctx).await),
            ErrorCode::InvalidRequest
        );
        assert_eq!(
            code_von(
                d.dispatch(
                    Dekodiert::Unbekannt {
                        kind: "teleport".into()
                    },
                    &mut ctx
                )
                .await
            ),
            ErrorCode::InvalidRequest
        );
        assert_eq!(
            code_von(
                d.dispatch(
                    Dekodiert::Nachricht(ProtocolMessage::RegistrationSuccess),
                    &mut ctx
                )
                .await
            ),
            ErrorCode::InvalidRequest
        );
    }

    #[tokio::test]
    async fn registrierung_bindet_und_meldet_an() {
        let state = state();
        konto(&state, "bob").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut bob, mut bob_rx) = sitzung(&state, 1000);
        let (mut neu, _rx) = sitzung(&state, 1001);

        d.dispatch(login("bob", "geheim"), &mut bob).await;

        let register = |name: &str| {
            Dekodiert::Nachricht(ProtocolMessage::Register(RegisterRequest {
                username: name.into(),
                password: "pw".into(),
                ..Default::default()
            }))
        };
        assert_eq!(
            code_von(d.dispatch(register("bob"), &mut neu).await),
            ErrorCode::UsernameTaken
        );
        assert_eq!(
            d.dispatch(register("carla"), &mut neu).await,
            Some(ProtocolMessage::RegistrationSuccess)
        );
        assert_eq!(neu.anmeldung.as_ref().unwrap().username, "carla");

        let mut gemeldet = false;
        while let Ok(m) = bob_rx.try_recv() {
            if let ProtocolMessage::UserConnected(u) = m {
                assert_eq!(u.username, "carla");
                gemeldet = true;
            }
        }
        assert!(gemeldet);
    }

    #[tokio::test]
    async fn passwort_reset_ablauf() {
        let state = state();
        konto(&state, "alice").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = sitzung(&state, 1000);

        let update = |name: &str| {
            Dekodiert::Nachricht(ProtocolMessage::UpdatePassword(UpdatePasswordRequest {
                username: name.into(),
                password: "neu".into(),
            }))
        };
        let vergessen = |name: &str| {
            Dekodiert::Nachricht(ProtocolMessage::ForgotPassword(ForgotPasswordRequest {
                username: name.into(),
                code: "ABC123".into(),
            }))
        };

        // Ohne Reset verboten
        assert_eq!(
            code_von(d.dispatch(update("alice"), &mut ctx).await),
            ErrorCode::PermissionDenied
        );

        // Unbekannter Benutzer: gleiche Antwort, kein Reset
        assert_eq!(
            d.dispatch(vergessen("niemand"), &mut ctx).await,
            Some(ProtocolMessage::ForgotPasswordAccepted)
        );
        assert!(ctx.passwort_reset.is_none());

        assert_eq!(
            d.dispatch(vergessen("alice"), &mut ctx).await,
            Some(ProtocolMessage::ForgotPasswordAccepted)
        );
        assert_eq!(
            d.dispatch(update("alice"), &mut ctx).await,
            Some(ProtocolMessage::PasswordUpdated)
        );
        assert!(matches!(
            d.dispatch(login("alice", "neu"), &mut ctx).await,
            Some(ProtocolMessage::CodeSentNotice(_))
        ));
    }

    #[tokio::test]
    async fn rollen_nur_durch_admin() {
        let state = state();
        konto(&state, "chef").await;
        let mitglied = konto(&state, "alice").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut admin_ctx, mut admin_rx) = sitzung(&state, 1000);
        let (mut alice_ctx, _rx) = sitzung(&state, 1001);
        d.dispatch(login("chef", "geheim"), &mut admin_ctx).await;
        d.dispatch(login("alice", "geheim"), &mut alice_ctx).await;

        let anfrage = |rolle| {
            Dekodiert::Nachricht(ProtocolMessage::RoleUpdateRequest(RoleUpdate {
                user_id: mitglied,
                role: rolle,
            }))
        };

        assert_eq!(
            code_von(d.dispatch(anfrage(Rolle::Admin), &mut alice_ctx).await),
            ErrorCode::PermissionDenied
        );

        while admin_rx.try_recv().is_ok() {}
        assert!(d
            .dispatch(anfrage(Rolle::Moderator), &mut admin_ctx)
            .await
            .is_none());
        assert_eq!(
            state.konten.rolle(mitglied).await.unwrap(),
            Some(Rolle::Moderator)
        );
        assert!(matches!(
            admin_rx.try_recv(),
            Ok(ProtocolMessage::RoleUpdatedBroadcast(r)) if r.role == Rolle::Moderator
        ));
    }

    #[tokio::test]
    async fn fremde_flags_nur_fuer_moderatoren() {
        let state = state();
        let alice = konto(&state, "alice").await;
        let bob = konto(&state, "bob").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut alice_ctx, _a) = sitzung(&state, 1000);
        let (mut bob_ctx, _b) = sitzung(&state, 1001);
        d.dispatch(login("alice", "geheim"), &mut alice_ctx).await;
        d.dispatch(login("bob", "geheim"), &mut bob_ctx).await;

        let stumm = |ziel| {
            Dekodiert::Nachricht(ProtocolMessage::SetMute(FlagSetzen {
                user_id: ziel,
                value: true,
            }))
        };

        assert_eq!(
            code_von(d.dispatch(stumm(bob), &mut alice_ctx).await),
            ErrorCode::PermissionDenied
        );
        assert!(!state.raeume.flags(&bob).is_muted);

        // Eigenes Flag, auch ueber die leere Id
        assert!(d.dispatch(stumm(alice), &mut alice_ctx).await.is_none());
        assert!(d
            .dispatch(stumm(UserId::SYSTEM), &mut bob_ctx)
            .await
            .is_none());
        assert!(state.raeume.flags(&bob).is_muted);

        state.konten.rolle_setzen(alice, Rolle::Moderator).await.unwrap();
        assert!(d.dispatch(stumm(bob), &mut alice_ctx).await.is_none());
    }

    #[tokio::test]
    async fn unbekannter_raum_ist_fehler() {
        let state = state();
        konto(&state, "alice").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = sitzung(&state, 1000);
        d.dispatch(login("alice", "geheim"), &mut ctx).await;

        let beitreten = |raum| {
            Dekodiert::Nachricht(ProtocolMessage::ConnectToRoom(ConnectToRoom {
                media_room_id: RaumId(raum),
                media_port: 5000,
            }))
        };
        assert_eq!(
            code_von(d.dispatch(beitreten(42), &mut ctx).await),
            ErrorCode::NotFound
        );
        assert!(d.dispatch(beitreten(1), &mut ctx).await.is_none());
    }

    #[tokio::test]
    async fn benutzerliste_mit_online_und_raum() {
        let state = state();
        let alice = konto(&state, "alice").await;
        konto(&state, "bob").await;
        let d = MessageDispatcher::neu(Arc::clone(&state));
        let (mut ctx, _rx) = sitzung(&state, 1000);
        d.dispatch(login("alice", "geheim"), &mut ctx).await;
        state.koordinator.beitreten(RaumId(2), alice, 1).await.unwrap();

        match d
            .dispatch(Dekodiert::Nachricht(ProtocolMessage::FetchAllUsers), &mut ctx)
            .await
        {
            Some(ProtocolMessage::AllUsersDetailsResult(alle)) => {
                assert_eq!(alle.users.len(), 2);
                let a = &alle.users[0];
                assert_eq!(a.username, "alice");
                assert!(a.is_online);
                assert_eq!(a.media_room_id, Some(RaumId(2)));
                assert!(!alle.users[1].is_online);
                assert_eq!(alle.users[1].media_room_id, None);
            }
            andere => panic!("unerwartet: {andere:?}"),
        }
    }
}
