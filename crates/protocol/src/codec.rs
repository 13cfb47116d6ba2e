//! Nachrichten-Codec: JSON-Umschlag mit Trenn-Token
//!
//! Jede logische Nachricht wird als JSON-Objekt mit `kind` und `v`
//! kodiert und mit [`DELIMITER`] abgeschlossen. Ein entschluesselter Frame
//! kann mehrere solcher Nachrichten enthalten; [`split`] trennt sie wieder.
//!
//! Dekodieren schlaegt nie fehl: kaputte Eingaben werden zu
//! [`Dekodiert::Fehlerhaft`], fremde Versionen oder Arten zu
//! [`Dekodiert::Unbekannt`].

use serde_json::Value;

use crate::error::{ProtokollFehler, ProtokollResult};
use crate::message::{ProtocolMessage, BEKANNTE_KINDS};

/// Trenn-Token zwischen logischen Nachrichten
pub const DELIMITER: &str = "vvbeclkuujdtfkktdjnktkucgdtjitckvllgtevvhicj";

/// Aktuelle Version des JSON-Umschlags
pub const PROTOKOLL_VERSION: u64 = 1;

/// Ergebnis von [`decode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dekodiert {
    /// Gueltige Nachricht einer bekannten Art
    Nachricht(ProtocolMessage),
    /// Syntaktisch gueltig, aber unbekannte Art oder Version
    Unbekannt { kind: String },
    /// Kein gueltiges JSON-Objekt oder Felder passen nicht zur Art
    Fehlerhaft(String),
}

/// Kodiert eine Nachricht inklusive abschliessendem Trenn-Token
pub fn encode(msg: &ProtocolMessage) -> ProtokollResult<String> {
    let mut wert = serde_json::to_value(msg)?;
    let objekt = wert.as_object_mut().ok_or(ProtokollFehler::KeinObjekt)?;
    objekt.insert("v".into(), Value::from(PROTOKOLL_VERSION));

    let mut text = serde_json::to_string(&wert)?;
    text.push_str(DELIMITER);
    Ok(text)
}

/// Kodiert mehrere Nachrichten hintereinander (ein Frame-Payload)
pub fn encode_batch<'a, I>(nachrichten: I) -> ProtokollResult<String>
where
    I: IntoIterator<Item = &'a ProtocolMessage>,
{
    let mut payload = String::new();
    for msg in nachrichten {
        payload.push_str(&encode(msg)?);
    }
    Ok(payload)
}

/// Dekodiert genau eine logische Nachricht (ohne Trenn-Token)
pub fn decode(text: &str) -> Dekodiert {
    let wert: Value = match serde_json::from_str(text) {
        Ok(w) => w,
        Err(e) => return Dekodiert::Fehlerhaft(format!("Kein gueltiges JSON: {}", e)),
    };

    let Some(objekt) = wert.as_object() else {
        return Dekodiert::Fehlerhaft("Nachricht ist kein JSON-Objekt".into());
    };

    let kind = match objekt.get("kind").and_then(Value::as_str) {
        Some(k) => k.to_string(),
        None => return Dekodiert::Fehlerhaft("Feld 'kind' fehlt".into()),
    };

    // Fehlende Version gilt als aktuelle Version
    let version = objekt
        .get("v")
        .map(|v| v.as_u64())
        .unwrap_or(Some(PROTOKOLL_VERSION));
    if version != Some(PROTOKOLL_VERSION) || !BEKANNTE_KINDS.contains(&kind.as_str()) {
        return Dekodiert::Unbekannt { kind };
    }

    match serde_json::from_value::<ProtocolMessage>(wert) {
        Ok(msg) => Dekodiert::Nachricht(msg),
        Err(e) => Dekodiert::Fehlerhaft(format!("Ungueltige Felder fuer '{}': {}", kind, e)),
    }
}

/// Zerlegt einen Payload am Trenn-Token, leere Fragmente entfallen
pub fn split(payload: &str) -> impl Iterator<Item = &str> {
    payload
        .split(DELIMITER)
        .filter(|teil| !teil.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::*;
    use chrono::{TimeZone, Utc};
    use treffpunkt_core::{ChatRaumId, RaumId, Rolle, UserId};

    fn alle_arten() -> Vec<ProtocolMessage> {
        let uid = UserId::new();
        let zeit = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap();
        let chat = ChatMessage {
            user_id: uid,
            username: "anna".into(),
            text: "Hallo zusammen".into(),
            sent_at: zeit,
            chat_room_id: ChatRaumId(4),
        };
        let flags = MedienFlags {
            is_muted: true,
            is_deafened: false,
            is_video_muted: true,
        };
        vec![
            ProtocolMessage::Register(RegisterRequest {
                username: "anna".into(),
                password: "pw".into(),
                first_name: "Anna".into(),
                last_name: "Berg".into(),
                email: "anna@example.org".into(),
                city: "Graz".into(),
                gender: "w".into(),
                profile_picture: vec![1, 2, 3],
            }),
            ProtocolMessage::Login(LoginRequest {
                username: "anna".into(),
                password: "pw".into(),
            }),
            ProtocolMessage::CheckUsernameExists(UsernameCheck {
                username: "anna".into(),
            }),
            ProtocolMessage::UsernameAvailable,
            ProtocolMessage::RegistrationSuccess,
            ProtocolMessage::ForgotPassword(ForgotPasswordRequest {
                username: "anna".into(),
                code: "AbC#12".into(),
            }),
            ProtocolMessage::ForgotPasswordAccepted,
            ProtocolMessage::UpdatePassword(UpdatePasswordRequest {
                username: "anna".into(),
                password: "neu".into(),
            }),
            ProtocolMessage::PasswordUpdated,
            ProtocolMessage::CodeSentNotice(CodeSentNotice {
                code: "x7?Qa-".into(),
            }),
            ProtocolMessage::CooldownNotice(CooldownNotice {
                message: "Zu viele Versuche".into(),
                minutes: 5,
            }),
            ProtocolMessage::fehler(ErrorCode::InvalidCredentials, "falsch"),
            ProtocolMessage::GetProfile,
            ProtocolMessage::ConnectedSuccess(ConnectedSuccess {
                user_id: uid,
                username: "anna".into(),
                profile_picture: vec![9],
                role: Rolle::Admin,
            }),
            ProtocolMessage::SendMessage(SendMessageRequest {
                text: "Hallo".into(),
                chat_room_id: ChatRaumId(4),
            }),
            ProtocolMessage::MessageFromOther(chat.clone()),
            ProtocolMessage::GetHistory(HistoryRequest {
                chat_room_id: ChatRaumId(4),
            }),
            ProtocolMessage::HistoryResult(HistoryResult {
                chat_room_id: ChatRaumId(4),
                messages: vec![chat],
            }),
            ProtocolMessage::FetchUserImage(UserImageRequest { user_id: uid }),
            ProtocolMessage::UserImageResult(UserImageResult {
                user_id: uid,
                profile_picture: vec![0xAB; 64],
            }),
            ProtocolMessage::FetchAllUsers,
            ProtocolMessage::AllUsersDetailsResult(AllUsersDetails {
                users: vec![UserDetails {
                    user_id: uid,
                    username: "anna".into(),
                    profile_picture: vec![],
                    role: Rolle::Mitglied,
                    is_online: true,
                    media_room_id: Some(RaumId(1)),
                }],
            }),
            ProtocolMessage::RoleUpdateRequest(RoleUpdate {
                user_id: uid,
                role: Rolle::Moderator,
            }),
            ProtocolMessage::RoleUpdatedBroadcast(RoleUpdate {
                user_id: uid,
                role: Rolle::Moderator,
            }),
            ProtocolMessage::UserConnected(UserConnected {
                user_id: uid,
                username: "anna".into(),
                role: Rolle::Bot,
            }),
            ProtocolMessage::UserDisconnected(UserDisconnected { user_id: uid }),
            ProtocolMessage::ConnectToRoom(ConnectToRoom {
                media_room_id: RaumId(1),
                media_port: 40000,
            }),
            ProtocolMessage::DisconnectFromRoom(DisconnectFromRoom {
                media_room_id: RaumId(1),
            }),
            ProtocolMessage::NewParticipantBroadcast(NewParticipant {
                user_id: uid,
                username: "anna".into(),
                ip: "10.0.0.5".into(),
                media_port: 40000,
            }),
            ProtocolMessage::ExistingParticipantsList(ExistingParticipants {
                media_room_id: RaumId(1),
                participants: vec![ParticipantInfo {
                    ip: "10.0.0.6".into(),
                    media_port: 40002,
                    user_id: uid,
                    username: "bernd".into(),
                    flags,
                }],
            }),
            ProtocolMessage::ParticipantLeftBroadcast(ParticipantLeft {
                user_id: uid,
                ip: "10.0.0.5".into(),
                media_room_id: RaumId(1),
            }),
            ProtocolMessage::JoinChannelBroadcast(JoinChannel {
                user_id: uid,
                username: "anna".into(),
                media_room_id: RaumId(3),
                profile_picture: vec![7, 7],
                role: Rolle::Mitglied,
                flags,
            }),
            ProtocolMessage::LeaveChannelBroadcast(LeaveChannel {
                user_id: uid,
                media_room_id: RaumId(3),
            }),
            ProtocolMessage::SetMute(FlagSetzen {
                user_id: uid,
                value: true,
            }),
            ProtocolMessage::SetDeafen(FlagSetzen {
                user_id: uid,
                value: false,
            }),
            ProtocolMessage::SetVideoMute(FlagSetzen {
                user_id: uid,
                value: true,
            }),
            ProtocolMessage::MuteState(MuteState {
                user_id: uid,
                is_muted: true,
            }),
            ProtocolMessage::DeafenState(DeafenState {
                user_id: uid,
                is_deafened: true,
            }),
            ProtocolMessage::VideoMuteState(VideoMuteState {
                user_id: uid,
                is_video_muted: false,
            }),
            ProtocolMessage::ForceDisconnectParticipant(ForceDisconnect {
                user_id: uid,
                media_room_id: RaumId(2),
            }),
        ]
    }

    #[test]
    fn jede_art_ueberlebt_encode_decode() {
        let arten = alle_arten();
        assert_eq!(arten.len(), BEKANNTE_KINDS.len(), "Jede Art muss getestet sein");

        for msg in arten {
            let text = encode(&msg).unwrap();
            assert!(text.ends_with(DELIMITER));
            let json = text.strip_suffix(DELIMITER).unwrap();
            assert_eq!(decode(json), Dekodiert::Nachricht(msg));
        }
    }

    #[test]
    fn encode_setzt_version() {
        let text = encode(&ProtocolMessage::GetProfile).unwrap();
        let json = text.strip_suffix(DELIMITER).unwrap();
        let wert: Value = serde_json::from_str(json).unwrap();
        assert_eq!(wert["v"], 1);
        assert_eq!(wert["kind"], "get_profile");
    }

    #[test]
    fn kaputtes_json_ist_fehlerhaft() {
        assert!(matches!(decode("{nicht json"), Dekodiert::Fehlerhaft(_)));
        assert!(matches!(decode("[1,2,3]"), Dekodiert::Fehlerhaft(_)));
        assert!(matches!(decode(r#"{"v":1}"#), Dekodiert::Fehlerhaft(_)));
        assert!(matches!(decode(""), Dekodiert::Fehlerhaft(_)));
    }

    #[test]
    fn unbekannte_art_oder_version() {
        assert_eq!(
            decode(r#"{"kind":"teleport","v":1}"#),
            Dekodiert::Unbekannt {
                kind: "teleport".into()
            }
        );
        assert_eq!(
            decode(r#"{"kind":"login","v":2}"#),
            Dekodiert::Unbekannt {
                kind: "login".into()
            }
        );
    }

    #[test]
    fn falscher_feldtyp_ist_fehlerhaft() {
        let ergebnis = decode(r#"{"kind":"connect_to_room","v":1,"media_port":"hoch"}"#);
        assert!(matches!(ergebnis, Dekodiert::Fehlerhaft(_)));
    }

    #[test]
    fn unbekannte_felder_werden_ignoriert() {
        let ergebnis = decode(
            r#"{"kind":"login","v":1,"username":"a","password":"b","text":"fremd","media_port":7}"#,
        );
        assert_eq!(
            ergebnis,
            Dekodiert::Nachricht(ProtocolMessage::Login(LoginRequest {
                username: "a".into(),
                password: "b".into(),
            }))
        );
    }

    #[test]
    fn split_liefert_nachrichten_in_reihenfolge() {
        let nachrichten = vec![
            ProtocolMessage::GetProfile,
            ProtocolMessage::FetchAllUsers,
            ProtocolMessage::UsernameAvailable,
        ];
        let payload = encode_batch(&nachrichten).unwrap();

        let dekodiert: Vec<_> = split(&payload).map(decode).collect();
        assert_eq!(dekodiert.len(), 3);
        for (d, erwartet) in dekodiert.into_iter().zip(nachrichten) {
            assert_eq!(d, Dekodiert::Nachricht(erwartet));
        }
    }

    #[test]
    fn split_verwirft_leere_fragmente() {
        let payload = format!("{d}{d}{{\"kind\":\"get_profile\"}}{d}  {d}", d = DELIMITER);
        let teile: Vec<_> = split(&payload).collect();
        assert_eq!(teile, vec![r#"{"kind":"get_profile"}"#]);
    }
}
