//! Alle Nachrichten zwischen Client und Server
//!
//! Jede Nachrichtenart ist eine Variante von [`ProtocolMessage`] mit genau
//! einer Payload-Struktur. Der Diskriminator `kind` steht im JSON-Objekt
//! neben den Feldern der Payload. Fehlende Felder werden beim Dekodieren mit
//! neutralen Werten belegt, unbekannte Felder ignoriert.
//!
//! ## Familien
//! - Auth: Registrierung, Login, Passwort-Reset, Cooldown, Fehler
//! - SessionInit: Profil nach erfolgreicher Anmeldung
//! - Chat: Text-Nachrichten, Verlauf, Profilbilder
//! - Roster/Presence: Benutzerliste, Rollen, An-/Abmeldung
//! - MediaSignaling: Voice/Video-Raeume, Teilnehmer-Endpunkte, Stummschaltung

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use treffpunkt_core::{ChatRaumId, RaumId, Rolle, UserId};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer `error`-Antworten
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Allgemein
    #[default]
    Internal,
    InvalidRequest,
    NotAuthenticated,
    NotFound,
    PermissionDenied,
    // Auth
    InvalidCredentials,
    AlreadyLoggedIn,
    AlreadyConnected,
    UsernameTaken,
    // Medien
    NotInRoom,
}

// ---------------------------------------------------------------------------
// Base64 fuer Binaerdaten
// ---------------------------------------------------------------------------

/// Serde-Helfer: `Vec<u8>` als Standard-Base64-Text
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Registrierung eines neuen Kontos
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    /// Klartext, wird serverseitig gehasht
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub city: String,
    pub gender: String,
    #[serde(with = "base64_bytes")]
    pub profile_picture: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Anfrage ob ein Benutzername bereits vergeben ist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsernameCheck {
    pub username: String,
}

/// Passwort vergessen: der Client waehlt den Code selbst und laesst ihn
/// an die hinterlegte Adresse schicken
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub username: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePasswordRequest {
    pub username: String,
    pub password: String,
}

/// Bestaetigungscode wurde per Mail verschickt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeSentNotice {
    pub code: String,
}

/// Zu viele Fehlversuche, Login voruebergehend gesperrt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownNotice {
    pub message: String,
    /// Verbleibende Minuten (aufgerundet)
    pub minutes: u64,
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// SessionInit
// ---------------------------------------------------------------------------

/// Profil des eigenen Benutzers nach erfolgreicher Anmeldung
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectedSuccess {
    pub user_id: UserId,
    pub username: String,
    #[serde(with = "base64_bytes")]
    pub profile_picture: Vec<u8>,
    pub role: Rolle,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendMessageRequest {
    pub text: String,
    pub chat_room_id: ChatRaumId,
}

/// Eine Chat-Nachricht wie sie an Empfaenger ausgeliefert wird
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub user_id: UserId,
    pub username: String,
    pub text: String,
    /// Vom Server vergebener Zeitstempel (RFC 3339, UTC)
    pub sent_at: DateTime<Utc>,
    pub chat_room_id: ChatRaumId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRequest {
    pub chat_room_id: ChatRaumId,
}

/// Verlauf eines Chat-Raums, aufsteigend nach Zeit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryResult {
    pub chat_room_id: ChatRaumId,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserImageRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserImageResult {
    pub user_id: UserId,
    #[serde(with = "base64_bytes")]
    pub profile_picture: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Roster / Presence
// ---------------------------------------------------------------------------

/// Eintrag der Benutzerliste
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDetails {
    pub user_id: UserId,
    pub username: String,
    #[serde(with = "base64_bytes")]
    pub profile_picture: Vec<u8>,
    pub role: Rolle,
    pub is_online: bool,
    /// Erster Medien-Raum in dem der Benutzer gerade ist
    pub media_room_id: Option<RaumId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllUsersDetails {
    pub users: Vec<UserDetails>,
}

/// Rollen-Aenderung (Anfrage und Broadcast)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleUpdate {
    pub user_id: UserId,
    pub role: Rolle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConnected {
    pub user_id: UserId,
    pub username: String,
    pub role: Rolle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDisconnected {
    pub user_id: UserId,
}

// ---------------------------------------------------------------------------
// MediaSignaling
// ---------------------------------------------------------------------------

/// Fluechtige Medien-Flags eines Benutzers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MedienFlags {
    pub is_muted: bool,
    pub is_deafened: bool,
    pub is_video_muted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectToRoom {
    pub media_room_id: RaumId,
    /// Port auf dem der Client Medien empfaengt
    pub media_port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisconnectFromRoom {
    pub media_room_id: RaumId,
}

/// Neuer Teilnehmer fuer die bisherigen Mitglieder eines Raums
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewParticipant {
    pub user_id: UserId,
    pub username: String,
    pub ip: String,
    pub media_port: u16,
}

/// Peer-Verbindungsdaten eines bestehenden Teilnehmers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantInfo {
    pub ip: String,
    pub media_port: u16,
    pub user_id: UserId,
    pub username: String,
    pub flags: MedienFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExistingParticipants {
    pub media_room_id: RaumId,
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantLeft {
    pub user_id: UserId,
    pub ip: String,
    pub media_room_id: RaumId,
}

/// Beitritt zu einem Raum, an alle verbundenen Benutzer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinChannel {
    pub user_id: UserId,
    pub username: String,
    pub media_room_id: RaumId,
    #[serde(with = "base64_bytes")]
    pub profile_picture: Vec<u8>,
    pub role: Rolle,
    pub flags: MedienFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaveChannel {
    pub user_id: UserId,
    pub media_room_id: RaumId,
}

/// Setzt ein Medien-Flag (eigenes oder, als Moderator, fremdes)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSetzen {
    pub user_id: UserId,
    pub value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuteState {
    pub user_id: UserId,
    pub is_muted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeafenState {
    pub user_id: UserId,
    pub is_deafened: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoMuteState {
    pub user_id: UserId,
    pub is_video_muted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceDisconnect {
    pub user_id: UserId,
    pub media_room_id: RaumId,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ProtocolMessage
// ---------------------------------------------------------------------------

/// Alle moeglichen Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolMessage {
    // Auth
    Register(RegisterRequest),
    Login(LoginRequest),
    CheckUsernameExists(UsernameCheck),
    UsernameAvailable,
    RegistrationSuccess,
    ForgotPassword(ForgotPasswordRequest),
    ForgotPasswordAccepted,
    UpdatePassword(UpdatePasswordRequest),
    PasswordUpdated,
    CodeSentNotice(CodeSentNotice),
    CooldownNotice(CooldownNotice),
    Error(ErrorResponse),

    // SessionInit
    GetProfile,
    ConnectedSuccess(ConnectedSuccess),

    // Chat
    SendMessage(SendMessageRequest),
    MessageFromOther(ChatMessage),
    GetHistory(HistoryRequest),
    HistoryResult(HistoryResult),
    FetchUserImage(UserImageRequest),
    UserImageResult(UserImageResult),

    // Roster / Presence
    FetchAllUsers,
    AllUsersDetailsResult(AllUsersDetails),
    RoleUpdateRequest(RoleUpdate),
    RoleUpdatedBroadcast(RoleUpdate),
    UserConnected(UserConnected),
    UserDisconnected(UserDisconnected),

    // MediaSignaling
    ConnectToRoom(ConnectToRoom),
    DisconnectFromRoom(DisconnectFromRoom),
    NewParticipantBroadcast(NewParticipant),
    ExistingParticipantsList(ExistingParticipants),
    ParticipantLeftBroadcast(ParticipantLeft),
    JoinChannelBroadcast(JoinChannel),
    LeaveChannelBroadcast(LeaveChannel),
    SetMute(FlagSetzen),
    SetDeafen(FlagSetzen),
    SetVideoMute(FlagSetzen),
    MuteState(MuteState),
    DeafenState(DeafenState),
    VideoMuteState(VideoMuteState),
    ForceDisconnectParticipant(ForceDisconnect),
}

/// Alle bekannten Werte des `kind`-Diskriminators
pub const BEKANNTE_KINDS: &[&str] = &[
    "register",
    "login",
    "check_username_exists",
    "username_available",
    "registration_success",
    "forgot_password",
    "forgot_password_accepted",
    "update_password",
    "password_updated",
    "code_sent_notice",
    "cooldown_notice",
    "error",
    "get_profile",
    "connected_success",
    "send_message",
    "message_from_other",
    "get_history",
    "history_result",
    "fetch_user_image",
    "user_image_result",
    "fetch_all_users",
    "all_users_details_result",
    "role_update_request",
    "role_updated_broadcast",
    "user_connected",
    "user_disconnected",
    "connect_to_room",
    "disconnect_from_room",
    "new_participant_broadcast",
    "existing_participants_list",
    "participant_left_broadcast",
    "join_channel_broadcast",
    "leave_channel_broadcast",
    "set_mute",
    "set_deafen",
    "set_video_mute",
    "mute_state",
    "deafen_state",
    "video_mute_state",
    "force_disconnect_participant",
];

impl ProtocolMessage {
    /// Erstellt eine Fehler-Antwort
    pub fn fehler(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorResponse {
            code,
            message: message.into(),
        })
    }

    /// Wert des `kind`-Diskriminators dieser Nachricht
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::Login(_) => "login",
            Self::CheckUsernameExists(_) => "check_username_exists",
            Self::UsernameAvailable => "username_available",
            Self::RegistrationSuccess => "registration_success",
            Self::ForgotPassword(_) => "forgot_password",
            Self::ForgotPasswordAccepted => "forgot_password_accepted",
            Self::UpdatePassword(_) => "update_password",
            Self::PasswordUpdated => "password_updated",
            Self::CodeSentNotice(_) => "code_sent_notice",
            Self::CooldownNotice(_) => "cooldown_notice",
            Self::Error(_) => "error",
            Self::GetProfile => "get_profile",
            Self::ConnectedSuccess(_) => "connected_success",
            Self::SendMessage(_) => "send_message",
            Self::MessageFromOther(_) => "message_from_other",
            Self::GetHistory(_) => "get_history",
            Self::HistoryResult(_) => "history_result",
            Self::FetchUserImage(_) => "fetch_user_image",
            Self::UserImageResult(_) => "user_image_result",
            Self::FetchAllUsers => "fetch_all_users",
            Self::AllUsersDetailsResult(_) => "all_users_details_result",
            Self::RoleUpdateRequest(_) => "role_update_request",
            Self::RoleUpdatedBroadcast(_) => "role_updated_broadcast",
            Self::UserConnected(_) => "user_connected",
            Self::UserDisconnected(_) => "user_disconnected",
            Self::ConnectToRoom(_) => "connect_to_room",
            Self::DisconnectFromRoom(_) => "disconnect_from_room",
            Self::NewParticipantBroadcast(_) => "new_participant_broadcast",
            Self::ExistingParticipantsList(_) => "existing_participants_list",
            Self::ParticipantLeftBroadcast(_) => "participant_left_broadcast",
            Self::JoinChannelBroadcast(_) => "join_channel_broadcast",
            Self::LeaveChannelBroadcast(_) => "leave_channel_broadcast",
            Self::SetMute(_) => "set_mute",
            Self::SetDeafen(_) => "set_deafen",
            Self::SetVideoMute(_) => "set_video_mute",
            Self::MuteState(_) => "mute_state",
            Self::DeafenState(_) => "deafen_state",
            Self::VideoMuteState(_) => "video_mute_state",
            Self::ForceDisconnectParticipant(_) => "force_disconnect_participant",
        }
    }

    /// Gehoert die Nachricht zur Auth-Familie (vor dem Login erlaubt)?
    pub fn ist_auth(&self) -> bool {
        matches!(
            self,
            Self::Register(_)
                | Self::Login(_)
                | Self::CheckUsernameExists(_)
                | Self::ForgotPassword(_)
                | Self::UpdatePassword(_)
        )
    }

    /// Nachrichten die nur der Server verschickt
    pub fn ist_server_nachricht(&self) -> bool {
        matches!(
            self,
            Self::UsernameAvailable
                | Self::RegistrationSuccess
                | Self::ForgotPasswordAccepted
                | Self::PasswordUpdated
                | Self::CodeSentNotice(_)
                | Self::CooldownNotice(_)
                | Self::Error(_)
                | Self::ConnectedSuccess(_)
                | Self::MessageFromOther(_)
                | Self::HistoryResult(_)
                | Self::UserImageResult(_)
                | Self::AllUsersDetailsResult(_)
                | Self::RoleUpdatedBroadcast(_)
                | Self::UserConnected(_)
                | Self::UserDisconnected(_)
                | Self::NewParticipantBroadcast(_)
                | Self::ExistingParticipantsList(_)
                | Self::ParticipantLeftBroadcast(_)
                | Self::JoinChannelBroadcast(_)
                | Self::LeaveChannelBroadcast(_)
                | Self::MuteState(_)
                | Self::DeafenState(_)
                | Self::VideoMuteState(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
