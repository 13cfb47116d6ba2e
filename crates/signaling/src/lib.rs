//! treffpunkt-signaling – Verbindungen, Sitzungen und Raum-Koordination
//!
//! Dieser Crate nimmt TCP-Verbindungen an, fuehrt den Handshake fuer den
//! verschluesselten Kanal aus, verwaltet angemeldete Benutzer und
//! koordiniert Chat-Verteilung und Medien-Raeume.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer) -- Zulassung pro IP
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task + Writer-Task)
//!     |  Handshake -> entschluesseln -> split -> decode
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- AuthHandler    (Register, Login, Passwort-Reset)
//!     +-- RosterHandler  (Profil, Benutzerliste, Rollen)
//!     +-- ChatHandler    (Senden, Verlauf)
//!     +-- MediaHandler   (Raeume, Flags, Trennen)
//!
//! Verbindungsregister – Sitzungen, Anmeldungen, gezieltes Senden
//! RaumKoordinator     – Chat-Fan-out und Medien-Raum-Signaling
//! ```

pub mod admission;
pub mod channel;
pub mod connection;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod rooms;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use admission::{Zulassung, ZulassungsKonfig};
pub use connection::ClientConnection;
pub use coordinator::RaumKoordinator;
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use registry::{Anmeldung, ClientSender, Verbindungsregister};
pub use rooms::{FlagArt, MedienRaeume, STANDARD_RAUM_ANZAHL};
pub use server_state::{Dienste, ServerState, SignalingConfig};
pub use tcp::SignalingServer;
