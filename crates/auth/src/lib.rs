//! treffpunkt-auth – Konten und Anmeldung
//!
//! Dieses Crate implementiert:
//! - Passwort-Hashing mit Argon2id
//! - `CredentialStore`-Trait mit In-Memory-Implementierung (`SpeicherKonten`)
//! - `Mailer`-Trait fuer den Versand von Bestaetigungscodes (`LogMailer`)
//! - Login-Sperre nach wiederholten Fehlversuchen (`LoginSperre`)
//! - Generator fuer Bestaetigungscodes

pub mod code;
pub mod error;
pub mod konten;
pub mod mailer;
pub mod password;
pub mod sperre;

// Bequeme Re-Exporte
pub use code::{bestaetigungscode_erzeugen, CODE_ALPHABET, CODE_LAENGE};
pub use error::{AuthError, AuthResult};
pub use konten::{BenutzerProfil, CredentialStore, NeuesKonto, SpeicherKonten};
pub use mailer::{LogMailer, Mailer};
pub use password::PasswortHasher;
pub use sperre::{LoginSperre, SperrStatus, STANDARD_SCHWELLE};
