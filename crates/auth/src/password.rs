//! Passwort-Hashing mit Argon2id
//!
//! Stellt sichere Passwort-Hashfunktionen mit Argon2id bereit.
//! Argon2id ist der empfohlene Algorithmus gemaess OWASP-Richtlinien.
//!
//! Ein Hash kostet bewusst viel Rechenzeit und Speicher. Aus async Code
//! heraus daher nur die `*_blockierfrei`-Varianten benutzen, die auf dem
//! Blocking-Pool von tokio laufen.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::{AuthError, AuthResult};

/// Argon2id-Hasher mit festen Kosten-Parametern
#[derive(Clone)]
pub struct PasswortHasher {
    argon2: Argon2<'static>,
}

impl PasswortHasher {
    /// Werte gemaess OWASP-Empfehlungen (Stand 2024):
    /// - Speicher: 64 MiB
    /// - Iterationen: 3
    /// - Parallelismus: 1
    pub fn standard() -> AuthResult<Self> {
        Self::mit_parametern(64 * 1024, 3, 1)
    }

    /// Hasher mit eigenen Kosten (Speicher in KiB)
    pub fn mit_parametern(speicher_kib: u32, iterationen: u32, parallelismus: u32) -> AuthResult<Self> {
        let params = Params::new(speicher_kib, iterationen, parallelismus, None)
            .map_err(|e| AuthError::PasswortHashing(format!("Argon2-Parameter ungueltig: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hasht ein Passwort mit einem zufaelligen Salt
    ///
    /// Gibt den PHC-String zurueck (inkl. Algorithmus, Parameter und Salt).
    pub fn hashen(&self, passwort: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(passwort.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswortHashing(e.to_string()))
    }

    /// Verifiziert ein Passwort gegen einen gespeicherten PHC-Hash
    pub fn verifizieren(&self, passwort: &str, hash: &str) -> AuthResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::PasswortHashing(format!("Ungueltiges Hash-Format: {e}")))?;

        match self.argon2.verify_password(passwort.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswortHashing(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Async-Varianten
// ---------------------------------------------------------------------------

impl PasswortHasher {
    /// [`hashen`](Self::hashen) via `spawn_blocking`
    pub async fn hashen_blockierfrei(&self, passwort: &str) -> AuthResult<String> {
        let hasher = self.clone();
        let passwort = passwort.to_owned();
        tokio::task::spawn_blocking(move || hasher.hashen(&passwort))
            .await
            .map_err(abgebrochen)?
    }

    /// [`verifizieren`](Self::verifizieren) via `spawn_blocking`
    pub async fn verifizieren_blockierfrei(&self, passwort: &str, hash: &str) -> AuthResult<bool> {
        let hasher = self.clone();
        let passwort = passwort.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verifizieren(&passwort, &hash))
            .await
            .map_err(abgebrochen)?
    }
}

fn abgebrochen(e: tokio::task::JoinError) -> AuthError {
    AuthError::PasswortHashing(format!("Hash-Task abgebrochen: {e}"))
}

impl std::fmt::Debug for PasswortHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswortHasher").finish_non_exhaustive()
    }
}
