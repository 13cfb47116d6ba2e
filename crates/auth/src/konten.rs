//! Konten-Speicher
//!
//! `CredentialStore` ist die Schnittstelle zur Kontenverwaltung. Die
//! Referenz-Implementierung `SpeicherKonten` haelt alles im Speicher und
//! hasht Passwoerter mit Argon2id.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use treffpunkt_core::{Rolle, UserId};

use crate::error::{AuthError, AuthResult};
use crate::password::PasswortHasher;

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Oeffentlich sichtbares Profil eines Kontos
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenutzerProfil {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub rolle: Rolle,
    pub profilbild: Vec<u8>,
}

/// Daten fuer ein neues Konto
#[derive(Debug, Clone, Default)]
pub struct NeuesKonto {
    pub username: String,
    pub passwort: String,
    pub vorname: String,
    pub nachname: String,
    pub email: String,
    pub stadt: String,
    pub geschlecht: String,
    pub profilbild: Vec<u8>,
    pub rolle: Rolle,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Speicherung und Pruefung von Zugangsdaten
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Prueft Benutzername und Passwort; `None` bei falschen Daten
    async fn verifizieren(&self, username: &str, passwort: &str)
        -> AuthResult<Option<BenutzerProfil>>;

    async fn existiert(&self, username: &str) -> AuthResult<bool>;

    /// Legt ein Konto an; doppelte Namen ergeben `BenutzernameVergeben`
    async fn anlegen(&self, konto: NeuesKonto) -> AuthResult<BenutzerProfil>;

    async fn email(&self, username: &str) -> AuthResult<Option<String>>;

    async fn rolle(&self, user_id: UserId) -> AuthResult<Option<Rolle>>;

    async fn rolle_setzen(&self, user_id: UserId, rolle: Rolle) -> AuthResult<()>;

    async fn profil(&self, user_id: UserId) -> AuthResult<Option<BenutzerProfil>>;

    /// Alle Konten, nach Benutzername sortiert
    async fn alle_profile(&self) -> AuthResult<Vec<BenutzerProfil>>;

    async fn passwort_setzen(&self, username: &str, passwort: &str) -> AuthResult<()>;
}

// ---------------------------------------------------------------------------
// In-Memory-Implementierung
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct KontoEintrag {
    profil: BenutzerProfil,
    passwort_hash: String,
    #[allow(dead_code)]
    stammdaten: Stammdaten,
}

/// Registrierungsdaten ohne eigene Verwendung auf dem Server
#[allow(dead_code)]
#[derive(Debug, Clone)]
struct Stammdaten {
    vorname: String,
    nachname: String,
    stadt: String,
    geschlecht: String,
}

/// In-Memory Konten-Speicher
#[derive(Debug)]
pub struct SpeicherKonten {
    hasher: PasswortHasher,
    /// user_id -> Konto
    konten: DashMap<UserId, KontoEintrag>,
    /// username -> user_id
    namen: DashMap<String, UserId>,
    /// Benutzernamen die bei der Registrierung Admin werden
    admins: HashSet<String>,
}

impl SpeicherKonten {
    pub fn neu(hasher: PasswortHasher) -> Self {
        Self {
            hasher,
            konten: DashMap::new(),
            namen: DashMap::new(),
            admins: HashSet::new(),
        }
    }

    /// Diese Benutzernamen erhalten bei der Registrierung die Admin-Rolle
    pub fn mit_admins(mut self, admins: impl IntoIterator<Item = String>) -> Self {
        self.admins = admins.into_iter().collect();
        self
    }

    pub fn anzahl(&self) -> usize {
        self.konten.len()
    }

    fn id_von(&self, username: &str) -> Option<UserId> {
        self.namen.get(username).map(|id| *id)
    }
}

#[async_trait]
impl CredentialStore for SpeicherKonten {
    async fn verifizieren(
        &self,
        username: &str,
        passwort: &str,
    ) -> AuthResult<Option<BenutzerProfil>> {
        let Some(eintrag) = self
            .id_von(username)
            .and_then(|id| self.konten.get(&id).map(|k| k.clone()))
        else {
            return Ok(None);
        };

        let passt = self
            .hasher
            .verifizieren_blockierfrei(passwort, &eintrag.passwort_hash)
            .await?;
        if passt {
            Ok(Some(eintrag.profil))
        } else {
            Ok(None)
        }
    }

    async fn existiert(&self, username: &str) -> AuthResult<bool> {
        Ok(self.namen.contains_key(username))
    }

    async fn anlegen(&self, konto: NeuesKonto) -> AuthResult<BenutzerProfil> {
        if konto.username.trim().is_empty() {
            return Err(AuthError::intern("Leerer Benutzername"));
        }
        let passwort_hash = self.hasher.hashen_blockierfrei(&konto.passwort).await?;

        let rolle = if self.admins.contains(&konto.username) {
            Rolle::Admin
        } else {
            konto.rolle
        };

        match self.namen.entry(konto.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::BenutzernameVergeben(konto.username)),
            Entry::Vacant(frei) => {
                let profil = BenutzerProfil {
                    user_id: UserId::new(),
                    username: konto.username,
                    email: konto.email,
                    rolle,
                    profilbild: konto.profilbild,
                };
                self.konten.insert(
                    profil.user_id,
                    KontoEintrag {
                        profil: profil.clone(),
                        passwort_hash,
                        stammdaten: Stammdaten {
                            vorname: konto.vorname,
                            nachname: konto.nachname,
                            stadt: konto.stadt,
                            geschlecht: konto.geschlecht,
                        },
                    },
                );
                frei.insert(profil.user_id);

                tracing::info!(
                    user_id = %profil.user_id,
                    username = %profil.username,
                    rolle = %profil.rolle,
                    "Neues Konto angelegt"
                );
                Ok(profil)
            }
        }
    }

    async fn email(&self, username: &str) -> AuthResult<Option<String>> {
        Ok(self
            .id_von(username)
            .and_then(|id| self.konten.get(&id).map(|k| k.profil.email.clone())))
    }

    async fn rolle(&self, user_id: UserId) -> AuthResult<Option<Rolle>> {
        Ok(self.konten.get(&user_id).map(|k| k.profil.rolle))
    }

    async fn rolle_setzen(&self, user_id: UserId, rolle: Rolle) -> AuthResult<()> {
        let mut konto = self
            .konten
            .get_mut(&user_id)
            .ok_or_else(|| AuthError::BenutzerNichtGefunden(user_id.to_string()))?;
        konto.profil.rolle = rolle;
        Ok(())
    }

    async fn profil(&self, user_id: UserId) -> AuthResult<Option<BenutzerProfil>> {
        Ok(self.konten.get(&user_id).map(|k| k.profil.clone()))
    }

    async fn alle_profile(&self) -> AuthResult<Vec<BenutzerProfil>> {
        let mut profile: Vec<_> = self.konten.iter().map(|k| k.profil.clone()).collect();
        profile.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(profile)
    }

    async fn passwort_setzen(&self, username: &str, passwort: &str) -> AuthResult<()> {
        let id = self
            .id_von(username)
            .ok_or_else(|| AuthError::BenutzerNichtGefunden(username.to_string()))?;
        let hash = self.hasher.hashen_blockierfrei(passwort).await?;

        let mut konto = self
            .konten
            .get_mut(&id)
            .ok_or_else(|| AuthError::BenutzerNichtGefunden(username.to_string()))?;
        konto.passwort_hash = hash;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
