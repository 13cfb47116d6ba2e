//! Versand von Bestaetigungscodes
//!
//! Der Server spricht kein SMTP; ein `Mailer` kapselt den Versandweg.
//! `LogMailer` protokolliert den Versand nur.

use async_trait::async_trait;

use crate::error::AuthResult;

/// Verschickt einen Code an eine Mail-Adresse
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn senden(&self, code: &str, adresse: &str) -> AuthResult<()>;
}

/// Mailer der den Versand nur ins Log schreibt
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn senden(&self, code: &str, adresse: &str) -> AuthResult<()> {
        tracing::info!(adresse = %adresse, "Bestaetigungscode verschickt");
        tracing::debug!(adresse = %adresse, code = %code, "Inhalt der Bestaetigungsmail");
        Ok(())
    }
}
