//! Login-Sperre nach wiederholten Fehlversuchen
//!
//! Pro unauthentifizierter Verbindung wird gezaehlt. Ab der Schwelle
//! (Standard 10) greift eine Wartezeit:
//!
//! | Fehlversuche | Sperre |
//! |---|---|
//! | < Schwelle | keine |
//! | = Schwelle | 1 Minute |
//! | > Schwelle | (n - Schwelle) * 5 Minuten |
//!
//! Waehrend die Sperre laeuft werden Anmeldedaten nicht geprueft und der
//! Zaehler waechst nicht.

use std::time::{Duration, Instant};

/// Standard-Schwelle fuer die Sperre
pub const STANDARD_SCHWELLE: u32 = 10;

/// Ergebnis einer Sperr-Pruefung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SperrStatus {
    Frei,
    /// Verbleibende Minuten, aufgerundet
    Gesperrt { minuten: u64 },
}

/// Fehlversuchs-Zaehler einer Verbindung
#[derive(Debug, Clone)]
pub struct LoginSperre {
    schwelle: u32,
    fehlversuche: u32,
    gesperrt_bis: Option<Instant>,
}

impl LoginSperre {
    pub fn neu(schwelle: u32) -> Self {
        Self {
            schwelle,
            fehlversuche: 0,
            gesperrt_bis: None,
        }
    }

    /// Prueft ob zum Zeitpunkt `jetzt` eine Sperre laeuft
    pub fn pruefen(&self, jetzt: Instant) -> SperrStatus {
        match self.gesperrt_bis {
            Some(bis) if bis > jetzt => SperrStatus::Gesperrt {
                minuten: (bis - jetzt).as_millis().div_ceil(60_000) as u64,
            },
            _ => SperrStatus::Frei,
        }
    }

    /// Zaehlt einen Fehlversuch und startet ggf. die Sperre
    pub fn fehlschlag(&mut self, jetzt: Instant) -> SperrStatus {
        if let SperrStatus::Gesperrt { minuten } = self.pruefen(jetzt) {
            return SperrStatus::Gesperrt { minuten };
        }

        self.fehlversuche = self.fehlversuche.saturating_add(1);
        match self.sperrdauer() {
            Some(dauer) => {
                self.gesperrt_bis = Some(jetzt + dauer);
                self.pruefen(jetzt)
            }
            None => SperrStatus::Frei,
        }
    }

    /// Erfolgreiche Anmeldung setzt alles zurueck
    pub fn erfolg(&mut self) {
        self.fehlversuche = 0;
        self.gesperrt_bis = None;
    }

    pub fn fehlversuche(&self) -> u32 {
        self.fehlversuche
    }

    fn sperrdauer(&self) -> Option<Duration> {
        let n = self.fehlversuche;
        if n < self.schwelle {
            None
        } else if n == self.schwelle {
            Some(Duration::from_secs(60))
        } else {
            Some(Duration::from_secs(u64::from(n - self.schwelle) * 5 * 60))
        }
    }
}

impl Default for LoginSperre {
    fn default() -> Self {
        Self::neu(STANDARD_SCHWELLE)
    }
}
