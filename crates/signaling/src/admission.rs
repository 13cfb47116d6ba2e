//! Zulassungskontrolle pro Quell-IP
//!
//! Gleitendes Zeitfenster: eine IP darf innerhalb von `fenster` hoechstens
//! `max_verbindungen` zugelassene Verbindungen oeffnen. Abgelehnte Versuche
//! werden nicht gezaehlt und verlaengern das Fenster nicht.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Konfiguration der Zulassungskontrolle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZulassungsKonfig {
    /// Maximale zugelassene Verbindungen pro IP im Fenster
    pub max_verbindungen: usize,
    /// Laenge des gleitenden Fensters
    pub fenster: Duration,
}

impl Default for ZulassungsKonfig {
    fn default() -> Self {
        Self {
            max_verbindungen: 10,
            fenster: Duration::from_secs(10),
        }
    }
}

/// Gleitendes Fenster der Zulassungen pro IP
pub struct Zulassung {
    konfig: ZulassungsKonfig,
    fenster: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl Zulassung {
    pub fn neu(konfig: ZulassungsKonfig) -> Self {
        Self {
            konfig,
            fenster: Mutex::new(HashMap::new()),
        }
    }

    /// Prueft und verbucht eine Verbindung von `ip` zum Zeitpunkt `jetzt`
    ///
    /// Gibt `true` zurueck wenn die Verbindung zugelassen wurde.
    pub fn pruefen(&self, ip: IpAddr, jetzt: Instant) -> bool {
        let mut fenster = self.fenster.lock();
        let eintraege = fenster.entry(ip).or_default();

        while let Some(&aeltester) = eintraege.front() {
            if jetzt.saturating_duration_since(aeltester) >= self.konfig.fenster {
                eintraege.pop_front();
            } else {
                break;
            }
        }

        if eintraege.len() >= self.konfig.max_verbindungen {
            return false;
        }

        eintraege.push_back(jetzt);
        true
    }

    /// Entfernt IPs ohne Eintraege im aktuellen Fenster
    pub fn aufraeumen(&self, jetzt: Instant) {
        let dauer = self.konfig.fenster;
        self.fenster.lock().retain(|_, eintraege| {
            eintraege.retain(|t| jetzt.saturating_duration_since(*t) < dauer);
            !eintraege.is_empty()
        });
    }

    /// Anzahl der IPs mit Eintraegen
    pub fn ip_anzahl(&self) -> usize {
        self.fenster.lock().len()
    }
}

impl Default for Zulassung {
    fn default() -> Self {
        Self::neu(ZulassungsKonfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(letztes: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, letztes))
    }

    #[test]
    fn zehn_im_fenster_erlaubt_elfte_abgelehnt() {
        let z = Zulassung::default();
        let t0 = Instant::now();
        for i in 0..10 {
            assert!(z.pruefen(ip(1), t0 + Duration::from_millis(i * 100)));
        }
        assert!(!z.pruefen(ip(1), t0 + Duration::from_secs(2)));
    }

    #[test]
    fn nach_ablauf_des_fensters_wieder_erlaubt() {
        let z = Zulassung::default();
        let t0 = Instant::now();
        for _ in 0..10 {
            assert!(z.pruefen(ip(1), t0));
        }
        assert!(!z.pruefen(ip(1), t0 + Duration::from_secs(9)));
        assert!(z.pruefen(ip(1), t0 + Duration::from_secs(10)));
    }

    #[test]
    fn abgelehnte_versuche_verlaengern_nicht() {
        let z = Zulassung::default();
        let t0 = Instant::now();
        for _ in 0..10 {
            z.pruefen(ip(1), t0);
        }
        // Viele Ablehnungen kurz vor Fensterende
        for i in 0..20 {
            assert!(!z.pruefen(ip(1), t0 + Duration::from_millis(9_000 + i)));
        }
        assert!(z.pruefen(ip(1), t0 + Duration::from_secs(10)));
    }

    #[test]
    fn ips_sind_unabhaengig() {
        let z = Zulassung::neu(ZulassungsKonfig {
            max_verbindungen: 1,
            fenster: Duration::from_secs(10),
        });
        let t0 = Instant::now();
        assert!(z.pruefen(ip(1), t0));
        assert!(!z.pruefen(ip(1), t0));
        assert!(z.pruefen(ip(2), t0));
    }

    #[test]
    fn aufraeumen_entfernt_alte_ips() {
        let z = Zulassung::default();
        let t0 = Instant::now();
        z.pruefen(ip(1), t0);
        z.pruefen(ip(2), t0 + Duration::from_secs(5));
        z.aufraeumen(t0 + Duration::from_secs(11));
        assert_eq!(z.ip_anzahl(), 1);
    }
}
