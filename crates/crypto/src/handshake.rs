//! Hybrider Schluesselaustausch
//!
//! Der Client liefert seinen RSA-Public-Key im ersten Frame. Akzeptierte
//! Formen:
//! - PEM SPKI (`-----BEGIN PUBLIC KEY-----`)
//! - PEM PKCS#1 (`-----BEGIN RSA PUBLIC KEY-----`)
//! - JSON `{ "Modulus": b64, "Exponent": b64 }` (auch kleingeschrieben)
//!
//! Der Server antwortet mit `{"key": b64, "iv": b64}`, verschluesselt mit
//! RSA-OAEP (SHA-256).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand_core::{OsRng, RngCore};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};

/// Minimale Modulus-Groesse fuer Client-Schluessel
pub const MIN_RSA_BITS: usize = 2048;

/// AES-256 Schluessel-Laenge in Bytes
pub const SCHLUESSEL_LAENGE: usize = 32;

/// IV-Laenge in Bytes (96 Bit, GCM-Standard)
pub const IV_LAENGE: usize = 12;

// ---------------------------------------------------------------------------
// Sitzungsschluessel
// ---------------------------------------------------------------------------

/// Symmetrisches Schluesselmaterial einer einzelnen Verbindung
#[derive(Clone, PartialEq, Eq)]
pub struct SitzungsSchluessel {
    key: [u8; SCHLUESSEL_LAENGE],
    iv: [u8; IV_LAENGE],
}

impl SitzungsSchluessel {
    /// Erzeugt frisches Zufallsmaterial aus dem OS-RNG
    pub fn erzeugen() -> Self {
        let mut key = [0u8; SCHLUESSEL_LAENGE];
        let mut iv = [0u8; IV_LAENGE];
        OsRng.fill_bytes(&mut key);
        OsRng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    /// Baut den Schluessel aus vorhandenen Bytes (Client-Seite, Tests)
    pub fn aus_bytes(key: &[u8], iv: &[u8]) -> CryptoResult<Self> {
        let key: [u8; SCHLUESSEL_LAENGE] =
            key.try_into()
                .map_err(|_| CryptoError::UngueltigeSchluesselLaenge {
                    erwartet: SCHLUESSEL_LAENGE,
                    erhalten: key.len(),
                })?;
        let iv: [u8; IV_LAENGE] =
            iv.try_into()
                .map_err(|_| CryptoError::UngueltigeSchluesselLaenge {
                    erwartet: IV_LAENGE,
                    erhalten: iv.len(),
                })?;
        Ok(Self { key, iv })
    }

    pub fn key(&self) -> &[u8; SCHLUESSEL_LAENGE] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_LAENGE] {
        &self.iv
    }
}

// Schluesselmaterial nie in Logs
impl std::fmt::Debug for SitzungsSchluessel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitzungsSchluessel").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Wire-Formate
// ---------------------------------------------------------------------------

/// RSA-Parameter wie sie aeltere Clients serialisieren
#[derive(Debug, Serialize, Deserialize)]
struct RsaParameter {
    #[serde(rename = "Modulus", alias = "modulus")]
    modulus: String,
    #[serde(rename = "Exponent", alias = "exponent")]
    exponent: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SchluesselBlob {
    key: String,
    iv: String,
}

// ---------------------------------------------------------------------------
// Server-Seite
// ---------------------------------------------------------------------------

/// Liest den Public-Key des Clients aus dem ersten Frame
///
/// # Fehler
/// - `OeffentlicherSchluessel` bei unbekanntem Format oder kaputtem Inhalt
/// - `SchluesselZuKlein` wenn der Modulus kleiner als [`MIN_RSA_BITS`] ist
pub fn oeffentlichen_schluessel_lesen(rohdaten: &[u8]) -> CryptoResult<RsaPublicKey> {
    let text = std::str::from_utf8(rohdaten)
        .map_err(|_| CryptoError::OeffentlicherSchluessel("kein UTF-8".into()))?
        .trim();

    let schluessel = if text.starts_with("-----BEGIN PUBLIC KEY-----") {
        RsaPublicKey::from_public_key_pem(text)
            .map_err(|e| CryptoError::OeffentlicherSchluessel(e.to_string()))?
    } else if text.starts_with("-----BEGIN RSA PUBLIC KEY-----") {
        RsaPublicKey::from_pkcs1_pem(text)
            .map_err(|e| CryptoError::OeffentlicherSchluessel(e.to_string()))?
    } else if text.starts_with('{') {
        let parameter: RsaParameter = serde_json::from_str(text)
            .map_err(|e| CryptoError::OeffentlicherSchluessel(e.to_string()))?;
        let n = BigUint::from_bytes_be(&STANDARD.decode(parameter.modulus.as_bytes())?);
        let e = BigUint::from_bytes_be(&STANDARD.decode(parameter.exponent.as_bytes())?);
        RsaPublicKey::new(n, e).map_err(|e| CryptoError::OeffentlicherSchluessel(e.to_string()))?
    } else {
        return Err(CryptoError::OeffentlicherSchluessel(
            "unbekanntes Schluesselformat".into(),
        ));
    };

    let bits = schluessel.size() * 8;
    if bits < MIN_RSA_BITS {
        return Err(CryptoError::SchluesselZuKlein {
            bits,
            minimum: MIN_RSA_BITS,
        });
    }

    tracing::debug!(bits, "Client-Schluessel akzeptiert");
    Ok(schluessel)
}

/// Verpackt den Sitzungsschluessel fuer den Client (RSA-OAEP, SHA-256)
pub fn schluessel_verpacken(
    client_schluessel: &RsaPublicKey,
    sitzung: &SitzungsSchluessel,
) -> CryptoResult<Vec<u8>> {
    let blob = SchluesselBlob {
        key: STANDARD.encode(sitzung.key),
        iv: STANDARD.encode(sitzung.iv),
    };
    let klartext = serde_json::to_vec(&blob)?;

    client_schluessel
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &klartext)
        .map_err(|e| CryptoError::KeyExchange(e.to_string()))
}

// ---------------------------------------------------------------------------
// Client-Seite
// ---------------------------------------------------------------------------

/// Entpackt den vom Server geschickten Sitzungsschluessel
pub fn schluessel_entpacken(
    privat: &RsaPrivateKey,
    chiffrat: &[u8],
) -> CryptoResult<SitzungsSchluessel> {
    let klartext = privat
        .decrypt(Oaep::new::<Sha256>(), chiffrat)
        .map_err(|e| CryptoError::KeyExchange(e.to_string()))?;
    let blob: SchluesselBlob = serde_json::from_slice(&klartext)?;

    SitzungsSchluessel::aus_bytes(
        &STANDARD.decode(blob.key.as_bytes())?,
        &STANDARD.decode(blob.iv.as_bytes())?,
    )
}

/// Serialisiert einen Public-Key im JSON-Parameterformat
pub fn oeffentlichen_schluessel_als_json(schluessel: &RsaPublicKey) -> CryptoResult<String> {
    let parameter = RsaParameter {
        modulus: STANDARD.encode(schluessel.n().to_bytes_be()),
        exponent: STANDARD.encode(schluessel.e().to_bytes_be()),
    };
    Ok(serde_json::to_string(&parameter)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::EncodeRsaPublicKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};
    use std::sync::OnceLock;

    fn test_schluessel() -> &'static RsaPrivateKey {
        static SCHLUESSEL: OnceLock<RsaPrivateKey> = OnceLock::new();
        SCHLUESSEL.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).unwrap())
    }

    #[test]
    fn sitzungsschluessel_sind_zufaellig() {
        let a = SitzungsSchluessel::erzeugen();
        let b = SitzungsSchluessel::erzeugen();
        assert_ne!(a.key(), b.key());
        assert_ne!(a.iv(), b.iv());
    }

    #[test]
    fn debug_zeigt_kein_material() {
        let s = SitzungsSchluessel::aus_bytes(&[0xAA; 32], &[0xBB; 12]).unwrap();
        let text = format!("{:?}", s);
        assert!(!text.contains("170"));
        assert!(text.contains("SitzungsSchluessel"));
    }

    #[test]
    fn aus_bytes_prueft_laengen() {
        assert!(matches!(
            SitzungsSchluessel::aus_bytes(&[0; 16], &[0; 12]),
            Err(CryptoError::UngueltigeSchluesselLaenge { erwartet: 32, .. })
        ));
        assert!(matches!(
            SitzungsSchluessel::aus_bytes(&[0; 32], &[0; 16]),
            Err(CryptoError::UngueltigeSchluesselLaenge { erwartet: 12, .. })
        ));
    }

    #[test]
    fn alle_schluesselformate_werden_gelesen() {
        let public = test_schluessel().to_public_key();

        let spki = public.to_public_key_pem(LineEnding::LF).unwrap();
        let pkcs1 = public.to_pkcs1_pem(LineEnding::LF).unwrap();
        let json = oeffentlichen_schluessel_als_json(&public).unwrap();
        let json_klein = json.replace("Modulus", "modulus").replace("Exponent", "exponent");

        for form in [spki.as_str(), pkcs1.as_str(), json.as_str(), json_klein.as_str()] {
            let gelesen = oeffentlichen_schluessel_lesen(form.as_bytes()).unwrap();
            assert_eq!(gelesen, public);
        }
    }

    #[test]
    fn kaputte_schluessel_werden_abgelehnt() {
        let faelle: [&[u8]; 5] = [
            b"",
            b"hallo",
            b"-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----",
            br#"{"Modulus":"!!!","Exponent":"AQAB"}"#,
            &[0xFF, 0xFE, 0x00],
        ];
        for fall in faelle {
            assert!(oeffentlichen_schluessel_lesen(fall).is_err());
        }
    }

    #[test]
    fn kleine_schluessel_werden_abgelehnt() {
        let klein = RsaPrivateKey::new(&mut OsRng, 1024).unwrap().to_public_key();
        let pem = klein.to_public_key_pem(LineEnding::LF).unwrap();
        let ergebnis = oeffentlichen_schluessel_lesen(pem.as_bytes());
        assert!(matches!(
            ergebnis,
            Err(CryptoError::SchluesselZuKlein { bits: 1024, .. })
        ));
    }

    #[test]
    fn verpacken_und_entpacken() {
        let privat = test_schluessel();
        let sitzung = SitzungsSchluessel::erzeugen();

        let blob = schluessel_verpacken(&privat.to_public_key(), &sitzung).unwrap();
        assert_eq!(blob.len(), 256, "RSA-2048 Chiffrat ist 256 Bytes lang");

        let entpackt = schluessel_entpacken(privat, &blob).unwrap();
        assert_eq!(entpackt, sitzung);
    }

    #[test]
    fn falscher_privater_schluessel_scheitert() {
        let sitzung = SitzungsSchluessel::erzeugen();
        let blob = schluessel_verpacken(&test_schluessel().to_public_key(), &sitzung).unwrap();

        let anderer = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        assert!(schluessel_entpacken(&anderer, &blob).is_err());
    }
}
