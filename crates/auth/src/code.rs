//! Bestaetigungscodes fuer Login und Passwort-Reset

use rand_core::{OsRng, RngCore};

/// Zeichenvorrat der Codes
pub const CODE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789abcdefghijklmnopqrstuvwxyz#?!@$%^&*-";

/// Laenge eines Codes in Zeichen
pub const CODE_LAENGE: usize = 6;

/// Erzeugt einen gleichverteilten Code aus [`CODE_ALPHABET`]
pub fn bestaetigungscode_erzeugen() -> String {
    // Groesstes Vielfaches der Alphabet-Laenge unter 256, gegen Modulo-Bias
    let grenze = (256 / CODE_ALPHABET.len() * CODE_ALPHABET.len()) as u8;
    let mut code = String::with_capacity(CODE_LAENGE);
    let mut puffer = [0u8; 16];

    while code.len() < CODE_LAENGE {
        OsRng.fill_bytes(&mut puffer);
        for &byte in puffer.iter().filter(|&&b| b < grenze) {
            if code.len() == CODE_LAENGE {
                break;
            }
            code.push(CODE_ALPHABET[byte as usize % CODE_ALPHABET.len()] as char);
        }
    }
    code
}
