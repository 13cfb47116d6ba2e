//! Unit-Tests fuer die Bot-Pipeline

use std::sync::Arc;

use treffpunkt_core::{ChatRaumId, UserId};

use crate::bots::{BefehlsBot, BotKette, BotPipeline, WortFilterBot, BOT_NAME};

fn woerter() -> Vec<String> {
    vec!["mist".to_string(), "Quatsch".to_string()]
}

fn kette() -> BotKette {
    BotKette::neu()
        .mit(Arc::new(BefehlsBot::neu("!", woerter())))
        .mit(Arc::new(WortFilterBot::neu(woerter())))
}

#[tokio::test]
async fn test_normale_nachricht_wird_nicht_verbraucht() {
    let e = kette()
        .try_handle(UserId::new(), "anna", "Hallo zusammen", ChatRaumId(1))
        .await;
    assert!(!e.behandelt);
    assert!(e.antworten.is_empty());
}

#[tokio::test]
async fn test_hilfe_befehl() {
    let e = kette()
        .try_handle(UserId::new(), "anna", "!help", ChatRaumId(1))
        .await;
    assert!(e.behandelt);
    assert_eq!(e.antworten.len(), 1);
    assert_eq!(e.antworten[0].bot_name, BOT_NAME);
    assert_eq!(e.antworten[0].bot_id, UserId::SYSTEM);
    assert!(e.antworten[0].text.contains("!rules"));
}

#[tokio::test]
async fn test_befehle_ignorieren_gross_klein() {
    let e = kette()
        .try_handle(UserId::new(), "anna", "!ABOUT bitte", ChatRaumId(1))
        .await;
    assert!(e.behandelt);
    assert!(e.antworten[0].text.contains(BOT_NAME));
}

#[tokio::test]
async fn test_unbekannter_befehl_wird_verbraucht() {
    let e = kette()
        .try_handle(UserId::new(), "anna", "!tanzen", ChatRaumId(1))
        .await;
    assert!(e.behandelt);
    assert!(e.antworten[0].text.contains("tanzen"));
}

#[tokio::test]
async fn test_nur_praefix_wird_nicht_verbraucht() {
    let e = kette()
        .try_handle(UserId::new(), "anna", "!   ", ChatRaumId(1))
        .await;
    assert!(!e.behandelt);
}

#[tokio::test]
async fn test_gesperrte_woerter_auflisten() {
    let e = kette()
        .try_handle(UserId::new(), "anna", "!bannedwords", ChatRaumId(1))
        .await;
    assert!(e.antworten[0].text.contains("mist"));
    assert!(e.antworten[0].text.contains("Quatsch"));
}

#[tokio::test]
async fn test_wortfilter_ganze_woerter() {
    let filter = WortFilterBot::neu(woerter());
    assert_eq!(filter.treffer("So ein MIST!"), Some("mist".to_string()));
    assert_eq!(filter.treffer("quatsch."), Some("quatsch".to_string()));
    assert_eq!(filter.treffer("Mistelzweig"), None);

    let e = filter
        .try_handle(UserId::new(), "anna", "Das ist Mist", ChatRaumId(3))
        .await;
    assert!(e.behandelt);
    assert!(e.antworten[0].text.starts_with("@anna"));
}

#[tokio::test]
async fn test_leere_kette() {
    let e = BotKette::neu()
        .try_handle(UserId::new(), "anna", "!help", ChatRaumId(1))
        .await;
    assert!(!e.behandelt);
}
