//! Verschluesselter Kanal einer Verbindung
//!
//! ## Handshake
//! ```text
//! Client                                   Server
//!   | -- Frame 0: RSA-Public-Key (klar) -->  |
//!   | <-- Frame 0: RSA-OAEP({key, iv}) ----  |
//!   | ==== ab hier AES-256-GCM pro Frame ==== |
//! ```
//!
//! Ein entschluesselter Frame kann mehrere logische Nachrichten enthalten,
//! jeweils mit `DELIMITER` abgeschlossen. Ausgehend buendelt der Writer-Task
//! alle bereits wartenden Nachrichten, verteilt auf so wenige Frames wie die
//! maximale Frame-Groesse erlaubt.

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use treffpunkt_crypto::{
    fuer_server, oeffentlichen_schluessel_lesen, schluessel_verpacken, Entschluesseler,
    SitzungsSchluessel, Verschluesseler, TAG_LAENGE,
};
use treffpunkt_protocol::{encode, ErrorCode, FrameCodec, ProtocolMessage};

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Fuehrt den serverseitigen Handshake aus und teilt den Kanal auf
///
/// Jeder Fehler (ungueltiger Schluessel, Socket-Fehler) beendet die
/// Verbindung.
pub async fn server_handshake<S>(
    stream: S,
    max_frame_groesse: usize,
) -> SignalingResult<(KanalLeser<S>, KanalSchreiber<S>)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, FrameCodec::with_max_size(max_frame_groesse));

    let roh = framed
        .next()
        .await
        .ok_or(SignalingError::VerbindungGetrennt)??;
    let client_schluessel = oeffentlichen_schluessel_lesen(&roh)?;

    let schluessel = SitzungsSchluessel::erzeugen();
    let verpackt = schluessel_verpacken(&client_schluessel, &schluessel)?;
    framed.send(Bytes::from(verpackt)).await?;

    let (verschluesseler, entschluesseler) = fuer_server(&schluessel);
    let (sink, stream) = framed.split();

    Ok((
        KanalLeser {
            stream,
            entschluesseler,
        },
        KanalSchreiber {
            sink,
            verschluesseler,
            max_payload: max_frame_groesse.saturating_sub(TAG_LAENGE),
        },
    ))
}

// ---------------------------------------------------------------------------
// Lesen
// ---------------------------------------------------------------------------

/// Lesehaelfte: Frame -> Klartext-Payload
pub struct KanalLeser<S> {
    stream: SplitStream<Framed<S, FrameCodec>>,
    entschluesseler: Entschluesseler,
}

impl<S> KanalLeser<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Liest und entschluesselt den naechsten Frame
    ///
    /// `Ok(None)` wenn der Client die Verbindung sauber geschlossen hat.
    pub async fn naechster_payload(&mut self) -> SignalingResult<Option<String>> {
        let Some(frame) = self.stream.next().await else {
            return Ok(None);
        };
        let klartext = self.entschluesseler.entschluesseln(&frame?)?;
        // Ungueltiges UTF-8 landet als Fehlerhaft beim Dekodieren
        Ok(Some(String::from_utf8_lossy(&klartext).into_owned()))
    }
}

// ---------------------------------------------------------------------------
// Schreiben
// ---------------------------------------------------------------------------

/// Schreibhaelfte: Nachrichten -> verschluesselte Frames
pub struct KanalSchreiber<S> {
    sink: SplitSink<Framed<S, FrameCodec>, Bytes>,
    verschluesseler: Verschluesseler,
    /// Groesster Klartext, der verschluesselt noch in einen Frame passt
    max_payload: usize,
}

impl<S> KanalSchreiber<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sendet die Nachrichten in so wenigen Frames wie moeglich
    ///
    /// Kein Frame ueberschreitet die Frame-Grenze, was nicht mehr passt geht
    /// in den naechsten. Eine Nachricht, die allein schon zu gross ist, wird
    /// durch eine `error`-Antwort ersetzt. Gibt die Anzahl der Frames zurueck.
    pub async fn senden(&mut self, nachrichten: &[ProtocolMessage]) -> SignalingResult<usize> {
        let mut payload = String::new();
        let mut frames = 0;

        for nachricht in nachrichten {
            let Some(teil) = self.kodieren(nachricht)? else {
                continue;
            };
            if !payload.is_empty() && payload.len() + teil.len() > self.max_payload {
                self.frame_senden(&payload).await?;
                payload.clear();
                frames += 1;
            }
            payload.push_str(&teil);
        }

        if !payload.is_empty() {
            self.frame_senden(&payload).await?;
            frames += 1;
        }
        Ok(frames)
    }

    /// Kodiert eine Nachricht passend zur Frame-Grenze
    ///
    /// `None` wenn nicht einmal die Ersatz-Fehlermeldung passt.
    fn kodieren(&self, nachricht: &ProtocolMessage) -> SignalingResult<Option<String>> {
        let teil = encode(nachricht)?;
        if teil.len() <= self.max_payload {
            return Ok(Some(teil));
        }

        tracing::warn!(
            kind = nachricht.kind(),
            bytes = teil.len(),
            maximum = self.max_payload,
            "Nachricht passt in keinen Frame"
        );
        let ersatz = encode(&ProtocolMessage::fehler(
            ErrorCode::Internal,
            "Antwort zu gross",
        ))?;
        Ok((ersatz.len() <= self.max_payload).then_some(ersatz))
    }

    async fn frame_senden(&mut self, payload: &str) -> SignalingResult<()> {
        let chiffrat = self.verschluesseler.verschluesseln(payload.as_bytes())?;
        self.sink.send(Bytes::from(chiffrat)).await?;
        Ok(())
    }

    /// Schliesst die Schreibseite des Sockets
    pub async fn schliessen(&mut self) -> SignalingResult<()> {
        self.sink.close().await?;
        Ok(())
    }
}

/// Writer-Task einer Sitzung
///
/// Leert die Send-Queue bis alle Sender weg sind. Was beim Aufwachen schon
/// wartet, geht gebuendelt raus. Endet auch, sobald der Socket nicht mehr
/// beschreibbar ist.
pub async fn schreib_schleife<S>(
    mut schreiber: KanalSchreiber<S>,
    mut rx: mpsc::Receiver<ProtocolMessage>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(erste) = rx.recv().await {
        let mut buendel = vec![erste];
        while let Ok(weitere) = rx.try_recv() {
            buendel.push(weitere);
        }

        match schreiber.senden(&buendel).await {
            Ok(frames) => tracing::trace!(nachrichten = buendel.len(), frames, "Gesendet"),
            Err(e) => {
                tracing::warn!(fehler = %e, nachrichten = buendel.len(), "Senden fehlgeschlagen");
                return;
            }
        }
    }

    if let Err(e) = schreiber.schliessen().await {
        tracing::debug!(fehler = %e, "Schliessen fehlgeschlagen");
    }
}
