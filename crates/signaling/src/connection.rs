//! Client-Connection – Verwaltet eine einzelne Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task, dazu einen Writer-Task der die Send-Queue leert.
//!
//! ## Ablauf
//! ```text
//! Handshake -> Registrieren -> Lese-Schleife -> Aufraeumen
//!                                  |
//!                                  v
//!                  entschluesseln -> split -> decode -> dispatch
//! ```
//!
//! Jede Nachricht eines Frames wird vollstaendig verarbeitet bevor der
//! naechste Frame gelesen wird. Es gibt kein Idle-Timeout. Endet der
//! Writer-Task (Socket nicht mehr beschreibbar), endet auch die Sitzung.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tracing::Instrument;
use treffpunkt_protocol::{decode, split, ProtocolMessage};

use crate::channel::{schreib_schleife, server_handshake};
use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::ServerState;

/// Verarbeitet eine einzelne Verbindung
pub struct ClientConnection {
    state: Arc<ServerState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<ServerState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verarbeitung und laeuft bis die Verbindung endet
    ///
    /// Laeuft in einem eigenen Span mit der Peer-Adresse.
    pub async fn verarbeiten<S>(self, stream: S, shutdown_rx: watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let span = tracing::info_span!("sitzung", peer = %self.peer_addr);
        self.sitzung(stream, shutdown_rx).instrument(span).await
    }

    async fn sitzung<S>(self, stream: S, mut shutdown_rx: watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let peer_addr = self.peer_addr;
        tracing::info!("Neue Verbindung");

        // Handshake, abbrechbar durch Shutdown
        let handshake = server_handshake(stream, self.state.config.max_frame_groesse);
        let (mut leser, schreiber) = tokio::select! {
            ergebnis = handshake => match ergebnis {
                Ok(haelften) => haelften,
                Err(e) => {
                    tracing::warn!(fehler = %e, "Handshake fehlgeschlagen");
                    return;
                }
            },
            Ok(()) = shutdown_rx.changed() => return,
        };
        tracing::debug!("Handshake abgeschlossen");

        // Ausgehende Nachrichten: Register/Dispatcher -> Queue -> Writer-Task
        let (sende_tx, sende_rx) = mpsc::channel(self.state.config.queue_groesse);
        self.state.registry.registrieren(peer_addr, sende_tx.clone());
        let mut writer = tokio::spawn(schreib_schleife(schreiber, sende_rx).in_current_span());
        let mut writer_laeuft = true;

        let mut ctx = DispatcherContext::neu(peer_addr, self.state.config.login_schwelle);
        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        loop {
            tokio::select! {
                payload = leser.naechster_payload() => {
                    match payload {
                        Ok(Some(text)) => {
                            if let Err(e) = verarbeite_payload(&text, &dispatcher, &mut ctx, &sende_tx).await {
                                tracing::warn!(fehler = %e, "Antwort nicht zustellbar");
                                break;
                            }
                        }
                        Ok(None) => {
                            tracing::info!("Verbindung vom Client getrennt");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(fehler = %e, "Verbindung wegen Fehler beendet");
                            break;
                        }
                    }
                }

                // Ohne Writer kommt keine Antwort mehr beim Client an
                ergebnis = &mut writer => {
                    writer_laeuft = false;
                    if let Err(e) = ergebnis {
                        tracing::debug!(fehler = %e, "Writer-Task abgebrochen");
                    }
                    tracing::warn!("Writer beendet, Verbindung wird getrennt");
                    break;
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        self.state.koordinator.sitzung_beenden(peer_addr);
        drop(sende_tx);
        if writer_laeuft {
            if let Err(e) = writer.await {
                tracing::debug!(fehler = %e, "Writer-Task abgebrochen");
            }
        }

        tracing::info!("Verbindungs-Task beendet");
    }
}

/// Zerlegt einen Payload in Nachrichten und verarbeitet sie der Reihe nach
async fn verarbeite_payload(
    text: &str,
    dispatcher: &MessageDispatcher,
    ctx: &mut DispatcherContext,
    sende_tx: &mpsc::Sender<ProtocolMessage>,
) -> SignalingResult<()> {
    for teil in split(text) {
        if let Some(antwort) = dispatcher.dispatch(decode(teil), ctx).await {
            sende_tx
                .send(antwort)
                .await
                .map_err(|_| SignalingError::VerbindungGetrennt)?;
        }
    }
    Ok(())
}
