//! Caixa de correio entre o callback de entrega e o loop principal.
//!
//! O callback roda num contexto assíncrono do rádio; ele só posta o evento
//! aqui. Toda a lógica (contadores, limiar, reset) roda no loop principal
//! quando ele drena a caixa.

use crate::radio::{DeliveryOutcome, OutcomeHandler};
use crossbeam_channel::{Receiver, Sender, bounded};
use node_core::MacAddress;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;

/// Profundidade da fila; cobre várias entregas entre duas iterações do loop.
pub const OUTCOME_QUEUE_DEPTH: usize = 16;

/// Resultado de entrega postado pelo callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeEvent {
    pub peer: MacAddress,
    pub outcome: DeliveryOutcome,
}

pub struct OutcomeMailbox {
    tx: Sender<OutcomeEvent>,
    rx: Receiver<OutcomeEvent>,
    dropped: Arc<AtomicU32>,
}

impl OutcomeMailbox {
    pub fn new(depth: usize) -> Self {
        let (tx, rx) = bounded::<OutcomeEvent>(depth.max(1));
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Callback a ser registrado no rádio.
    ///
    /// Nunca bloqueia: com a fila cheia o evento é descartado e contado.
    pub fn handler(&self) -> OutcomeHandler {
        let tx = self.tx.clone();
        let dropped = Arc::clone(&self.dropped);
        Arc::new(move |peer, outcome| {
            if tx.try_send(OutcomeEvent { peer, outcome }).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
            trace!(%peer, ?outcome, "Resultado de entrega postado");
        })
    }

    /// Retira todos os eventos pendentes, sem bloquear.
    pub fn drain(&self) -> Vec<OutcomeEvent> {
        self.rx.try_iter().collect()
    }

    /// Eventos perdidos por fila cheia desde o boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
