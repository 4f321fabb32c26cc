//! Link Manager – sobe o link no boot e o reinicializa após falhas.
//!
//! ```text
//! Uninitialized ─start─▶ Initializing ─ok─▶ Ready ◀──────┐
//!                              │            │  ▲          │
//!                         esgotou      falha│  │sucesso   │ok
//!                              ▼            ▼  │          │
//!                           Failed        Degraded ─reset─▶ Resetting
//!                                           ▲                 │
//!                                           └──────falha──────┘
//! ```
//!
//! `Failed` é terminal mas não derruba o processo: os envios só são pulados.

use crate::clock::Delay;
use crate::radio::{DeliveryOutcome, LinkError, OutcomeHandler, Payload, RadioLink};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::tracker::LinkState;
use node_core::config::LinkConfig;
use node_core::{MacAddress, SendPolicy};
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

/// Fase do link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    Uninitialized,
    Initializing,
    Ready,
    Degraded,
    Resetting,
    Failed,
}

impl LinkPhase {
    pub fn label(self) -> &'static str {
        match self {
            LinkPhase::Uninitialized => "não inicializado",
            LinkPhase::Initializing => "inicializando",
            LinkPhase::Ready => "pronto",
            LinkPhase::Degraded => "degradado",
            LinkPhase::Resetting => "reinicializando",
            LinkPhase::Failed => "falhou",
        }
    }

    /// Fases em que o envio é delegado ao rádio.
    pub fn can_send(self) -> bool {
        matches!(self, LinkPhase::Ready | LinkPhase::Degraded)
    }
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct LinkManager<R: RadioLink> {
    radio: R,
    peer: MacAddress,
    channel: u8,
    policy: SendPolicy,
    settle: Duration,
    handler: OutcomeHandler,
    phase: LinkPhase,
    resets: u32,
}

impl<R: RadioLink> LinkManager<R> {
    pub fn new(radio: R, config: &LinkConfig, handler: OutcomeHandler) -> Self {
        Self {
            radio,
            peer: config.peer_address,
            channel: config.channel,
            policy: config.send_policy,
            settle: config.reset_settle(),
            handler,
            phase: LinkPhase::Uninitialized,
            resets: 0,
        }
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub fn peer(&self) -> MacAddress {
        self.peer
    }

    /// Reinicializações executadas desde o boot.
    pub fn resets(&self) -> u32 {
        self.resets
    }

    #[cfg(test)]
    pub fn radio(&self) -> &R {
        &self.radio
    }

    #[cfg(test)]
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Sobe o link com até `retry.max_attempts` tentativas.
    pub fn start<D: Delay + ?Sized>(&mut self, state: &mut LinkState, retry: RetryPolicy, delay: &mut D) -> LinkPhase {
        self.phase = LinkPhase::Initializing;
        let max = retry.max_attempts.max(1);

        let result = retry_with_backoff(retry, delay, |attempt| {
            info!("🔄 Tentativa de init do link {attempt}/{max}");
            let outcome = self.bring_up_once(state);
            if let Err(e) = &outcome {
                warn!("✗ {e}");
            }
            outcome
        });

        match result {
            Ok(((), attempts)) => {
                info!("✓ Link pronto após {attempts} tentativa(s)");
                self.phase = LinkPhase::Ready;
            }
            Err(exhausted) => {
                error!(
                    "✗ Link falhou após {} tentativas: {}",
                    exhausted.attempts, exhausted.last_error
                );
                self.phase = LinkPhase::Failed;
            }
        }
        self.phase
    }

    /// Deinit, pausa, reinit e novo registro do peer, numa tentativa só.
    ///
    /// Ignorado fora de `Ready`/`Degraded`.
    pub fn reset<D: Delay + ?Sized>(&mut self, state: &mut LinkState, delay: &mut D) -> LinkPhase {
        if !self.phase.can_send() {
            warn!("Reset ignorado: link {}", self.phase);
            return self.phase;
        }

        self.phase = LinkPhase::Resetting;
        self.resets += 1;
        warn!("⚠ Muitas falhas de entrega, reinicializando link (reset #{})", self.resets);

        self.radio.tear_down();
        delay.delay(self.settle);

        let result = retry_with_backoff(RetryPolicy::once(), delay, |_| self.bring_up_once(state));
        self.phase = match result {
            Ok(_) => {
                info!("✓ Link reinicializado");
                LinkPhase::Ready
            }
            Err(exhausted) => {
                error!("✗ Reinicialização falhou: {}", exhausted.last_error);
                LinkPhase::Degraded
            }
        };
        self.phase
    }

    /// Ajusta a fase conforme o resultado de entrega mais recente.
    pub fn note_outcome(&mut self, outcome: DeliveryOutcome) {
        self.phase = match (self.phase, outcome) {
            (LinkPhase::Ready, DeliveryOutcome::Failure) => LinkPhase::Degraded,
            (LinkPhase::Degraded, DeliveryOutcome::Success) => LinkPhase::Ready,
            (phase, _) => phase,
        };
    }

    /// Delega ao rádio se a fase e a política de envio permitirem.
    pub fn try_send(&mut self, state: &LinkState, payload: &Payload) -> Result<(), LinkError> {
        if !self.phase.can_send() {
            return Err(LinkError::LinkNotReady(self.phase.label()));
        }
        if self.policy == SendPolicy::Optimistic && !state.connected {
            return Err(LinkError::LinkNotReady("desconectado"));
        }
        self.radio.send(self.peer, payload)
    }

    fn bring_up_once(&mut self, state: &mut LinkState) -> Result<(), LinkError> {
        let result = self.bring_up_and_register();
        state.connected = result.is_ok();
        result
    }

    fn bring_up_and_register(&mut self) -> Result<(), LinkError> {
        self.radio.bring_up(self.channel)?;
        self.radio.register_outcome_handler(self.handler.clone());
        self.radio.register_peer(self.peer, self.channel)?;
        info!("✓ Peer {} registrado no canal {}", self.peer, self.channel);
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
