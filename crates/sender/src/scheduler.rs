//! Agendador de ciclos de envio por intervalo fixo.
//!
//! Não dorme: o loop principal chama [`SendScheduler::poll`] a cada iteração
//! e o agendador responde se já passou o intervalo desde o último disparo.
//! O tempo decorrido usa subtração modular, então o wraparound do tick não
//! pula nem duplica ciclos.

use crate::clock::Tick;
use tracing::trace;

/// Tempo decorrido de `since` até `now`, seguro através do wraparound.
pub fn elapsed(now: Tick, since: Tick) -> u32 {
    now.wrapping_sub(since)
}

/// Dispara no máximo uma vez por intervalo.
#[derive(Debug, Clone)]
pub struct SendScheduler {
    interval_ms: u32,
    last_send_tick: Tick,
}

impl SendScheduler {
    /// O primeiro disparo acontece quando o tick atinge `interval_ms`.
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            last_send_tick: 0,
        }
    }

    #[cfg(test)]
    pub fn last_send_tick(&self) -> Tick {
        self.last_send_tick
    }

    /// Retorna `true` se um ciclo deve disparar agora.
    pub fn poll(&mut self, now: Tick) -> bool {
        if now < self.last_send_tick {
            trace!(now, last = self.last_send_tick, "Tick deu a volta");
        }

        if elapsed(now, self.last_send_tick) >= self.interval_ms {
            self.last_send_tick = now;
            true
        } else {
            false
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
