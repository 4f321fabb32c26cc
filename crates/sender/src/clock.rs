//! Fonte de ticks e espera bloqueante.
//!
//! O tick é um contador de milissegundos desde o boot com largura de 32 bits
//! (como o `millis()` do firmware): dá a volta após ~49,7 dias.

use std::time::{Duration, Instant};

/// Milissegundos desde o boot, com wraparound em `u32::MAX`.
pub type Tick = u32;

/// Contador monotônico de ticks.
pub trait TickSource {
    fn now(&self) -> Tick;
}

/// Espera bloqueante (backoff de init, pausa de reset, fatia ociosa do loop).
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Relógio do host baseado em [`Instant`].
pub struct SystemClock {
    boot: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for SystemClock {
    fn now(&self) -> Tick {
        // Truncar para 32 bits é exatamente o wraparound do contador
        self.boot.elapsed().as_millis() as Tick
    }
}

impl Delay for SystemClock {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
