//! Estado do link e contagem de entregas.

use crate::radio::DeliveryOutcome;

/// Estado do link durante a vida do processo.
///
/// Os contadores nunca voltam a zero, nem depois de reinicializar o link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkState {
    /// Otimista: verdadeiro após registrar o peer ou após uma entrega OK
    pub connected: bool,
    pub success_count: u32,
    pub failure_count: u32,
}

/// Sinal para o Link Manager reinicializar o link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRequested {
    /// Contagem de falhas que cruzou o limiar
    pub failure_count: u32,
}

/// Atualiza [`LinkState`] a cada resultado e decide quando pedir reset.
///
/// Só um múltiplo exato do limiar dispara reset, evitando reinicializar a
/// cada perda isolada.
#[derive(Debug, Clone)]
pub struct DeliveryTracker {
    reset_threshold: u32,
}

impl DeliveryTracker {
    pub fn new(reset_threshold: u32) -> Self {
        Self {
            reset_threshold: reset_threshold.max(1),
        }
    }

    /// Aplica um resultado de entrega vindo do callback.
    pub fn on_outcome(&self, state: &mut LinkState, outcome: DeliveryOutcome) -> Option<ResetRequested> {
        match outcome {
            DeliveryOutcome::Success => {
                state.success_count = state.success_count.saturating_add(1);
                state.connected = true;
                None
            }
            DeliveryOutcome::Failure => {
                state.connected = false;
                self.record_failure(state)
            }
        }
    }

    /// Envio recusado de forma síncrona: conta como falha mas não mexe em
    /// `connected`.
    pub fn on_rejected(&self, state: &mut LinkState) -> Option<ResetRequested> {
        self.record_failure(state)
    }

    fn record_failure(&self, state: &mut LinkState) -> Option<ResetRequested> {
        let before = state.failure_count;
        state.failure_count = before.saturating_add(1);

        // Saturado: nenhum cruzamento novo
        if state.failure_count == before {
            return None;
        }

        (state.failure_count % self.reset_threshold == 0).then_some(ResetRequested {
            failure_count: state.failure_count,
        })
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
