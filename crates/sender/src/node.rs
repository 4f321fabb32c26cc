//! Contexto do nó sensor e o loop cooperativo.
//!
//! Toda a lógica de estado roda aqui, no loop principal: o callback de
//! entrega só posta na [`OutcomeMailbox`], e cada [`SenderNode::step`]
//! drena a caixa, executa um reset pendente e dispara o ciclo de envio
//! quando o intervalo vence.

use crate::clock::{Delay, Tick, TickSource};
use crate::mailbox::{OUTCOME_QUEUE_DEPTH, OutcomeMailbox};
use crate::manager::{LinkManager, LinkPhase};
use crate::radio::{DeliveryOutcome, LinkError, RadioLink};
use crate::retry::RetryPolicy;
use crate::scheduler::SendScheduler;
use crate::sensors::{SensorSource, TelemetryAssembler, log_snapshot};
use crate::tracker::{DeliveryTracker, LinkState};
use node_core::config::NodeConfig;
use node_core::{TelemetryRecord, encode_record};
use rand::rngs::StdRng;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Resultado de um ciclo de envio.
#[derive(Debug, Clone, PartialEq)]
pub struct SendCycle {
    pub record: TelemetryRecord,
    pub result: Result<(), LinkError>,
}

/// O que aconteceu numa iteração do loop.
#[derive(Debug, Default, PartialEq)]
pub struct StepReport {
    /// Resultados de entrega drenados da caixa
    pub outcomes: usize,
    /// Reset executado nesta iteração
    pub reset: Option<LinkPhase>,
    pub cycle: Option<SendCycle>,
}

pub struct SenderNode<R: RadioLink, S: SensorSource, C: TickSource + Delay> {
    link: LinkManager<R>,
    tracker: DeliveryTracker,
    mailbox: OutcomeMailbox,
    assembler: TelemetryAssembler<S>,
    scheduler: SendScheduler,
    state: LinkState,
    clock: C,
    startup: RetryPolicy,
    warmup: Duration,
    idle_slice: Duration,
    reset_pending: bool,
    last_record: TelemetryRecord,
}

impl<R: RadioLink, S: SensorSource, C: TickSource + Delay> SenderNode<R, S, C> {
    pub fn new(radio: R, sensors: S, clock: C, config: &NodeConfig, rng: StdRng) -> Self {
        let mailbox = OutcomeMailbox::new(OUTCOME_QUEUE_DEPTH);
        let local = radio.local_address();
        let link = LinkManager::new(radio, &config.link, mailbox.handler());

        Self {
            link,
            tracker: DeliveryTracker::new(config.link.reset_threshold),
            mailbox,
            assembler: TelemetryAssembler::new(sensors, local, &config.sensors, rng),
            scheduler: SendScheduler::new(config.schedule.send_interval_ms),
            state: LinkState::default(),
            clock,
            startup: RetryPolicy {
                max_attempts: config.link.init_max_attempts,
                backoff: config.link.init_backoff(),
            },
            warmup: Duration::from_millis(config.sensors.warmup_ms),
            idle_slice: config.schedule.idle_slice(),
            reset_pending: false,
            last_record: TelemetryRecord::default(),
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn phase(&self) -> LinkPhase {
        self.link.phase()
    }

    #[cfg(test)]
    pub fn link(&self) -> &LinkManager<R> {
        &self.link
    }

    #[cfg(test)]
    pub fn link_mut(&mut self) -> &mut LinkManager<R> {
        &mut self.link
    }

    #[cfg(test)]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Último registro montado (leitura inicial ou último ciclo).
    #[cfg(test)]
    pub fn last_record(&self) -> &TelemetryRecord {
        &self.last_record
    }

    /// Aquecimento dos sensores, subida do link e leitura inicial.
    pub fn start(&mut self) -> LinkPhase {
        if !self.warmup.is_zero() {
            info!("⏳ Aguardando estabilização dos sensores ({:?})...", self.warmup);
            self.clock.delay(self.warmup);
        }

        let phase = self.link.start(&mut self.state, self.startup, &mut self.clock);

        info!("📊 Leitura inicial dos sensores...");
        self.last_record = self.assembler.assemble(self.clock.now());
        log_snapshot(&self.last_record);
        phase
    }

    /// Uma iteração do loop, sem a fatia ociosa.
    pub fn step(&mut self) -> StepReport {
        let mut report = StepReport {
            outcomes: self.drain_outcomes(),
            ..Default::default()
        };

        if std::mem::take(&mut self.reset_pending) {
            report.reset = Some(self.link.reset(&mut self.state, &mut self.clock));
        }

        let now = self.clock.now();
        if self.scheduler.poll(now) {
            report.cycle = Some(self.run_cycle(now));
        }
        report
    }

    /// Roda até o hardware ser resetado.
    pub fn run(&mut self) -> ! {
        loop {
            let report = self.step();
            if let Some(phase) = report.reset {
                debug!(outcomes = report.outcomes, "Reset concluído, link {phase}");
            }
            if let Some(cycle) = &report.cycle {
                debug!(
                    outcomes = report.outcomes,
                    t = cycle.record.timestamp,
                    ok = cycle.result.is_ok(),
                    "Ciclo de envio concluído"
                );
            }
            self.clock.delay(self.idle_slice);
        }
    }

    fn drain_outcomes(&mut self) -> usize {
        let events = self.mailbox.drain();
        for event in &events {
            let signal = self.tracker.on_outcome(&mut self.state, event.outcome);
            self.link.note_outcome(event.outcome);

            match event.outcome {
                DeliveryOutcome::Success => info!(
                    "📤 ✓ Entrega OK para {} | Sucessos: {} | Falhas: {}",
                    event.peer, self.state.success_count, self.state.failure_count
                ),
                DeliveryOutcome::Failure => warn!(
                    "📤 ✗ Entrega falhou para {} | Sucessos: {} | Falhas: {}",
                    event.peer, self.state.success_count, self.state.failure_count
                ),
            }

            if let Some(request) = signal {
                warn!("⚠ {} falhas acumuladas, reset do link agendado", request.failure_count);
                self.reset_pending = true;
            }
        }
        events.len()
    }

    fn run_cycle(&mut self, now: Tick) -> SendCycle {
        let record = self.assembler.assemble(now);
        log_snapshot(&record);
        self.last_record = record;

        let result = match encode_record(&record) {
            Ok(frame) => self.link.try_send(&self.state, &frame),
            Err(e) => {
                // Só acontece se o layout do registro estiver quebrado
                error!("Erro ao serializar registro: {e}");
                Err(LinkError::SendRejected(e.to_string()))
            }
        };

        match &result {
            Ok(()) => debug!("✓ Dados enfileirados para {}", self.link.peer()),
            Err(LinkError::LinkNotReady(why)) => {
                warn!("⚠ Link não está pronto ({why}), pulando transmissão");
            }
            Err(e) => {
                error!("✗ Erro ao enviar: {e}");
                if let Some(request) = self.tracker.on_rejected(&mut self.state) {
                    warn!("⚠ {} falhas acumuladas, reset do link agendado", request.failure_count);
                    self.reset_pending = true;
                }
            }
        }

        self.log_status();
        SendCycle { record, result }
    }

    fn log_status(&self) {
        let status = if self.state.connected {
            "✓ Conectado"
        } else {
            "✗ Desconectado"
        };
        info!(
            "📡 Status: {status} | link {} | Sucessos: {} | Falhas: {} | Resets: {} | Descartados: {}",
            self.link.phase(),
            self.state.success_count,
            self.state.failure_count,
            self.link.resets(),
            self.mailbox.dropped()
        );
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
