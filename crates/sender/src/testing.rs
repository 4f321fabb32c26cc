//! Dublês determinísticos para os testes do sender.

use crate::clock::{Delay, Tick, TickSource};
use crate::radio::{DeliveryOutcome, LinkError, OutcomeHandler, Payload, RadioLink};
use crate::sensors::SensorSource;
use node_core::MacAddress;
use std::cell::Cell;
use std::collections::VecDeque;
use std::time::Duration;

pub const LOCAL: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x01, 0xA2, 0x3C]);

// ──────────────────────────────────────────────
// Rádio roteirizado
// ──────────────────────────────────────────────

/// Rádio com resultados enfileirados por chamada (vazio = sucesso).
///
/// Resultados de entrega em `outcomes` são entregues ao callback dentro do
/// próprio `send`, como um rádio que responde instantaneamente.
#[derive(Default)]
pub struct MockRadio {
    pub bring_up_results: VecDeque<Result<(), LinkError>>,
    pub add_peer_results: VecDeque<Result<(), LinkError>>,
    pub send_results: VecDeque<Result<(), LinkError>>,
    pub outcomes: VecDeque<DeliveryOutcome>,

    pub initialized: bool,
    pub peers: Vec<MacAddress>,
    pub handler: Option<OutcomeHandler>,
    pub bring_up_calls: u32,
    pub handler_registrations: u32,
    pub tear_down_calls: u32,
    pub sent: Vec<Payload>,
}

impl MockRadio {
    pub fn failing_bring_ups(n: usize) -> Self {
        Self {
            bring_up_results: (0..n)
                .map(|i| Err(LinkError::InitFailed(format!("0x{:X}", 0x3066 + i))))
                .collect(),
            ..Default::default()
        }
    }

    /// Entrega um resultado como se viesse do firmware.
    pub fn deliver(&self, outcome: DeliveryOutcome) {
        if let (Some(handler), Some(peer)) = (&self.handler, self.peers.first()) {
            handler(*peer, outcome);
        }
    }
}

impl RadioLink for MockRadio {
    fn bring_up(&mut self, _channel: u8) -> Result<(), LinkError> {
        self.bring_up_calls += 1;
        let result = self.bring_up_results.pop_front().unwrap_or(Ok(()));
        self.initialized = result.is_ok();
        result
    }

    fn register_outcome_handler(&mut self, handler: OutcomeHandler) {
        self.handler_registrations += 1;
        self.handler = Some(handler);
    }

    fn register_peer(&mut self, peer: MacAddress, _channel: u8) -> Result<(), LinkError> {
        if !self.initialized {
            return Err(LinkError::PeerAddFailed {
                peer,
                reason: "pilha não inicializada".into(),
            });
        }
        self.peers.retain(|p| *p != peer);
        self.add_peer_results.pop_front().unwrap_or(Ok(()))?;
        self.peers.push(peer);
        Ok(())
    }

    fn send(&mut self, _peer: MacAddress, payload: &Payload) -> Result<(), LinkError> {
        if !self.initialized {
            return Err(LinkError::SendRejected("pilha não inicializada".into()));
        }
        self.send_results.pop_front().unwrap_or(Ok(()))?;
        self.sent.push(*payload);
        if let Some(outcome) = self.outcomes.pop_front() {
            self.deliver(outcome);
        }
        Ok(())
    }

    fn tear_down(&mut self) {
        self.tear_down_calls += 1;
        self.initialized = false;
        self.peers.clear();
        self.handler = None;
    }

    fn local_address(&self) -> MacAddress {
        LOCAL
    }
}

// ──────────────────────────────────────────────
// Tempo
// ──────────────────────────────────────────────

/// Registra as esperas em vez de dormir.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub waits: Vec<Duration>,
}

impl Delay for RecordingDelay {
    fn delay(&mut self, duration: Duration) {
        self.waits.push(duration);
    }
}

/// Relógio manual: o tick só anda quando o teste manda.
#[derive(Debug, Default)]
pub struct ManualClock {
    pub tick: Cell<Tick>,
    pub waits: Vec<Duration>,
}

impl ManualClock {
    pub fn at(tick: Tick) -> Self {
        Self {
            tick: Cell::new(tick),
            waits: Vec::new(),
        }
    }

    pub fn set(&self, tick: Tick) {
        self.tick.set(tick);
    }

    pub fn advance(&self, ms: u32) {
        self.tick.set(self.tick.get().wrapping_add(ms));
    }
}

impl TickSource for ManualClock {
    fn now(&self) -> Tick {
        self.tick.get()
    }
}

impl Delay for ManualClock {
    fn delay(&mut self, duration: Duration) {
        self.waits.push(duration);
    }
}

// ──────────────────────────────────────────────
// Sensores
// ──────────────────────────────────────────────

/// Fonte que devolve leituras roteirizadas; repete a última quando acaba.
#[derive(Debug, Clone)]
pub struct FixedSensors {
    pub temperatures: VecDeque<f32>,
    pub humidities: VecDeque<f32>,
    pub gas_levels: VecDeque<i32>,
}

impl FixedSensors {
    pub fn steady(temperature: f32, humidity: f32, gas_level: i32) -> Self {
        Self {
            temperatures: VecDeque::from([temperature]),
            humidities: VecDeque::from([humidity]),
            gas_levels: VecDeque::from([gas_level]),
        }
    }
}

fn next_or_last<T: Copy>(queue: &mut VecDeque<T>) -> T {
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        *queue.front().unwrap()
    }
}

impl SensorSource for FixedSensors {
    fn read_temperature(&mut self) -> f32 {
        next_or_last(&mut self.temperatures)
    }

    fn read_humidity(&mut self) -> f32 {
        next_or_last(&mut self.humidities)
    }

    fn read_gas_level(&mut self) -> i32 {
        next_or_last(&mut self.gas_levels)
    }
}
