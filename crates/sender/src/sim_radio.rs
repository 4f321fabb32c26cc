//! Rádio ponto a ponto simulado para rodar o sender no host.
//!
//! Cada envio aceito vira um quadro no "ar": uma thread separada espera a
//! latência configurada e chama o callback de entrega, como o firmware faz a
//! partir do seu próprio contexto. Quadros em voo quando a pilha é
//! desinicializada são descartados.

use crate::radio::{DeliveryOutcome, LinkError, OutcomeHandler, Payload, RadioLink};
use crossbeam_channel::{Sender, unbounded};
use node_core::MacAddress;
use node_core::config::SimulationConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Quadro em trânsito até o callback.
struct AirFrame {
    peer: MacAddress,
    outcome: DeliveryOutcome,
    generation: u64,
}

pub struct SimulatedRadio {
    local: MacAddress,
    initialized: bool,
    channel: u8,
    peers: Vec<MacAddress>,
    rng: StdRng,
    delivery_loss: f64,
    /// Falhas de init a injetar antes de aceitar
    pending_init_failures: u32,
    handler: Arc<Mutex<Option<OutcomeHandler>>>,
    /// Incrementa a cada deinit; quadros de gerações antigas são descartados
    generation: Arc<AtomicU64>,
    air: Sender<AirFrame>,
}

impl SimulatedRadio {
    pub fn new(local: MacAddress, config: &SimulationConfig) -> std::io::Result<Self> {
        let (air, rx) = unbounded::<AirFrame>();
        let handler: Arc<Mutex<Option<OutcomeHandler>>> = Arc::new(Mutex::new(None));
        let generation = Arc::new(AtomicU64::new(0));
        let latency = Duration::from_millis(config.delivery_latency_ms);

        let air_handler = Arc::clone(&handler);
        let air_generation = Arc::clone(&generation);
        std::thread::Builder::new()
            .name("radio-air".into())
            .spawn(move || {
                // Termina quando o rádio é descartado
                for frame in rx {
                    std::thread::sleep(latency);
                    if frame.generation != air_generation.load(Ordering::Acquire) {
                        continue;
                    }
                    let current = air_handler.lock().ok().and_then(|h| h.clone());
                    if let Some(callback) = current {
                        callback(frame.peer, frame.outcome);
                    }
                }
            })?;

        Ok(Self {
            local,
            initialized: false,
            channel: 0,
            peers: Vec::new(),
            rng: StdRng::from_entropy(),
            delivery_loss: config.delivery_loss,
            pending_init_failures: config.failed_init_attempts,
            handler,
            generation,
            air,
        })
    }
}

impl RadioLink for SimulatedRadio {
    fn bring_up(&mut self, channel: u8) -> Result<(), LinkError> {
        debug!("Modo estação, canal {channel}");
        self.channel = channel;

        if self.pending_init_failures > 0 {
            self.pending_init_failures -= 1;
            return Err(LinkError::InitFailed("ESP_ERR_ESPNOW_INTERNAL (simulado)".into()));
        }

        self.initialized = true;
        Ok(())
    }

    fn register_outcome_handler(&mut self, handler: OutcomeHandler) {
        if let Ok(mut slot) = self.handler.lock() {
            *slot = Some(handler);
        }
    }

    fn register_peer(&mut self, peer: MacAddress, channel: u8) -> Result<(), LinkError> {
        if !self.initialized {
            return Err(LinkError::PeerAddFailed {
                peer,
                reason: "ESP_ERR_ESPNOW_NOT_INIT".into(),
            });
        }
        if channel != self.channel {
            return Err(LinkError::PeerAddFailed {
                peer,
                reason: format!("canal {channel} difere do canal da interface {}", self.channel),
            });
        }

        if self.peers.contains(&peer) {
            warn!("⚠ Peer {peer} já existe, removendo...");
            self.peers.retain(|p| *p != peer);
        }
        self.peers.push(peer);
        Ok(())
    }

    fn send(&mut self, peer: MacAddress, _payload: &Payload) -> Result<(), LinkError> {
        if !self.initialized {
            return Err(LinkError::SendRejected("ESP_ERR_ESPNOW_NOT_INIT".into()));
        }
        if !self.peers.contains(&peer) {
            return Err(LinkError::SendRejected("ESP_ERR_ESPNOW_NOT_FOUND".into()));
        }

        let outcome = if self.rng.gen_bool(self.delivery_loss) {
            DeliveryOutcome::Failure
        } else {
            DeliveryOutcome::Success
        };
        let frame = AirFrame {
            peer,
            outcome,
            generation: self.generation.load(Ordering::Acquire),
        };
        self.air
            .send(frame)
            .map_err(|_| LinkError::SendRejected("thread do ar encerrada".into()))
    }

    fn tear_down(&mut self) {
        if self.initialized {
            info!("Pilha de rádio desinicializada");
        }
        self.initialized = false;
        self.peers.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut slot) = self.handler.lock() {
            *slot = None;
        }
    }

    fn local_address(&self) -> MacAddress {
        self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::OutcomeMailbox;
    use std::time::Instant;

    const PEER: MacAddress = MacAddress::new([0xB8, 0xD6, 0x1A, 0xA7, 0x66, 0x88]);

    fn config(loss: f64) -> SimulationConfig {
        SimulationConfig {
            delivery_loss: loss,
            delivery_latency_ms: 1,
            ..Default::default()
        }
    }

    fn wait_for(mailbox: &OutcomeMailbox, n: usize) -> Vec<crate::mailbox::OutcomeEvent> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut events = Vec::new();
        while events.len() < n && Instant::now() < deadline {
            events.extend(mailbox.drain());
            std::thread::sleep(Duration::from_millis(2));
        }
        events
    }

    #[test]
    fn send_before_init_is_rejected() {
        let mut radio = SimulatedRadio::new(PEER, &config(0.0)).unwrap();
        assert!(matches!(
            radio.send(PEER, &[0; node_core::RECORD_SIZE]),
            Err(LinkError::SendRejected(_))
        ));
    }

    #[test]
    fn registering_twice_keeps_one_entry() {
        let mut radio = SimulatedRadio::new(PEER, &config(0.0)).unwrap();
        radio.bring_up(1).unwrap();
        radio.register_peer(PEER, 1).unwrap();
        radio.register_peer(PEER, 1).unwrap();
        assert_eq!(radio.peers, vec![PEER]);
    }

    #[test]
    fn peer_on_other_channel_is_refused() {
        let mut radio = SimulatedRadio::new(PEER, &config(0.0)).unwrap();
        radio.bring_up(1).unwrap();
        assert!(matches!(
            radio.register_peer(PEER, 6),
            Err(LinkError::PeerAddFailed { .. })
        ));
    }

    #[test]
    fn injected_init_failures_then_success() {
        let cfg = SimulationConfig {
            failed_init_attempts: 2,
            ..config(0.0)
        };
        let mut radio = SimulatedRadio::new(PEER, &cfg).unwrap();
        assert!(radio.bring_up(1).is_err());
        assert!(radio.bring_up(1).is_err());
        assert!(radio.bring_up(1).is_ok());
    }

    #[test]
    fn outcomes_arrive_from_air_thread() {
        let mailbox = OutcomeMailbox::new(8);
        let mut radio = SimulatedRadio::new(PEER, &config(0.0)).unwrap();
        radio.bring_up(1).unwrap();
        radio.register_outcome_handler(mailbox.handler());
        radio.register_peer(PEER, 1).unwrap();

        for _ in 0..3 {
            radio.send(PEER, &[0; node_core::RECORD_SIZE]).unwrap();
        }

        let events = wait_for(&mailbox, 3);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.outcome == DeliveryOutcome::Success && e.peer == PEER));
    }

    #[test]
    fn total_loss_reports_failures() {
        let mailbox = OutcomeMailbox::new(8);
        let mut radio = SimulatedRadio::new(PEER, &config(1.0)).unwrap();
        radio.bring_up(1).unwrap();
        radio.register_outcome_handler(mailbox.handler());
        radio.register_peer(PEER, 1).unwrap();
        radio.send(PEER, &[0; node_core::RECORD_SIZE]).unwrap();

        let events = wait_for(&mailbox, 1);
        assert_eq!(events[0].outcome, DeliveryOutcome::Failure);
    }
}
