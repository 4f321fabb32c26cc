//! # Node Sender
//!
//! Lê os sensores do nó e envia um registro de telemetria ao receptor por
//! um link de rádio ponto a ponto, reinicializando o link quando as falhas
//! de entrega se acumulam.
//!
//! No host roda contra o rádio e os sensores simulados.
//!
//! ## Uso
//! ```bash
//! RUST_LOG=debug node_sender
//! ```

mod clock;
mod mailbox;
mod manager;
mod node;
mod radio;
mod retry;
mod scheduler;
mod sensors;
mod sim_radio;
mod tracker;

#[cfg(test)]
mod testing;

use clock::SystemClock;
use manager::LinkPhase;
use node::SenderNode;
use node_core::config::NodeConfig;
use node_core::{MacAddress, RECORD_SIZE};
use radio::RadioLink;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sensors::SimulatedSensors;
use sim_radio::SimulatedRadio;
use tracing::{error, info, warn};

/// Endereço de hardware do rádio simulado.
const SIM_LOCAL_ADDRESS: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x01, 0xA2, 0x3C]);

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = NodeConfig::default_path();
    let mut config = NodeConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        warn!("Usando configuração padrão");
        config = NodeConfig::default();
    }

    // ── Rádio e sensores ──
    let radio = match SimulatedRadio::new(SIM_LOCAL_ADDRESS, &config.simulation) {
        Ok(radio) => radio,
        Err(e) => {
            error!("Falha ao criar rádio simulado: {e}");
            return;
        }
    };
    info!("📶 MAC do dispositivo: {}", radio.local_address());

    let sensors = SimulatedSensors::new(&config.simulation);
    let mut node = SenderNode::new(
        radio,
        sensors,
        SystemClock::new(),
        &config,
        StdRng::from_entropy(),
    );

    // ── Banner ──
    let link = &config.link;
    println!();
    println!("══════════════════════════════════════════════");
    println!("   📡 NODE SENDER – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Dispositivo: {SIM_LOCAL_ADDRESS}");
    println!("  Receptor:    {}", link.peer_address);
    println!("  Canal:       {}", link.channel);
    println!("  Intervalo:   {:.1}s", f64::from(config.schedule.send_interval_ms) / 1000.0);
    println!("  Reset a cada {} falhas", link.reset_threshold);
    println!("  Registro:    {RECORD_SIZE} bytes");
    println!("══════════════════════════════════════════════");
    println!();

    if node.start() == LinkPhase::Failed {
        print_troubleshooting(&config);
    } else {
        info!(
            "✓ Link {} | Sucessos: {} | Falhas: {}",
            node.phase(),
            node.state().success_count,
            node.state().failure_count
        );
    }

    // ── Loop principal ──
    node.run();
}

/// Dicas impressas quando o link não sobe no boot.
fn print_troubleshooting(config: &NodeConfig) {
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚠ LINK FALHOU – seguindo só com sensores");
    println!("══════════════════════════════════════════════");
    println!("  Verifique:");
    println!("   1. O receptor está ligado e no canal {}?", config.link.channel);
    println!("   2. O MAC do receptor é {}?", config.link.peer_address);
    println!("   3. Os dois nós estão ao alcance um do outro?");
    println!("   4. Reinicie os dois dispositivos");
    println!("══════════════════════════════════════════════");
    println!();
}
