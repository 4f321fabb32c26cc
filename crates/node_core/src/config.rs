//! Configuração do nó via TOML.
//!
//! Os padrões seguem as constantes de firmware do nó
//! (canal 1, envio a cada 12 s, 3 tentativas de init, reset a cada 5 falhas).

use crate::types::MacAddress;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Política de envio quando a última entrega falhou.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendPolicy {
    /// Só transmite se a última entrega (ou o registro do peer) deu certo
    Optimistic,
    /// Transmite sempre que o link estiver de pé; rejeições contam como falha
    #[default]
    AlwaysAttempt,
}

/// Parâmetros do link de rádio ponto a ponto.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Endereço de hardware do receptor
    pub peer_address: MacAddress,
    /// Canal de rádio (1–13), deve bater com o receptor
    pub channel: u8,
    /// Tentativas de init no boot
    pub init_max_attempts: u32,
    /// Espera entre tentativas de init (ms)
    pub init_backoff_ms: u64,
    /// A cada N falhas acumuladas o link é reinicializado
    pub reset_threshold: u32,
    /// Pausa entre deinit e reinit (ms)
    pub reset_settle_ms: u64,
    pub send_policy: SendPolicy,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            peer_address: MacAddress::new([0xB8, 0xD6, 0x1A, 0xA7, 0x66, 0x88]),
            channel: 1,
            init_max_attempts: 3,
            init_backoff_ms: 2000,
            reset_threshold: 5,
            reset_settle_ms: 1000,
            send_policy: SendPolicy::AlwaysAttempt,
        }
    }
}

impl LinkConfig {
    pub fn init_backoff(&self) -> Duration {
        Duration::from_millis(self.init_backoff_ms)
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }
}

/// Temporização do loop principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Intervalo entre ciclos de envio (ms)
    pub send_interval_ms: u32,
    /// Fatia de espera por iteração, só para ceder ao runtime (ms)
    pub idle_slice_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: 12_000,
            idle_slice_ms: 50,
        }
    }
}

impl ScheduleConfig {
    pub fn idle_slice(&self) -> Duration {
        Duration::from_millis(self.idle_slice_ms)
    }
}

/// Valores de fallback e limites dos sensores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Temperatura usada se nunca houve leitura válida (°C)
    pub temperature_fallback_c: f32,
    /// Umidade usada se nunca houve leitura válida (%)
    pub humidity_fallback_pct: f32,
    /// Maior valor bruto aceito do ADC de gás
    pub gas_adc_max: i32,
    /// Estabilização dos sensores antes da primeira leitura (ms)
    pub warmup_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            temperature_fallback_c: 25.0,
            humidity_fallback_pct: 50.0,
            gas_adc_max: 4095,
            warmup_ms: 2000,
        }
    }
}

/// Parâmetros do backend simulado (execução no host).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Probabilidade de uma entrega falhar (0.0–1.0)
    pub delivery_loss: f64,
    /// Atraso até o callback de entrega (ms)
    pub delivery_latency_ms: u64,
    /// Probabilidade de leitura `NaN` do sensor de temperatura/umidade
    pub sensor_fault_rate: f64,
    /// Quantas inicializações do rádio falham antes de dar certo
    pub failed_init_attempts: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            delivery_loss: 0.1,
            delivery_latency_ms: 5,
            sensor_fault_rate: 0.05,
            failed_init_attempts: 0,
        }
    }
}

/// Configuração raiz do nó.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub link: LinkConfig,
    pub schedule: ScheduleConfig,
    pub sensors: SensorConfig,
    pub simulation: SimulationConfig,
}

impl NodeConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<NodeConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        NodeConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do node.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("node.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !(1..=13).contains(&self.link.channel) {
            errors.push(format!("Canal inválido: {} (1–13)", self.link.channel));
        }
        if self.link.init_max_attempts == 0 {
            errors.push("init_max_attempts deve ser ≥ 1".into());
        }
        if self.link.reset_threshold == 0 {
            errors.push("reset_threshold deve ser ≥ 1".into());
        }
        if self.schedule.send_interval_ms == 0 {
            errors.push("send_interval_ms deve ser ≥ 1".into());
        }
        if self.schedule.idle_slice_ms >= u64::from(self.schedule.send_interval_ms) {
            errors.push(format!(
                "idle_slice_ms ({}) deve ser menor que send_interval_ms ({})",
                self.schedule.idle_slice_ms, self.schedule.send_interval_ms
            ));
        }
        for (name, value) in [
            ("temperature_fallback_c", self.sensors.temperature_fallback_c),
            ("humidity_fallback_pct", self.sensors.humidity_fallback_pct),
        ] {
            if !value.is_finite() {
                errors.push(format!("{name} deve ser um número finito: {value}"));
            }
        }
        if self.sensors.gas_adc_max <= 0 {
            errors.push("gas_adc_max deve ser positivo".into());
        }
        for (name, value) in [
            ("delivery_loss", self.simulation.delivery_loss),
            ("sensor_fault_rate", self.simulation.sensor_fault_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("{name} fora de 0.0–1.0: {value}"));
            }
        }

        errors
    }
}
