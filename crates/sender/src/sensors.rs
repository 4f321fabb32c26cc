//! Leitura de sensores e montagem do registro.
//!
//! As leituras de hardware ficam atrás de [`SensorSource`]; uma falha de
//! leitura chega aqui como `NaN` (ou fora da faixa do ADC) e nunca vira erro.
//! O [`TelemetryAssembler`] troca esses valores por fallbacks antes de montar
//! o [`TelemetryRecord`].

use crate::clock::Tick;
use node_core::config::{SensorConfig, SimulationConfig};
use node_core::{IdentityBuffer, MacAddress, TelemetryRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

/// Frequência cardíaca base dos sinais sintéticos (bpm).
const HEART_RATE_BASE: f32 = 72.0;
/// SpO₂ base (%) e limites plausíveis.
const SPO2_BASE: f32 = 97.5;
const SPO2_MIN: f32 = 90.0;
const SPO2_MAX: f32 = 100.0;

/// Leituras bloqueantes de hardware.
pub trait SensorSource {
    /// Temperatura (°C) ou `NaN` em falha.
    fn read_temperature(&mut self) -> f32;
    /// Umidade relativa (%) ou `NaN` em falha.
    fn read_humidity(&mut self) -> f32;
    /// Valor bruto do ADC do sensor de gás.
    fn read_gas_level(&mut self) -> i32;
}

// ──────────────────────────────────────────────
// Montagem do registro
// ──────────────────────────────────────────────

pub struct TelemetryAssembler<S> {
    source: S,
    rng: StdRng,
    identity: IdentityBuffer,
    temperature_fallback: f32,
    humidity_fallback: f32,
    gas_adc_max: i32,
    /// Última leitura válida de cada campo
    last_temperature: Option<f32>,
    last_humidity: Option<f32>,
}

impl<S: SensorSource> TelemetryAssembler<S> {
    pub fn new(source: S, sender: MacAddress, config: &SensorConfig, rng: StdRng) -> Self {
        Self {
            source,
            rng,
            identity: IdentityBuffer::from_address(&sender),
            temperature_fallback: config.temperature_fallback_c,
            humidity_fallback: config.humidity_fallback_pct,
            gas_adc_max: config.gas_adc_max,
            last_temperature: None,
            last_humidity: None,
        }
    }

    /// Lê os sensores e monta um registro carimbado com `tick`.
    pub fn assemble(&mut self, tick: Tick) -> TelemetryRecord {
        let temperature = settle(
            "temperatura",
            self.source.read_temperature(),
            &mut self.last_temperature,
            self.temperature_fallback,
        );
        let humidity = settle(
            "umidade",
            self.source.read_humidity(),
            &mut self.last_humidity,
            self.humidity_fallback,
        );

        let raw_gas = self.source.read_gas_level();
        let gas_level = if (0..=self.gas_adc_max).contains(&raw_gas) {
            raw_gas
        } else {
            warn!("⚠ Leitura inválida do sensor de gás: {raw_gas}");
            0
        };

        // Sinais vitais sintéticos: 67–77 bpm, SpO₂ 95–100%
        let heart_rate = HEART_RATE_BASE + self.rng.gen_range(-10..=10) as f32 / 2.0;
        let spo2 = (SPO2_BASE + self.rng.gen_range(-5..=5) as f32 / 2.0).clamp(SPO2_MIN, SPO2_MAX);

        TelemetryRecord {
            temperature,
            humidity,
            gas_level,
            heart_rate,
            spo2,
            sender: self.identity,
            timestamp: tick,
        }
    }
}

/// Valor finito passa e vira a última leitura boa; senão usa a última boa
/// ou, sem histórico, o padrão configurado.
fn settle(label: &str, reading: f32, last_good: &mut Option<f32>, fallback: f32) -> f32 {
    if reading.is_finite() {
        *last_good = Some(reading);
        return reading;
    }

    let value = last_good.unwrap_or(fallback);
    warn!("⚠ Falha na leitura de {label}, usando {value:.2}");
    value
}

/// Resumo das leituras no log.
pub fn log_snapshot(record: &TelemetryRecord) {
    info!(
        "📊 {:.2}°C | {:.2}% umidade | gás {} | {:.1} bpm | SpO₂ {:.1}% | {} | t={} ms",
        record.temperature,
        record.humidity,
        record.gas_level,
        record.heart_rate,
        record.spo2,
        record.sender,
        record.timestamp
    );
}

// ──────────────────────────────────────────────
// Sensores simulados (host)
// ──────────────────────────────────────────────

/// Fonte simulada: passeio aleatório em torno de valores de ambiente, com
/// falhas ocasionais de leitura.
pub struct SimulatedSensors {
    rng: StdRng,
    fault_rate: f64,
    temperature: f32,
    humidity: f32,
    gas_level: i32,
}

impl SimulatedSensors {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            fault_rate: config.sensor_fault_rate,
            temperature: 24.0,
            humidity: 55.0,
            gas_level: 1200,
        }
    }

    fn faulted(&mut self) -> bool {
        self.rng.gen_bool(self.fault_rate)
    }
}

impl SensorSource for SimulatedSensors {
    fn read_temperature(&mut self) -> f32 {
        if self.faulted() {
            return f32::NAN;
        }
        self.temperature = (self.temperature + self.rng.gen_range(-0.3_f32..=0.3)).clamp(-10.0, 50.0);
        self.temperature
    }

    fn read_humidity(&mut self) -> f32 {
        if self.faulted() {
            return f32::NAN;
        }
        self.humidity = (self.humidity + self.rng.gen_range(-1.0_f32..=1.0)).clamp(0.0, 100.0);
        self.humidity
    }

    fn read_gas_level(&mut self) -> i32 {
        self.gas_level = (self.gas_level + self.rng.gen_range(-40..=40)).clamp(0, 4095);
        self.gas_level
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedSensors, LOCAL};
    use std::collections::VecDeque;

    fn assembler(source: FixedSensors) -> TelemetryAssembler<FixedSensors> {
        TelemetryAssembler::new(source, LOCAL, &SensorConfig::default(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn valid_readings_pass_through() {
        let mut a = assembler(FixedSensors::steady(21.5, 40.0, 1800));
        let r = a.assemble(12_000);
        assert_eq!(r.temperature, 21.5);
        assert_eq!(r.humidity, 40.0);
        assert_eq!(r.gas_level, 1800);
        assert_eq!(r.timestamp, 12_000);
        assert_eq!(r.sender.as_str(), "24:6F:28:01:A2:3C");
    }

    #[test]
    fn nan_temperature_uses_default_and_keeps_real_humidity() {
        let mut a = assembler(FixedSensors::steady(f32::NAN, 63.0, 900));
        let r = a.assemble(1);
        assert_eq!(r.temperature, 25.0);
        assert_eq!(r.humidity, 63.0);
        assert!(r.is_finite());
    }

    #[test]
    fn fault_after_good_reading_keeps_last_good_value() {
        let source = FixedSensors {
            temperatures: VecDeque::from([22.0, f32::NAN, f32::INFINITY]),
            humidities: VecDeque::from([f32::NAN, 48.0, f32::NAN]),
            gas_levels: VecDeque::from([100]),
        };
        let mut a = assembler(source);

        let first = a.assemble(1);
        assert_eq!((first.temperature, first.humidity), (22.0, 50.0));

        let second = a.assemble(2);
        assert_eq!((second.temperature, second.humidity), (22.0, 48.0));

        let third = a.assemble(3);
        assert_eq!((third.temperature, third.humidity), (22.0, 48.0));
    }

    #[test]
    fn gas_out_of_adc_range_becomes_zero() {
        let source = FixedSensors {
            gas_levels: VecDeque::from([-1, 4096, 4095]),
            ..FixedSensors::steady(20.0, 50.0, 0)
        };
        let mut a = assembler(source);
        assert_eq!(a.assemble(1).gas_level, 0);
        assert_eq!(a.assemble(2).gas_level, 0);
        assert_eq!(a.assemble(3).gas_level, 4095);
    }

    #[test]
    fn synthetic_vitals_stay_in_plausible_range() {
        let mut a = assembler(FixedSensors::steady(20.0, 50.0, 0));
        for t in 0..500 {
            let r = a.assemble(t);
            assert!((67.0..=77.0).contains(&r.heart_rate), "hr={}", r.heart_rate);
            assert!((95.0..=100.0).contains(&r.spo2), "spo2={}", r.spo2);
            // Passos de meia unidade
            assert_eq!((r.heart_rate * 2.0).fract(), 0.0);
        }
    }

    #[test]
    fn same_seed_same_vitals() {
        let mut a = assembler(FixedSensors::steady(20.0, 50.0, 0));
        let mut b = assembler(FixedSensors::steady(20.0, 50.0, 0));
        for t in 0..20 {
            assert_eq!(a.assemble(t), b.assemble(t));
        }
    }

    #[test]
    fn simulated_sensors_without_faults_are_finite() {
        let config = SimulationConfig {
            sensor_fault_rate: 0.0,
            ..Default::default()
        };
        let mut s = SimulatedSensors::new(&config);
        for _ in 0..100 {
            assert!(s.read_temperature().is_finite());
            assert!(s.read_humidity().is_finite());
            assert!((0..=4095).contains(&s.read_gas_level()));
        }
    }
}
