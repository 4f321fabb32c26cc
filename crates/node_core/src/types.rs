//! Tipos compartilhados entre sender e receiver.
//!
//! O [`TelemetryRecord`] é o registro de leituras transmitido a cada ciclo.
//! A ordem e a largura dos campos formam o contrato de fio; a codificação
//! fica em [`crate::protocol`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Comprimento do buffer de identidade: 17 caracteres + terminador NUL.
pub const IDENTITY_LEN: usize = 18;

// ──────────────────────────────────────────────
// Endereço de hardware
// ──────────────────────────────────────────────

/// Endereço de hardware (MAC) de 6 bytes.
///
/// Formato canônico: `AA:BB:CC:DD:EE:FF` (hex maiúsculo, separado por `:`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

/// Erro ao interpretar um endereço MAC em texto.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("Endereço deve ter 6 octetos separados por ':' (recebido {0})")]
    WrongLength(usize),

    #[error("Octeto inválido: {0:?}")]
    InvalidOctet(String),
}

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 6 {
            return Err(AddressParseError::WrongLength(parts.len()));
        }

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AddressParseError::InvalidOctet((*part).to_string()));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| AddressParseError::InvalidOctet((*part).to_string()))?;
        }
        Ok(Self(octets))
    }
}

// No TOML o endereço aparece em texto, não como array de bytes.
impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ──────────────────────────────────────────────
// Identidade do remetente
// ──────────────────────────────────────────────

/// Buffer de tamanho fixo com a identidade do remetente.
///
/// Sempre contém um NUL dentro da capacidade; o padrão (todo zero) é uma
/// string vazia válida.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityBuffer([u8; IDENTITY_LEN]);

impl IdentityBuffer {
    /// Monta o buffer a partir do endereço em forma canônica.
    pub fn from_address(address: &MacAddress) -> Self {
        let text = address.to_string();
        let mut buf = [0u8; IDENTITY_LEN];
        // 17 bytes de texto, o 18º fica como terminador
        buf[..IDENTITY_LEN - 1].copy_from_slice(&text.as_bytes()[..IDENTITY_LEN - 1]);
        Self(buf)
    }

    /// Aceita bytes vindos do fio somente se houver terminador.
    pub fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Option<Self> {
        bytes.contains(&0).then_some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Texto até o primeiro NUL (vazio se não for UTF-8).
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(IDENTITY_LEN);
        std::str::from_utf8(&self.0[..end]).unwrap_or_default()
    }
}

impl fmt::Display for IdentityBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Registro de telemetria
// ──────────────────────────────────────────────

/// Registro de leituras transmitido a cada ciclo de envio.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryRecord {
    /// Temperatura (°C), nunca `NaN`
    pub temperature: f32,
    /// Umidade relativa (%)
    pub humidity: f32,
    /// Nível de gás, unidades brutas do ADC
    pub gas_level: i32,
    /// Frequência cardíaca sintética (bpm)
    pub heart_rate: f32,
    /// Saturação de oxigênio sintética (%)
    pub spo2: f32,
    /// Endereço de hardware do remetente
    pub sender: IdentityBuffer,
    /// Tick (ms desde o boot) no momento da amostragem
    pub timestamp: u32,
}

impl TelemetryRecord {
    /// `true` se nenhum campo de ponto flutuante carrega `NaN`/infinito.
    pub fn is_finite(&self) -> bool {
        [self.temperature, self.humidity, self.heart_rate, self.spo2]
            .iter()
            .all(|v| v.is_finite())
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
