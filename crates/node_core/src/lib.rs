//! # Node Core
//!
//! Crate compartilhada que define o registro de leituras, a codificação de
//! layout fixo usada no link de rádio e a configuração TOML do nó sensor.
//!
//! ## Módulos
//! - [`types`] – Endereço MAC, identidade do remetente e registro de telemetria
//! - [`protocol`] – Encode/decode do registro em 44 bytes, sem framing
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod protocol;
pub mod config;

// Re-exports convenientes
pub use types::{IdentityBuffer, MacAddress, TelemetryRecord};
pub use protocol::{encode_record, decode_record, RECORD_SIZE};
pub use config::{NodeConfig, LinkConfig, SendPolicy};
