//! Codificação do registro no fio.
//!
//! O registro é transmitido como bytes crus, sem cabeçalho, sem prefixo de
//! tamanho e sem checksum. O layout segue a struct C do receptor ESP32:
//!
//! ```text
//! off  0  temperature  f32
//! off  4  humidity     f32
//! off  8  gas_level    i32
//! off 12  heart_rate   f32
//! off 16  spo2         f32
//! off 20  sender       [u8; 18]  (NUL-terminated)
//! off 38  (alinhamento) [u8; 2]  = 0
//! off 40  timestamp    u32
//! ──────────────────────────────
//!         44 bytes, little-endian
//! ```
//!
//! Mudar qualquer campo exige reimplantar os dois lados.

use crate::types::{IDENTITY_LEN, IdentityBuffer, TelemetryRecord};
use bincode::Options;
use serde::{Deserialize, Serialize};

/// Tamanho do registro no fio.
pub const RECORD_SIZE: usize = 44;

/// Bytes de alinhamento antes do `timestamp` (u32 alinhado em 4).
const ALIGN_PAD: usize = 2;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Tamanho de registro inválido: {0} bytes (esperado {RECORD_SIZE})")]
    SizeMismatch(usize),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),

    #[error("Identidade do remetente sem terminador NUL")]
    InvalidIdentity,
}

/// Espelho exato do layout de fio, campo a campo.
#[derive(Serialize, Deserialize)]
struct WireRecord {
    temperature: f32,
    humidity: f32,
    gas_level: i32,
    heart_rate: f32,
    spo2: f32,
    sender: [u8; IDENTITY_LEN],
    align: [u8; ALIGN_PAD],
    timestamp: u32,
}

/// Inteiros de largura fixa, little-endian, sem bytes sobrando.
fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Codifica um [`TelemetryRecord`] em exatamente [`RECORD_SIZE`] bytes.
pub fn encode_record(record: &TelemetryRecord) -> Result<[u8; RECORD_SIZE], ProtocolError> {
    let wire = WireRecord {
        temperature: record.temperature,
        humidity: record.humidity,
        gas_level: record.gas_level,
        heart_rate: record.heart_rate,
        spo2: record.spo2,
        sender: *record.sender.as_bytes(),
        align: [0; ALIGN_PAD],
        timestamp: record.timestamp,
    };

    let bytes = wire_options()
        .serialize(&wire)
        .map_err(|e| ProtocolError::Serialize(e.to_string()))?;

    <[u8; RECORD_SIZE]>::try_from(bytes.as_slice())
        .map_err(|_| ProtocolError::SizeMismatch(bytes.len()))
}

/// Decodifica bytes recebidos em [`TelemetryRecord`].
///
/// Exige o tamanho exato e um terminador dentro do buffer de identidade.
pub fn decode_record(data: &[u8]) -> Result<TelemetryRecord, ProtocolError> {
    if data.len() != RECORD_SIZE {
        return Err(ProtocolError::SizeMismatch(data.len()));
    }

    let wire: WireRecord = wire_options()
        .deserialize(data)
        .map_err(|e| ProtocolError::Deserialize(e.to_string()))?;

    let sender = IdentityBuffer::from_bytes(wire.sender).ok_or(ProtocolError::InvalidIdentity)?;

    Ok(TelemetryRecord {
        temperature: wire.temperature,
        humidity: wire.humidity,
        gas_level: wire.gas_level,
        heart_rate: wire.heart_rate,
        spo2: wire.spo2,
        sender,
        timestamp: wire.timestamp,
    })
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MacAddress;

    fn sample_record() -> TelemetryRecord {
        TelemetryRecord {
            temperature: 23.5,
            humidity: 61.25,
            gas_level: 1873,
            heart_rate: 74.5,
            spo2: 98.0,
            sender: IdentityBuffer::from_address(&MacAddress::new([
                0x24, 0x6F, 0x28, 0x01, 0xA2, 0x3C,
            ])),
            timestamp: 4_294_967_000,
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let original = sample_record();
        let encoded = encode_record(&original).unwrap();
        assert_eq!(decode_record(&encoded).unwrap(), original);
    }

    #[test]
    fn layout_matches_c_struct_offsets() {
        let record = sample_record();
        let bytes = encode_record(&record).unwrap();

        assert_eq!(bytes.len(), RECORD_SIZE);
        assert_eq!(&bytes[0..4], &23.5f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &61.25f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1873i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &74.5f32.to_le_bytes());
        assert_eq!(&bytes[16..20], &98.0f32.to_le_bytes());
        assert_eq!(&bytes[20..37], b"24:6F:28:01:A2:3C");
        assert_eq!(bytes[37], 0);
        assert_eq!(&bytes[38..40], &[0, 0]);
        assert_eq!(&bytes[40..44], &4_294_967_000u32.to_le_bytes());
    }

    #[test]
    fn rejects_wrong_size() {
        let bytes = encode_record(&sample_record()).unwrap();
        assert!(matches!(
            decode_record(&bytes[..40]),
            Err(ProtocolError::SizeMismatch(40))
        ));

        let mut long = bytes.to_vec();
        long.push(0);
        assert!(matches!(
            decode_record(&long),
            Err(ProtocolError::SizeMismatch(45))
        ));
    }

    #[test]
    fn rejects_unterminated_identity() {
        let mut bytes = encode_record(&sample_record()).unwrap();
        bytes[20..38].fill(b'F');
        assert!(matches!(
            decode_record(&bytes),
            Err(ProtocolError::InvalidIdentity)
        ));
    }

    #[test]
    fn default_record_encodes_to_zeroes() {
        let bytes = encode_record(&TelemetryRecord::default()).unwrap();
        assert!(bytes.iter().all(|&b| b == 0));
    }
}
