//! Contrato do adaptador de rádio ponto a ponto.
//!
//! O adaptador é dono do estado global do rádio: entrar no modo estação,
//! inicializar a pilha, registrar o peer e enfileirar envios. O resultado de
//! cada envio chega depois, de forma assíncrona, pelo [`OutcomeHandler`].

use node_core::{MacAddress, RECORD_SIZE};
use std::sync::Arc;

/// Resultado de entrega de um envio anterior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    Failure,
}

/// Callback de entrega, chamado fora do loop principal.
///
/// Pode rodar entre quaisquer duas instruções do loop, então só deve
/// repassar o evento adiante.
pub type OutcomeHandler = Arc<dyn Fn(MacAddress, DeliveryOutcome) + Send + Sync>;

/// Payload opaco de tamanho fixo entregue ao rádio.
pub type Payload = [u8; RECORD_SIZE];

/// Falhas do link de rádio.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("Inicialização da pilha de rádio falhou: {0}")]
    InitFailed(String),

    #[error("Falha ao adicionar peer {peer}: {reason}")]
    PeerAddFailed { peer: MacAddress, reason: String },

    #[error("Envio rejeitado pela pilha: {0}")]
    SendRejected(String),

    #[error("Link não está pronto ({0})")]
    LinkNotReady(&'static str),
}

/// Adaptador de rádio ponto a ponto.
///
/// Só uma instância ativa por vez: todas as operações mexem no hardware.
pub trait RadioLink {
    /// Modo estação, desassocia de qualquer AP, fixa o canal e inicializa a pilha.
    fn bring_up(&mut self, channel: u8) -> Result<(), LinkError>;

    /// Instala o callback de entrega; substitui o anterior.
    fn register_outcome_handler(&mut self, handler: OutcomeHandler);

    /// Registra o peer. Se já existir, remove e adiciona de novo.
    fn register_peer(&mut self, peer: MacAddress, channel: u8) -> Result<(), LinkError>;

    /// Enfileira o envio e retorna imediatamente.
    ///
    /// Só falha se a pilha recusar o pedido antes da transmissão; a entrega
    /// em si é reportada pelo callback.
    fn send(&mut self, peer: MacAddress, payload: &Payload) -> Result<(), LinkError>;

    /// Desinicializa a pilha. Seguro mesmo sem init prévio.
    fn tear_down(&mut self);

    /// Endereço de hardware deste rádio.
    fn local_address(&self) -> MacAddress;
}
