//! Tentativas limitadas com espera fixa entre elas.

use crate::clock::Delay;
use std::time::Duration;
use tracing::debug;

/// Quantas vezes tentar e quanto esperar entre tentativas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Uma tentativa só, sem espera.
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Todas as tentativas falharam.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Executa `op` até dar certo ou esgotar `policy.max_attempts`.
///
/// `op` recebe o número da tentativa (a partir de 1). A espera acontece só
/// entre tentativas, nunca depois da última. Em caso de sucesso retorna o
/// valor e o número de tentativas usadas.
pub fn retry_with_backoff<T, E, D, F>(
    policy: RetryPolicy,
    delay: &mut D,
    mut op: F,
) -> Result<(T, u32), RetryExhausted<E>>
where
    D: Delay + ?Sized,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok((value, attempt)),
            Err(last_error) if attempt >= max_attempts => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error,
                });
            }
            Err(_) => {
                debug!("Nova tentativa em {:?}", policy.backoff);
                delay.delay(policy.backoff);
                attempt += 1;
            }
        }
    }
}
