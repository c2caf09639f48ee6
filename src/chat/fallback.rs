//! Locally generated replies used when the backend reply cannot be obtained.

use super::notify::Notification;
use crate::error::{FailureKind, RelayError};

const NOTIFICATION_TITLE: &str = "Erro de Conexão";

/// Notification plus the simulated assistant reply for a failed send.
pub fn fallback_for(error: &RelayError, user_text: &str) -> (Notification, String) {
    let kind = error.kind();
    let (description, reply) = match kind {
        FailureKind::Timeout => {
            let secs = timeout_secs(error);
            (
                format!("Tempo esgotado: O servidor demorou mais de {secs}s para responder."),
                format!(
                    "(Simulação - Timeout) A resposta do servidor demorou mais de {secs} segundos. Sua mensagem foi: \"{user_text}\""
                ),
            )
        }
        FailureKind::Connection => (
            "Erro de conexão. Verifique o servidor ou a rede.".to_string(),
            format!(
                "(Simulação - Erro de Conexão) Não foi possível conectar ao servidor. Sua mensagem foi: \"{user_text}\""
            ),
        ),
        FailureKind::MalformedResponse => (
            "O servidor respondeu em um formato inesperado.".to_string(),
            format!(
                "(Simulação - Resposta Inválida) Não foi possível ler a resposta do servidor. Sua mensagem foi: \"{user_text}\""
            ),
        ),
        FailureKind::PushDisconnected => (
            "Canal de notificações desconectado. Tente enviar novamente.".to_string(),
            format!(
                "(Simulação - Canal Desconectado) A conexão para receber respostas foi perdida. Sua mensagem foi: \"{user_text}\""
            ),
        ),
        FailureKind::Remote => (
            format!("O fluxo de automação reportou um erro: {error}"),
            format!(
                "(Simulação - Erro no Fluxo) O servidor não conseguiu processar a mensagem. Sua mensagem foi: \"{user_text}\""
            ),
        ),
        FailureKind::Local => (
            format!("Erro local: {error}"),
            format!(
                "(Simulação - Erro Local) A mensagem não pôde ser processada. Sua mensagem foi: \"{user_text}\""
            ),
        ),
    };

    let notification = Notification {
        title: NOTIFICATION_TITLE.to_string(),
        description,
        kind,
    };
    (notification, reply)
}

fn timeout_secs(error: &RelayError) -> u64 {
    match error {
        RelayError::Timeout(ms) | RelayError::PollDeadline(ms) => ms.div_ceil(1000),
        _ => 60,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_fallback_quotes_message_and_seconds() {
        let (note, reply) = fallback_for(&RelayError::Timeout(60_000), "Olá");
        assert_eq!(note.kind, FailureKind::Timeout);
        assert!(note.description.contains("60s"));
        assert_eq!(
            reply,
            "(Simulação - Timeout) A resposta do servidor demorou mais de 60 segundos. Sua mensagem foi: \"Olá\""
        );
    }

    #[test]
    fn poll_deadline_uses_timeout_wording() {
        let (_, reply) = fallback_for(&RelayError::PollDeadline(120_000), "oi");
        assert!(reply.starts_with("(Simulação - Timeout)"));
        assert!(reply.contains("120 segundos"));
    }

    #[test]
    fn http_errors_use_connection_wording() {
        let (note, reply) = fallback_for(&RelayError::http(500, "boom"), "oi");
        assert_eq!(note.kind, FailureKind::Connection);
        assert!(reply.starts_with("(Simulação - Erro de Conexão)"));
    }
}
