//! Ошибки агента.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Ошибка файла идентичности {path}: {source}")]
    IdentityIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Повреждён файл идентичности: {0}")]
    IdentityFormat(#[from] serde_json::Error),

    #[error("Не удалось определить публичный адрес: {0}")]
    GeoLookup(String),

    #[error("Ошибка сети: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Сервер отклонил API-ключ: {0}")]
    Unauthorized(String),

    #[error("Неожиданный ответ сервера {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}
