//! Конфигурация сервера мониторинга.

/// Учётная запись оператора (логин + хэш пароля).
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,

    /// Хэш пароля (SHA-256 hex)
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Адрес для прослушивания (например "0.0.0.0:8000")
    pub listen: String,

    /// URL подключения к БД (sqlite или postgres)
    pub db_url: String,

    /// Общий секрет агентов. None: heartbeat отклоняется как ошибка конфигурации
    pub agent_api_key: Option<String>,

    /// Секрет JWT (генерируется случайно если не задан)
    pub jwt_secret: String,

    /// Администратор: полный список серверов и изменение конфигурации
    pub admin: Account,

    /// Наблюдатель: только публичный список
    pub viewer: Option<Account>,
}

/// Хэшировать пароль (SHA-256 hex).
pub fn hash_password(password: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(password.as_bytes());
    hex::encode(hash)
}

/// Проверить пароль по хэшу.
pub fn verify_password(password: &str, hash: &str) -> bool {
    hash_password(password) == hash
}

/// Сгенерировать случайный секрет JWT (32 байта, hex).
pub fn random_secret() -> anyhow::Result<String> {
    let mut buf = [0u8; 32];
    getrandom::fill(&mut buf).map_err(|e| anyhow::anyhow!("Ошибка генерации секрета: {e}"))?;
    Ok(hex::encode(buf))
}
