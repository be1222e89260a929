//! Проекции серверов в кэше: чтение, слияние полей, запись с TTL.
//!
//! Все функции работают по принципу best-effort: ошибка кэша логируется
//! и превращается в промах или пропуск записи.

use crate::cache::{server_key, ServerCache, CACHE_TTL};
use serde_json::{Map, Value};

pub type CachedObject = Map<String, Value>;

/// Прочитать JSON-объект сервера из кэша.
pub async fn read_object(cache: &dyn ServerCache, ip: &str) -> Option<CachedObject> {
    let key = server_key(ip);
    let raw = match cache.get(&key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Кэш: ошибка чтения {key}: {e}");
            return None;
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(obj)) => Some(obj),
        Ok(_) => {
            tracing::warn!("Кэш: запись {key} не является объектом, игнорирую");
            None
        }
        Err(e) => {
            tracing::warn!("Кэш: повреждённая запись {key}: {e}");
            None
        }
    }
}

/// Записать объект в кэш с TTL, заменяя прежний TTL.
pub async fn write_object(cache: &dyn ServerCache, ip: &str, object: CachedObject) {
    let key = server_key(ip);
    let raw = Value::Object(object).to_string();
    if let Err(e) = cache.set_ex(&key, raw, CACHE_TTL).await {
        tracing::warn!("Кэш: ошибка записи {key}: {e}");
    }
}

/// Наложить поля поверх объекта. Поля, отсутствующие в `fields`, сохраняются.
pub fn merge(base: Option<CachedObject>, fields: CachedObject) -> CachedObject {
    let mut merged = base.unwrap_or_default();
    merged.extend(fields);
    merged
}

/// Сериализовать значение в JSON-объект.
pub fn to_object<T: serde::Serialize>(value: &T) -> Option<CachedObject> {
    match serde_json::to_value(value) {
        Ok(Value::Object(obj)) => Some(obj),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Кэш: ошибка сериализации проекции: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> CachedObject {
        match value {
            Value::Object(obj) => obj,
            _ => panic!("ожидался объект"),
        }
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let base = object(json!({ "cpu": 1.0, "gaming": true }));
        let fields = object(json!({ "cpu": 50.0, "ram": 10.0 }));

        let merged = merge(Some(base), fields);

        assert_eq!(merged["cpu"], json!(50.0));
        assert_eq!(merged["ram"], json!(10.0));
        assert_eq!(merged["gaming"], json!(true));
    }

    #[test]
    fn test_merge_without_base() {
        let merged = merge(None, object(json!({ "cpu": 5.0 })));
        assert_eq!(merged.len(), 1);
    }
}
