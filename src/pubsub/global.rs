use once_cell::sync::OnceCell;

use postbox_error::{ensure, PostboxResult, StatusCode};

use super::Broker;
use crate::config::BrokerConfig;

static GLOBAL: OnceCell<Broker> = OnceCell::new();

/// Общий для процесса брокер.
///
/// Создаётся при первом обращении с конфигурацией по умолчанию (если до этого
/// не был вызван [`init_global`]) и живёт до конца процесса.
pub fn global() -> &'static Broker {
    GLOBAL.get_or_init(Broker::default)
}

/// Устанавливает общий брокер с заданной конфигурацией.
///
/// Должен вызываться до первого [`global`]; повторная инициализация
/// возвращает ошибку `AlreadyExists`.
pub fn init_global(config: BrokerConfig) -> PostboxResult<&'static Broker> {
    let mut installed = false;
    let broker = GLOBAL.get_or_init(|| {
        installed = true;
        Broker::with_config(config)
    });
    ensure!(
        installed,
        StatusCode::AlreadyExists,
        "global broker is already initialized"
    );
    tracing::debug!(config = ?broker.config(), "global broker initialized");
    Ok(broker)
}

/// Очищает общий брокер: все каналы, регистрации и счётчики.
///
/// Предназначен для тестов; конфигурация сохраняется.
pub fn reset_global() {
    if let Some(broker) = GLOBAL.get() {
        broker.clear();
    }
}
