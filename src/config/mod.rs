//! Конфигурация: значения по умолчанию, необязательный файл и переменные
//! окружения с префиксом `POSTBOX`.

pub mod settings;

pub use settings::*;
