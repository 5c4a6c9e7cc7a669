//! Подсистема уведомлений Publish–Subscribe.
//!
//! Внутрипроцессная шина: компоненты подписываются на именованный канал,
//! другие компоненты публикуют в него сообщения, и все текущие наблюдатели
//! вызываются синхронно в потоке издателя.
//!
//! - `broker`: реестр каналов, подписка, отписка и рассылка.
//! - `flatten` (приватный): раскладка плоской структуры в payload.
//! - `global`: общий для процесса экземпляр брокера.
//! - `intern` (приватный): пул имён каналов.
//! - `message`: сообщение с payload и типизированным расширением.
//! - `payload`: плоская карта ключ → примитивное значение.
//! - `registry` (приватный): хранилище регистраций наблюдателей.
//! - `subscriber`: идентификаторы владельцев и handle подписок.

pub mod broker;
mod flatten;
pub mod global;
mod intern;
pub mod message;
pub mod payload;
mod registry;
pub mod subscriber;

// Публичный экспорт типов из вложенных модулей, чтобы упростить доступ к ним
// из внешнего кода.
pub use broker::*;
pub use global::*;
pub(crate) use intern::intern_channel;
pub use message::*;
pub use payload::*;
pub use registry::ObserverResult;
pub use subscriber::*;
