//! `postbox`: внутрипроцессная шина уведомлений с синхронными наблюдателями.
//!
//! Компоненты подписываются на именованный канал, другие компоненты
//! публикуют в него сообщения; все текущие наблюдатели вызываются в потоке
//! издателя по порядку подписки.
//!
//! ```ignore
//! use postbox::{Broker, Message, SubscriberId};
//!
//! let broker = Broker::new();
//! let node = SubscriberId::next();
//! broker.subscribe(node, "deviceConnectedNotification", |msg: &mut Message| {
//!     let info = msg.payload.get_str("myInfo")?;
//!     tracing::info!(info, "device connected");
//!     Ok(())
//! });
//!
//! let mut msg = Message::new().with("myInfo", "device #").with("myValue", 0.42);
//! broker.publish("deviceConnectedNotification", &mut msg)?;
//! ```

/// Loading settings from defaults, file and environment.
pub mod config;
/// Logging (filter, console and file sinks).
pub mod logging;
/// Notification bus: Broker, Message, Subscription.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Settings.
pub use config::{BrokerConfig, DiagnosticLevel, Settings, SettingsError};
/// Logging initialization.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Error types shared with `postbox-error`.
pub use postbox_error::{
    PayloadError, PostboxResult, PublishError, ResultExt, StackError, StatusCode,
};
/// Pub/Sub API.
pub use pubsub::{
    global, init_global, reset_global, Broker, BrokerStats, Delivery, Message, ObserverResult,
    Payload, ScopedSubscription, SubscriberId, Subscription, SubscriptionId, Value,
};
