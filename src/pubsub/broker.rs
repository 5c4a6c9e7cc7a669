use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde::Serialize;

use postbox_error::{PostboxResult, PublishError, StackError};

use super::{
    registry::{Registration, Registry},
    Message, ObserverResult, ScopedSubscription, SubscriberId, Subscription, SubscriptionId,
};
use crate::config::{BrokerConfig, DiagnosticLevel};

/// Шина уведомлений: реестр каналов и синхронная рассылка.
///
/// `Broker` дёшево клонируется: все клоны разделяют один реестр и одни
/// счётчики. Рассылка выполняется в потоке вызывающего `publish`, без очередей
/// и фоновых потоков.
///
/// Поддерживает:
/// - подписку с handle и подписку, снимаемую при `Drop`
/// - отписку по handle и по паре (владелец, канал)
/// - реентерабельность: наблюдатель может публиковать и (от)подписываться
/// - статистику публикаций, доставок и ошибок
#[derive(Clone, Default)]
pub struct Broker {
    registry: Arc<Registry>,
    counters: Arc<Counters>,
    config: BrokerConfig,
}

/// Итог успешной публикации.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Сообщение доставлено `n` наблюдателям.
    Delivered(usize),
    /// У канала нет наблюдателей; сообщение никому не доставлено.
    NoListeners,
}

/// Снимок счётчиков брокера.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrokerStats {
    /// Вызовы `publish` (включая строгий вариант).
    pub publish_count: u64,
    /// Успешные вызовы наблюдателей.
    pub delivered_count: u64,
    /// Публикации в канал без наблюдателей.
    pub no_listener_count: u64,
    /// Наблюдатели, вернувшие ошибку.
    pub observer_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    publish_count: AtomicU64,
    delivered_count: AtomicU64,
    no_listener_count: AtomicU64,
    observer_failures: AtomicU64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Broker {
    /// Брокер с конфигурацией по умолчанию.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Регистрирует наблюдателя на канале.
    ///
    /// Дубликаты не отсеиваются: две подписки одного владельца с одним
    /// колбэком дают два вызова на каждую публикацию. Пустое имя канала
    /// допустимо и ничем не отличается от остальных.
    pub fn subscribe<F>(
        &self,
        owner: SubscriberId,
        channel: &str,
        callback: F,
    ) -> Subscription
    where
        F: Fn(&mut Message) -> ObserverResult + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        let key = self.registry.insert(
            channel,
            Registration {
                id,
                owner,
                callback: Box::new(callback),
            },
        );
        tracing::debug!(channel = %key, %owner, subscription = %id, "observer subscribed");
        Subscription::new(id, owner, key)
    }

    /// То же, что [`Broker::subscribe`], но регистрация снимается при `Drop`
    /// возвращённого handle.
    pub fn subscribe_scoped<F>(
        &self,
        owner: SubscriberId,
        channel: &str,
        callback: F,
    ) -> ScopedSubscription
    where
        F: Fn(&mut Message) -> ObserverResult + Send + Sync + 'static,
    {
        let subscription = self.subscribe(owner, channel, callback);
        ScopedSubscription::new(subscription, Arc::downgrade(&self.registry))
    }

    /// Снимает регистрацию по handle.
    ///
    /// Неизвестный канал или уже снятая подписка — тихий no-op, `false`.
    pub fn unsubscribe(
        &self,
        subscription: &Subscription,
    ) -> bool {
        let removed = self
            .registry
            .remove(subscription.channel(), subscription.id());
        tracing::debug!(
            channel = subscription.channel(),
            subscription = %subscription.id(),
            removed,
            "observer unsubscribed"
        );
        removed
    }

    /// Снимает все регистрации `owner` на канале `channel`.
    ///
    /// Возвращает число удалённых регистраций; неизвестный канал даёт `0`.
    pub fn unsubscribe_owner(
        &self,
        owner: SubscriberId,
        channel: &str,
    ) -> usize {
        let removed = self.registry.remove_owner(channel, owner);
        tracing::debug!(channel, %owner, removed, "owner unsubscribed");
        removed
    }

    /// Публикует сообщение в канал.
    ///
    /// Проставляет `message.channel`, снимает копию списка наблюдателей и
    /// вызывает их по порядку подписки с одним и тем же `&mut Message`.
    ///
    /// Канал без наблюдателей (неизвестный или опустевший) не является
    /// ошибкой: пишется диагностика на уровне `no_listener_level` и
    /// возвращается [`Delivery::NoListeners`].
    ///
    /// # Ошибки
    /// Первая ошибка наблюдателя прерывает рассылку и возвращается с
    /// контекстом: канал, позиция наблюдателя и идентификатор подписки.
    pub fn publish(
        &self,
        channel: &str,
        message: &mut Message,
    ) -> Result<Delivery, StackError> {
        self.counters.publish_count.fetch_add(1, Ordering::Relaxed);

        let (key, observers) = self.registry.lookup(channel).unzip();
        message.stamp(channel, key);

        let observers = observers.unwrap_or_default();
        if observers.is_empty() {
            self.counters
                .no_listener_count
                .fetch_add(1, Ordering::Relaxed);
            self.report_no_listeners(channel);
            return Ok(Delivery::NoListeners);
        }

        self.dispatch(channel, &observers, message)
            .map(Delivery::Delivered)
    }

    /// Публикует пустое сообщение.
    pub fn publish_default(
        &self,
        channel: &str,
    ) -> Result<Delivery, StackError> {
        self.publish(channel, &mut Message::new())
    }

    /// Строгий вариант `publish`: канал без наблюдателей — ошибка
    /// [`PublishError::NoSubscribers`]. Возвращает число вызванных
    /// наблюдателей.
    pub fn publish_strict(
        &self,
        channel: &str,
        message: &mut Message,
    ) -> PostboxResult<usize> {
        match self.publish(channel, message)? {
            Delivery::Delivered(n) => Ok(n),
            Delivery::NoListeners => Err(PublishError::NoSubscribers {
                channel: channel.to_string(),
            }
            .into()),
        }
    }

    /// Все известные каналы, включая опустевшие, в лексикографическом порядке.
    pub fn channels(&self) -> Vec<String> {
        self.registry.channels()
    }

    pub fn has_channel(
        &self,
        channel: &str,
    ) -> bool {
        self.registry.contains(channel)
    }

    pub fn observer_count(
        &self,
        channel: &str,
    ) -> usize {
        self.registry.observer_count(channel)
    }

    pub fn stats(&self) -> BrokerStats {
        let c = &self.counters;
        BrokerStats {
            publish_count: c.publish_count.load(Ordering::Relaxed),
            delivered_count: c.delivered_count.load(Ordering::Relaxed),
            no_listener_count: c.no_listener_count.load(Ordering::Relaxed),
            observer_failures: c.observer_failures.load(Ordering::Relaxed),
        }
    }

    /// Удаляет все каналы и регистрации, обнуляет счётчики.
    ///
    /// Выданные ранее handle становятся «пустыми»: отписка по ним вернёт
    /// `false`.
    pub fn clear(&self) {
        self.registry.clear();
        let c = &self.counters;
        c.publish_count.store(0, Ordering::Relaxed);
        c.delivered_count.store(0, Ordering::Relaxed);
        c.no_listener_count.store(0, Ordering::Relaxed);
        c.observer_failures.store(0, Ordering::Relaxed);
        tracing::debug!("broker cleared");
    }

    fn dispatch(
        &self,
        channel: &str,
        observers: &[Arc<Registration>],
        message: &mut Message,
    ) -> Result<usize, StackError> {
        tracing::trace!(channel, observers = observers.len(), "dispatching notification");

        for (position, registration) in observers.iter().enumerate() {
            if self.config.trace_dispatch {
                tracing::trace!(
                    channel,
                    position,
                    subscription = %registration.id,
                    owner = %registration.owner,
                    "invoking observer"
                );
            }

            if let Err(err) = (registration.callback)(&mut *message) {
                self.counters
                    .observer_failures
                    .fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    channel,
                    position,
                    subscription = %registration.id,
                    status = %err.status_code(),
                    error = %err,
                    "observer failed, aborting dispatch"
                );
                return Err(err.context(format!(
                    "observer #{position} ({}) failed on channel \"{channel}\"",
                    registration.id
                )));
            }

            self.counters.delivered_count.fetch_add(1, Ordering::Relaxed);
        }

        Ok(observers.len())
    }

    fn report_no_listeners(
        &self,
        channel: &str,
    ) {
        let level = self.config.no_listener_level;
        if level == DiagnosticLevel::Off {
            return;
        }

        let diagnostic = PublishError::NoSubscribers {
            channel: channel.to_string(),
        };
        match level {
            DiagnosticLevel::Off => {}
            DiagnosticLevel::Debug => tracing::debug!(channel, "{diagnostic}"),
            DiagnosticLevel::Info => tracing::info!(channel, "{diagnostic}"),
            DiagnosticLevel::Warn => tracing::warn!(channel, "{diagnostic}"),
            DiagnosticLevel::Error => tracing::error!(channel, "{diagnostic}"),
        }
    }
}

impl Delivery {
    /// Число вызванных наблюдателей.
    pub fn count(self) -> usize {
        match self {
            Delivery::Delivered(n) => n,
            Delivery::NoListeners => 0,
        }
    }

    pub fn is_delivered(self) -> bool {
        matches!(self, Delivery::Delivered(_))
    }
}

impl fmt::Debug for Broker {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Broker")
            .field("registry", &self.registry)
            .field("stats", &self.stats())
            .field("config", &self.config)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use postbox_error::{bail, GenericError, PayloadError, StatusCode};

    use super::*;

    type BoxedObserver = Box<dyn Fn(&mut Message) -> ObserverResult + Send + Sync>;

    /// Фабрика наблюдателей, записывающих свой тег в общий журнал.
    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> BoxedObserver) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let journal = log.clone();
        let make = move |tag: &str| -> BoxedObserver {
            let journal = journal.clone();
            let tag = tag.to_string();
            Box::new(move |_: &mut Message| {
                journal.lock().unwrap().push(tag.clone());
                Ok(())
            })
        };
        (log, make)
    }

    /// Тест проверяет публикацию в канал без подписчиков: диагностика,
    /// счётчик и `NoListeners` без ошибки.
    #[test]
    fn test_publish_without_listeners() {
        let broker = Broker::new();
        let res = broker.publish_default("deviceDisconnectedNotification").unwrap();
        assert_eq!(res, Delivery::NoListeners);
        assert_eq!(res.count(), 0);

        let stats = broker.stats();
        assert_eq!(stats.publish_count, 1);
        assert_eq!(stats.no_listener_count, 1);
        assert_eq!(stats.delivered_count, 0);
        assert!(!broker.has_channel("deviceDisconnectedNotification"));
    }

    /// Тест проверяет, что публикация в каналы без подписок не пополняет
    /// пул имён, а известный канал проставляется ключом из реестра.
    #[test]
    fn test_publish_does_not_intern_unknown_channels() {
        use crate::pubsub::intern::is_interned;

        let broker = Broker::new();
        for i in 0..1_000 {
            let channel = format!("unsubscribed-{i}-{}", SubscriberId::next());
            let mut msg = Message::new();
            assert_eq!(broker.publish(&channel, &mut msg).unwrap(), Delivery::NoListeners);
            assert_eq!(msg.channel(), channel);
            assert!(!is_interned(&channel));
        }
        broker.clear();

        let sub = broker.subscribe(SubscriberId::next(), "interned-known", |_| Ok(()));
        let mut msg = Message::new();
        broker.publish("interned-known", &mut msg).unwrap();
        assert!(std::ptr::eq(msg.channel().as_ptr(), sub.channel().as_ptr()));
    }

    /// Тест проверяет, что уровень `Off` глушит диагностику, но не счётчик.
    #[test]
    fn test_no_listener_level_off_still_counts() {
        let broker = Broker::with_config(BrokerConfig {
            no_listener_level: DiagnosticLevel::Off,
            ..Default::default()
        });
        assert_eq!(broker.publish_default("silent").unwrap(), Delivery::NoListeners);
        assert_eq!(broker.stats().no_listener_count, 1);
    }

    /// Тест проверяет, что наблюдатели вызываются в порядке подписки.
    #[test]
    fn test_subscription_order() {
        let broker = Broker::new();
        let (log, make) = recorder();
        let owner = SubscriberId::next();
        for tag in ["a", "b", "c"] {
            broker.subscribe(owner, "chan", make(tag));
        }

        let res = broker.publish_default("chan").unwrap();
        assert_eq!(res, Delivery::Delivered(3));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(broker.stats().delivered_count, 3);
    }

    /// Тест проверяет, что брокер перезаписывает канал сообщения.
    #[test]
    fn test_channel_is_stamped() {
        let broker = Broker::new();
        let seen = Arc::new(Mutex::new(String::new()));
        let seen2 = seen.clone();
        broker.subscribe(SubscriberId::next(), "real", move |msg: &mut Message| {
            *seen2.lock().unwrap() = msg.channel().to_string();
            Ok(())
        });

        let mut msg = Message::new();
        msg.channel = Arc::from("fake");
        broker.publish("real", &mut msg).unwrap();
        assert_eq!(msg.channel(), "real");
        assert_eq!(*seen.lock().unwrap(), "real");
    }

    /// Тест проверяет, что изменения одного наблюдателя видны следующему.
    #[test]
    fn test_mutation_visible_to_later_observers() {
        let broker = Broker::new();
        let owner = SubscriberId::next();
        broker.subscribe(owner, "chan", |msg: &mut Message| {
            msg.payload.insert("stage", 1);
            Ok(())
        });
        broker.subscribe(owner, "chan", |msg: &mut Message| {
            let stage = msg.payload.get_int("stage")?;
            msg.payload.insert("stage", stage + 1);
            Ok(())
        });

        let mut msg = Message::new();
        broker.publish("chan", &mut msg).unwrap();
        assert_eq!(msg.payload.get_int("stage").unwrap(), 2);
    }

    /// Тест проверяет, что ошибка наблюдателя прерывает рассылку и
    /// возвращается с контекстом.
    #[test]
    fn test_observer_error_aborts_dispatch() {
        let broker = Broker::new();
        let (log, make) = recorder();
        let owner = SubscriberId::next();
        broker.subscribe(owner, "chan", make("first"));
        let failing = broker.subscribe(owner, "chan", |msg: &mut Message| {
            msg.payload.get_str("missing")?;
            Ok(())
        });
        broker.subscribe(owner, "chan", make("third"));

        let err = broker.publish_default("chan").unwrap_err();
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
        assert!(err.is::<PayloadError>());
        assert_eq!(err.status_code(), StatusCode::MissingField);
        assert_eq!(err.contexts().len(), 1);
        let ctx = &err.contexts()[0].message;
        assert!(ctx.contains("observer #1"));
        assert!(ctx.contains(&failing.id().to_string()));
        assert!(ctx.contains("\"chan\""));

        let stats = broker.stats();
        assert_eq!(stats.observer_failures, 1);
        assert_eq!(stats.delivered_count, 1);
    }

    #[test]
    fn test_observer_bail_generic_error() {
        let broker = Broker::new();
        broker.subscribe(SubscriberId::next(), "chan", |_: &mut Message| {
            bail!(StatusCode::ObserverFailed, "device offline");
        });
        let err = broker.publish_default("chan").unwrap_err();
        assert!(err.is::<GenericError>());
        assert_eq!(err.status_code(), StatusCode::ObserverFailed);
    }

    /// Тест проверяет отписку по handle и повторную отписку.
    #[test]
    fn test_unsubscribe_handle() {
        let broker = Broker::new();
        let (log, make) = recorder();
        let owner = SubscriberId::next();
        let a = broker.subscribe(owner, "chan", make("a"));
        broker.subscribe(owner, "chan", make("b"));

        assert!(broker.unsubscribe(&a));
        assert!(!broker.unsubscribe(&a));
        broker.publish_default("chan").unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    /// Тест проверяет, что опустевший канал остаётся в реестре и считается
    /// каналом без слушателей.
    #[test]
    fn test_emptied_channel_counts_as_no_listeners() {
        let broker = Broker::new();
        let sub = broker.subscribe(SubscriberId::next(), "chan", |_: &mut Message| Ok(()));
        broker.unsubscribe(&sub);

        assert!(broker.has_channel("chan"));
        assert_eq!(broker.observer_count("chan"), 0);
        assert_eq!(broker.publish_default("chan").unwrap(), Delivery::NoListeners);
        assert_eq!(broker.stats().no_listener_count, 1);
    }

    #[test]
    fn test_unsubscribe_owner() {
        let broker = Broker::new();
        let me = SubscriberId::next();
        let other = SubscriberId::next();
        broker.subscribe(me, "chan", |_: &mut Message| Ok(()));
        broker.subscribe(me, "chan", |_: &mut Message| Ok(()));
        broker.subscribe(other, "chan", |_: &mut Message| Ok(()));

        assert_eq!(broker.unsubscribe_owner(me, "chan"), 2);
        assert_eq!(broker.unsubscribe_owner(me, "chan"), 0);
        assert_eq!(broker.unsubscribe_owner(me, "unknown"), 0);
        assert_eq!(broker.observer_count("chan"), 1);
    }

    /// Тест проверяет строгую публикацию.
    #[test]
    fn test_publish_strict() {
        let broker = Broker::new();
        let err = broker
            .publish_strict("nobody", &mut Message::new())
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NoSubscribers);
        assert!(err.to_string().contains("nobody is listening"));

        broker.subscribe(SubscriberId::next(), "somebody", |_: &mut Message| Ok(()));
        assert_eq!(broker.publish_strict("somebody", &mut Message::new()).unwrap(), 1);
    }

    /// Тест проверяет, что клоны брокера разделяют реестр и счётчики.
    #[test]
    fn test_clone_shares_state() {
        let broker = Broker::new();
        let clone = broker.clone();
        clone.subscribe(SubscriberId::next(), "shared", |_: &mut Message| Ok(()));
        assert_eq!(broker.observer_count("shared"), 1);
        broker.publish_default("shared").unwrap();
        assert_eq!(clone.stats().publish_count, 1);
    }

    /// Тест проверяет scoped-подписку: снимается при drop, detach оставляет
    /// регистрацию.
    #[test]
    fn test_scoped_subscription() {
        let broker = Broker::new();
        let owner = SubscriberId::next();
        {
            let _guard = broker.subscribe_scoped(owner, "chan", |_: &mut Message| Ok(()));
            assert_eq!(broker.observer_count("chan"), 1);
        }
        assert_eq!(broker.observer_count("chan"), 0);

        let scoped = broker.subscribe_scoped(owner, "chan", |_: &mut Message| Ok(()));
        let sub = scoped.detach();
        assert_eq!(broker.observer_count("chan"), 1);
        assert!(broker.unsubscribe(&sub));

        let scoped = broker.subscribe_scoped(owner, "chan", |_: &mut Message| Ok(()));
        assert!(scoped.unsubscribe());
        assert_eq!(broker.observer_count("chan"), 0);
    }

    #[test]
    fn test_scoped_outlives_broker() {
        let scoped = {
            let broker = Broker::new();
            broker.subscribe_scoped(SubscriberId::next(), "chan", |_: &mut Message| Ok(()))
        };
        assert!(!scoped.unsubscribe());
    }

    /// Тест проверяет clear: каналы и счётчики сбрасываются.
    #[test]
    fn test_clear() {
        let broker = Broker::new();
        let sub = broker.subscribe(SubscriberId::next(), "chan", |_: &mut Message| Ok(()));
        broker.publish_default("chan").unwrap();
        broker.publish_default("other").unwrap();

        broker.clear();
        assert!(broker.channels().is_empty());
        assert_eq!(broker.stats(), BrokerStats::default());
        assert!(!broker.unsubscribe(&sub));
    }

    #[test]
    fn test_channels_listing() {
        let broker = Broker::new();
        let owner = SubscriberId::next();
        broker.subscribe(owner, "deviceDisconnectedNotification", |_: &mut Message| Ok(()));
        broker.subscribe(owner, "deviceConnectedNotification", |_: &mut Message| Ok(()));
        assert_eq!(
            broker.channels(),
            vec!["deviceConnectedNotification", "deviceDisconnectedNotification"]
        );
    }

    #[test]
    fn test_with_config() {
        let config = BrokerConfig {
            no_listener_level: DiagnosticLevel::Off,
            trace_dispatch: true,
        };
        let broker = Broker::with_config(config.clone());
        assert_eq!(broker.config(), &config);
        assert_eq!(broker.publish_default("x").unwrap(), Delivery::NoListeners);
    }
}
