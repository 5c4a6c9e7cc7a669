use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use super::registry::Registry;

static NEXT_SUBSCRIBER: AtomicU64 = AtomicU64::new(1);
static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Непрозрачная метка владельца подписки.
///
/// Брокер никогда не разыменовывает её: метка нужна только для сравнения в
/// [`Broker::unsubscribe_owner`](super::Broker::unsubscribe_owner). Одному
/// компоненту обычно соответствует одна метка на всё время жизни.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Уникальный идентификатор одной регистрации наблюдателя.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Handle, возвращаемый `subscribe`.
///
/// Сам по себе ничего не держит: регистрация живёт, пока её явно не удалят
/// через [`Broker::unsubscribe`](super::Broker::unsubscribe) или
/// [`Broker::unsubscribe_owner`](super::Broker::unsubscribe_owner).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: SubscriptionId,
    owner: SubscriberId,
    channel: Arc<str>,
}

/// Подписка, которая снимается автоматически при `Drop`.
///
/// Держит только слабую ссылку на реестр: если брокер уже уничтожен,
/// `Drop` ничего не делает.
#[must_use = "dropping a ScopedSubscription unsubscribes immediately"]
pub struct ScopedSubscription {
    inner: Subscription,
    registry: Weak<Registry>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SubscriberId {
    /// Новая уникальная метка из глобального счётчика процесса.
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIBER.fetch_add(1, Ordering::Relaxed))
    }

    /// Метка из произвольного числа.
    ///
    /// Пространство значений общее с [`SubscriberId::next`]; смешивать оба
    /// способа в одном брокере не стоит.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Метка по адресу объекта: повторяет модель «подписчик = объект».
    ///
    /// Адрес используется только как число и никогда не разыменовывается.
    pub fn of<T: ?Sized>(object: &T) -> Self {
        Self(object as *const T as *const () as usize as u64)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        owner: SubscriberId,
        channel: Arc<str>,
    ) -> Self {
        Self { id, owner, channel }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn owner(&self) -> SubscriberId {
        self.owner
    }

    /// Канал, на который оформлена подписка.
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl ScopedSubscription {
    pub(crate) fn new(
        subscription: Subscription,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            inner: subscription,
            registry,
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.inner
    }

    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }

    /// Явная отписка. Возвращает `true`, если регистрация ещё существовала.
    pub fn unsubscribe(mut self) -> bool {
        self.release()
    }

    /// Отвязывает handle от `Drop`: регистрация остаётся в брокере, снять её
    /// можно через возвращённую [`Subscription`].
    pub fn detach(mut self) -> Subscription {
        self.registry = Weak::new();
        self.inner.clone()
    }

    fn release(&mut self) -> bool {
        let Some(registry) = std::mem::take(&mut self.registry).upgrade() else {
            return false;
        };
        let removed = registry.remove(&self.inner.channel, self.inner.id);
        tracing::debug!(
            channel = %self.inner.channel,
            subscription = %self.inner.id,
            removed,
            "scoped subscription released"
        );
        removed
    }
}

impl Drop for ScopedSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for SubscriberId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "subscriber#{}", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

impl fmt::Debug for ScopedSubscription {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ScopedSubscription")
            .field("subscription", &self.inner)
            .field("broker_alive", &(self.registry.strong_count() > 0))
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
