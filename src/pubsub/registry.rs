use std::{fmt, sync::Arc};

use dashmap::DashMap;

use postbox_error::PostboxResult;

use super::{intern_channel, Message, SubscriberId, SubscriptionId};

/// Результат вызова наблюдателя.
///
/// `Err` прерывает оставшуюся рассылку и возвращается из `publish`.
pub type ObserverResult = PostboxResult<()>;

pub(crate) type Callback = Box<dyn Fn(&mut Message) -> ObserverResult + Send + Sync>;

/// Одна регистрация наблюдателя на канале.
pub(crate) struct Registration {
    pub(crate) id: SubscriptionId,
    pub(crate) owner: SubscriberId,
    pub(crate) callback: Callback,
}

/// Реестр канал → упорядоченный список регистраций.
///
/// Запись канала создаётся при первой подписке и не удаляется при отписке:
/// канал с нулём наблюдателей продолжает существовать до `clear()`.
#[derive(Default)]
pub(crate) struct Registry {
    channels: DashMap<Arc<str>, Vec<Arc<Registration>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Добавляет регистрацию в конец списка канала и возвращает ключ канала.
    pub(crate) fn insert(
        &self,
        channel: &str,
        registration: Registration,
    ) -> Arc<str> {
        let key = intern_channel(channel);
        self.channels
            .entry(key.clone())
            .or_default()
            .push(Arc::new(registration));
        key
    }

    /// Удаляет регистрацию по идентификатору.
    ///
    /// Колбэк может владеть другими подписками (например,
    /// [`ScopedSubscription`](super::ScopedSubscription)), чей `Drop` снова
    /// заходит в реестр. Поэтому удалённая регистрация уничтожается только
    /// после освобождения блокировки шарда.
    pub(crate) fn remove(
        &self,
        channel: &str,
        id: SubscriptionId,
    ) -> bool {
        let Some(mut observers) = self.channels.get_mut(channel) else {
            return false;
        };
        let removed = observers
            .iter()
            .position(|r| r.id == id)
            .map(|pos| observers.remove(pos));
        drop(observers);

        removed.is_some()
    }

    /// Удаляет все регистрации владельца на канале, возвращает их число.
    ///
    /// Как и в [`Registry::remove`], удалённые регистрации уничтожаются вне
    /// блокировки шарда.
    pub(crate) fn remove_owner(
        &self,
        channel: &str,
        owner: SubscriberId,
    ) -> usize {
        let Some(mut observers) = self.channels.get_mut(channel) else {
            return 0;
        };
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *observers)
            .into_iter()
            .partition(|r| r.owner == owner);
        *observers = kept;
        drop(observers);

        removed.len()
    }

    /// Ключ канала и копия текущего списка его наблюдателей.
    ///
    /// `None` для канала, на который никто никогда не подписывался.
    /// Блокировка шарда держится только на время клонирования `Vec`, поэтому
    /// наблюдатели могут свободно менять реестр во время рассылки.
    pub(crate) fn lookup(
        &self,
        channel: &str,
    ) -> Option<(Arc<str>, Vec<Arc<Registration>>)> {
        self.channels
            .get(channel)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
    }

    pub(crate) fn contains(
        &self,
        channel: &str,
    ) -> bool {
        self.channels.contains_key(channel)
    }

    pub(crate) fn observer_count(
        &self,
        channel: &str,
    ) -> usize {
        self.channels
            .get(channel)
            .map(|observers| observers.len())
            .unwrap_or(0)
    }

    /// Имена всех известных каналов (в том числе пустых), отсортированные.
    pub(crate) fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .channels
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// Удаляет все каналы.
    ///
    /// Каналы снимаются по одному: `DashMap::clear` уничтожал бы
    /// регистрации под блокировкой шарда.
    pub(crate) fn clear(&self) {
        let keys: Vec<Arc<str>> = self
            .channels
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for key in keys {
            let removed = self.channels.remove(&key);
            drop(removed);
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Registry")
            .field("channels", &self.channels.len())
            .finish()
    }
}
