use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

/// Пул имён каналов: одинаковые идентификаторы разделяют один `Arc<str>`
/// во всех брокерах процесса.
static CHANNEL_INTERN: Lazy<DashMap<Arc<str>, ()>> = Lazy::new(DashMap::new);

/// Возвращает interned `Arc<str>` для имени канала.
///
/// Повторный вызов с тем же текстом возвращает тот же указатель. Гонка двух
/// потоков на новом имени разрешается через `entry`, поэтому в пул попадает
/// ровно один `Arc`.
#[inline]
pub(crate) fn intern_channel(channel: &str) -> Arc<str> {
    if let Some(existing) = CHANNEL_INTERN.get(channel) {
        return existing.key().clone();
    }
    CHANNEL_INTERN
        .entry(Arc::from(channel))
        .or_insert(())
        .key()
        .clone()
}

#[cfg(test)]
pub(crate) fn is_interned(channel: &str) -> bool {
    CHANNEL_INTERN.contains_key(channel)
}
