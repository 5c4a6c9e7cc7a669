use std::{
    any::{type_name, Any},
    fmt,
    sync::Arc,
};

use serde::{de::DeserializeOwned, Serialize};

use postbox_error::PayloadError;

use super::{intern_channel, Payload, Value};

/// Сообщение, передаваемое наблюдателям канала.
///
/// Поле `channel` проставляет брокер при публикации: любое значение,
/// выставленное издателем, перезаписывается. Все наблюдатели одной публикации
/// получают один и тот же `&mut Message`, поэтому изменения payload видны
/// следующим по порядку наблюдателям.
#[derive(Clone)]
pub struct Message {
    /// Канал, на который сообщение было опубликовано.
    pub channel: Arc<str>,
    /// Плоская карта данных.
    pub payload: Payload,
    extension: Option<Arc<dyn Any + Send + Sync>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Message {
    /// Сообщение без данных.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: Payload) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    /// Сообщение, payload которого собран из плоской структуры.
    pub fn from_data<T: Serialize + ?Sized>(data: &T) -> Result<Self, PayloadError> {
        Ok(Self::with_payload(Payload::from_data(data)?))
    }

    /// Builder: добавить поле в payload.
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.payload.insert(key, value);
        self
    }

    /// Builder: прикрепить типизированное расширение.
    ///
    /// Расширение заменяет собой собственный подтип сообщения: издатель кладёт
    /// любую `'static` структуру, наблюдатель достаёт её через
    /// [`Message::extension`].
    pub fn with_extension<T: Any + Send + Sync>(
        mut self,
        ext: T,
    ) -> Self {
        self.extension = Some(Arc::new(ext));
        self
    }

    pub fn set_extension<T: Any + Send + Sync>(
        &mut self,
        ext: T,
    ) {
        self.extension = Some(Arc::new(ext));
    }

    pub fn has_extension(&self) -> bool {
        self.extension.is_some()
    }

    /// Проверенный доступ к расширению.
    ///
    /// # Ошибки
    /// - [`PayloadError::NoExtension`], если расширения нет;
    /// - [`PayloadError::ExtensionMismatch`], если оно другого типа.
    pub fn extension<T: Any + Send + Sync>(&self) -> Result<&T, PayloadError> {
        self.extension
            .as_deref()
            .ok_or(PayloadError::NoExtension)?
            .downcast_ref::<T>()
            .ok_or(PayloadError::ExtensionMismatch {
                expected: type_name::<T>(),
            })
    }

    /// Разбирает payload в типизированную структуру.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        self.payload.decode()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Проставляет канал публикации.
    ///
    /// `key` это ключ канала из реестра, если канал известен. Неизвестные
    /// имена не попадают в пул интернирования.
    pub(crate) fn stamp(
        &mut self,
        channel: &str,
        key: Option<Arc<str>>,
    ) {
        if &*self.channel != channel {
            self.channel = key.unwrap_or_else(|| Arc::from(channel));
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self {
            channel: intern_channel(""),
            payload: Payload::default(),
            extension: None,
        }
    }
}

impl From<Payload> for Message {
    fn from(payload: Payload) -> Self {
        Self::with_payload(payload)
    }
}

impl fmt::Debug for Message {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Message")
            .field("channel", &self.channel)
            .field("payload", &self.payload)
            .field("has_extension", &self.extension.is_some())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
