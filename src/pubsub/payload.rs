use std::{
    collections::{btree_map, BTreeMap},
    fmt,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

use postbox_error::PayloadError;

use super::flatten;

/// Примитивное значение в payload сообщения.
///
/// Вложенные объекты и массивы намеренно не поддерживаются: payload — это
/// плоская карта строка → примитив.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Плоская карта ключ → [`Value`], прикрепляемая к сообщению без
/// объявления собственного типа.
///
/// Ключи упорядочены лексикографически.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload {
    fields: BTreeMap<String, Value>,
}

impl Value {
    /// Имя вида значения (для сообщений об ошибках).
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Возвращает число с плавающей точкой; целые расширяются до `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_json(
        self,
        key: &str,
    ) -> Result<JsonValue, PayloadError> {
        Ok(match self {
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Int(n) => JsonValue::Number(n.into()),
            Value::Float(f) => {
                JsonValue::Number(Number::from_f64(f).ok_or_else(|| {
                    PayloadError::Unsupported {
                        key: key.to_string(),
                        kind: "non-finite float",
                    }
                })?)
            }
            Value::Str(s) => JsonValue::String(s),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(<$target>::from(v))
                }
            }
        )*
    };
}

impl_value_from!(
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => Str as String,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-вариант [`Payload::insert`].
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.insert(key, value);
        self
    }

    /// Кладёт значение, возвращая предыдущее (если было).
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(
        &mut self,
        key: &str,
    ) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    pub fn remove(
        &mut self,
        key: &str,
    ) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Значение по ключу, которое обязано присутствовать.
    pub fn require(
        &self,
        key: &str,
    ) -> Result<&Value, PayloadError> {
        self.fields
            .get(key)
            .ok_or_else(|| PayloadError::MissingField {
                key: key.to_string(),
            })
    }

    pub fn get_str(
        &self,
        key: &str,
    ) -> Result<&str, PayloadError> {
        let value = self.require(key)?;
        value
            .as_str()
            .ok_or_else(|| mismatch(key, "string", value))
    }

    pub fn get_int(
        &self,
        key: &str,
    ) -> Result<i64, PayloadError> {
        let value = self.require(key)?;
        value.as_int().ok_or_else(|| mismatch(key, "int", value))
    }

    pub fn get_float(
        &self,
        key: &str,
    ) -> Result<f64, PayloadError> {
        let value = self.require(key)?;
        value.as_float().ok_or_else(|| mismatch(key, "float", value))
    }

    pub fn get_bool(
        &self,
        key: &str,
    ) -> Result<bool, PayloadError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| mismatch(key, "bool", value))
    }

    /// Собирает payload из плоской сериализуемой структуры.
    ///
    /// Поля со значением `None` пропускаются; вложенные структуры, массивы,
    /// целые за пределами `i64` и NaN/бесконечности отклоняются с
    /// [`PayloadError::Unsupported`].
    pub fn from_data<T: Serialize + ?Sized>(data: &T) -> Result<Self, PayloadError> {
        flatten::to_payload(data)
    }

    /// Разбирает payload в типизированную структуру.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| Ok((k.clone(), v.clone().into_json(k)?)))
            .collect::<Result<Map<String, JsonValue>, PayloadError>>()?;
        serde_json::from_value(JsonValue::Object(map)).map_err(|e| PayloadError::Decode {
            reason: e.to_string(),
        })
    }
}

fn mismatch(
    key: &str,
    expected: &'static str,
    found: &Value,
) -> PayloadError {
    PayloadError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Payload {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
