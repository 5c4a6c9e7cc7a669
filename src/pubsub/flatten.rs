use std::fmt;

use serde::ser::{self, Impossible, Serialize};

use postbox_error::PayloadError;

use super::{Payload, Value};

/// Раскладывает плоскую структуру в [`Payload`] напрямую через модель данных
/// serde, без промежуточного JSON.
///
/// Поля `None` и `()` пропускаются. Вложенные структуры, последовательности,
/// байты, целые вне `i64` и нечисловые `f64` (NaN, ±inf) отклоняются с
/// [`PayloadError::Unsupported`].
pub(crate) fn to_payload<T: Serialize + ?Sized>(data: &T) -> Result<Payload, PayloadError> {
    data.serialize(StructSerializer).map_err(|e| e.0)
}

#[derive(Debug)]
struct FlattenError(PayloadError);

fn unsupported(
    key: &str,
    kind: &'static str,
) -> FlattenError {
    FlattenError(PayloadError::Unsupported {
        key: key.to_string(),
        kind,
    })
}

fn not_a_struct() -> FlattenError {
    unsupported("", "non-struct value")
}

impl fmt::Display for FlattenError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for FlattenError {}

impl ser::Error for FlattenError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        FlattenError(PayloadError::Encode {
            reason: msg.to_string(),
        })
    }
}

/// Генерирует методы `Serializer`, которые всегда возвращают `$err`.
macro_rules! reject {
    ($this:ident => $err:expr; $($method:ident($($arg:ty),*) -> $ret:ty;)*) => {
        $(
            fn $method($this, $(_: $arg),*) -> Result<$ret, Self::Error> {
                Err($err)
            }
        )*
    };
}

////////////////////////////////////////////////////////////////////////////////
// Верхний уровень: только структура
////////////////////////////////////////////////////////////////////////////////

struct StructSerializer;

struct FieldCollector {
    payload: Payload,
}

impl ser::Serializer for StructSerializer {
    type Ok = Payload;
    type Error = FlattenError;
    type SerializeSeq = Impossible<Payload, FlattenError>;
    type SerializeTuple = Impossible<Payload, FlattenError>;
    type SerializeTupleStruct = Impossible<Payload, FlattenError>;
    type SerializeTupleVariant = Impossible<Payload, FlattenError>;
    type SerializeMap = Impossible<Payload, FlattenError>;
    type SerializeStruct = FieldCollector;
    type SerializeStructVariant = Impossible<Payload, FlattenError>;

    reject! { self => not_a_struct();
        serialize_bool(bool) -> Payload;
        serialize_i8(i8) -> Payload;
        serialize_i16(i16) -> Payload;
        serialize_i32(i32) -> Payload;
        serialize_i64(i64) -> Payload;
        serialize_u8(u8) -> Payload;
        serialize_u16(u16) -> Payload;
        serialize_u32(u32) -> Payload;
        serialize_u64(u64) -> Payload;
        serialize_f32(f32) -> Payload;
        serialize_f64(f64) -> Payload;
        serialize_char(char) -> Payload;
        serialize_str(&str) -> Payload;
        serialize_bytes(&[u8]) -> Payload;
        serialize_none() -> Payload;
        serialize_unit() -> Payload;
        serialize_unit_struct(&'static str) -> Payload;
        serialize_unit_variant(&'static str, u32, &'static str) -> Payload;
        serialize_seq(Option<usize>) -> Self::SerializeSeq;
        serialize_tuple(usize) -> Self::SerializeTuple;
        serialize_tuple_struct(&'static str, usize) -> Self::SerializeTupleStruct;
        serialize_tuple_variant(&'static str, u32, &'static str, usize) -> Self::SerializeTupleVariant;
        serialize_map(Option<usize>) -> Self::SerializeMap;
        serialize_struct_variant(&'static str, u32, &'static str, usize) -> Self::SerializeStructVariant;
    }

    fn serialize_some<T: Serialize + ?Sized>(
        self,
        value: &T,
    ) -> Result<Payload, FlattenError> {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Payload, FlattenError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Payload, FlattenError> {
        Err(not_a_struct())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<FieldCollector, FlattenError> {
        Ok(FieldCollector {
            payload: Payload::new(),
        })
    }
}

impl ser::SerializeStruct for FieldCollector {
    type Ok = Payload;
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), FlattenError> {
        if let Some(value) = value.serialize(FieldSerializer { key })? {
            self.payload.insert(key, value);
        }
        Ok(())
    }

    fn end(self) -> Result<Payload, FlattenError> {
        Ok(self.payload)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Значение поля: только примитивы
////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy)]
struct FieldSerializer {
    key: &'static str,
}

type NoField = Impossible<Option<Value>, FlattenError>;

impl FieldSerializer {
    fn int<N: TryInto<i64>>(
        self,
        n: N,
    ) -> Result<Option<Value>, FlattenError> {
        n.try_into()
            .map(|n| Some(Value::Int(n)))
            .map_err(|_| unsupported(self.key, "integer out of i64 range"))
    }
}

impl ser::Serializer for FieldSerializer {
    type Ok = Option<Value>;
    type Error = FlattenError;
    type SerializeSeq = NoField;
    type SerializeTuple = NoField;
    type SerializeTupleStruct = NoField;
    type SerializeTupleVariant = NoField;
    type SerializeMap = NoField;
    type SerializeStruct = NoField;
    type SerializeStructVariant = NoField;

    reject! { self => unsupported(self.key, "array");
        serialize_seq(Option<usize>) -> NoField;
        serialize_tuple(usize) -> NoField;
        serialize_tuple_struct(&'static str, usize) -> NoField;
        serialize_tuple_variant(&'static str, u32, &'static str, usize) -> NoField;
    }

    reject! { self => unsupported(self.key, "object");
        serialize_map(Option<usize>) -> NoField;
        serialize_struct(&'static str, usize) -> NoField;
        serialize_struct_variant(&'static str, u32, &'static str, usize) -> NoField;
    }

    fn serialize_bool(
        self,
        v: bool,
    ) -> Result<Option<Value>, FlattenError> {
        Ok(Some(Value::Bool(v)))
    }

    fn serialize_i8(
        self,
        v: i8,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_i16(
        self,
        v: i16,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_i32(
        self,
        v: i32,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_i64(
        self,
        v: i64,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_i128(
        self,
        v: i128,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_u8(
        self,
        v: u8,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_u16(
        self,
        v: u16,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_u32(
        self,
        v: u32,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_u64(
        self,
        v: u64,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_u128(
        self,
        v: u128,
    ) -> Result<Option<Value>, FlattenError> {
        self.int(v)
    }

    fn serialize_f32(
        self,
        v: f32,
    ) -> Result<Option<Value>, FlattenError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(
        self,
        v: f64,
    ) -> Result<Option<Value>, FlattenError> {
        if v.is_finite() {
            Ok(Some(Value::Float(v)))
        } else {
            Err(unsupported(self.key, "non-finite float"))
        }
    }

    fn serialize_char(
        self,
        v: char,
    ) -> Result<Option<Value>, FlattenError> {
        Ok(Some(Value::Str(v.to_string())))
    }

    fn serialize_str(
        self,
        v: &str,
    ) -> Result<Option<Value>, FlattenError> {
        Ok(Some(Value::Str(v.to_string())))
    }

    fn serialize_bytes(
        self,
        _v: &[u8],
    ) -> Result<Option<Value>, FlattenError> {
        Err(unsupported(self.key, "bytes"))
    }

    fn serialize_none(self) -> Result<Option<Value>, FlattenError> {
        Ok(None)
    }

    fn serialize_some<T: Serialize + ?Sized>(
        self,
        value: &T,
    ) -> Result<Option<Value>, FlattenError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Option<Value>, FlattenError> {
        Ok(None)
    }

    fn serialize_unit_struct(
        self,
        _name: &'static str,
    ) -> Result<Option<Value>, FlattenError> {
        Ok(None)
    }

    /// Unit-вариант перечисления кладётся строкой с именем варианта.
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Option<Value>, FlattenError> {
        Ok(Some(Value::Str(variant.to_string())))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Option<Value>, FlattenError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Option<Value>, FlattenError> {
        Err(unsupported(self.key, "object"))
    }
}
