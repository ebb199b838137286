//! Query parameter flattening.
//!
//! Unique responsibility: turn a caller-defined struct into a flat
//! `name -> value` map suitable for a request query string.
//!
//! The struct is walked through its `Serialize` impl:
//! - the serialized field name is the query parameter name
//!   (`#[serde(rename = "...")]` to change it, `#[serde(skip)]` to hide a field),
//! - fields holding their zero value are omitted before anything else is
//!   checked (`""`, `0`, `0.0`, `false`, `None`, empty collections, structs
//!   whose fields are all zero),
//! - `Some(v)` is never zero and is unwrapped once, so `Some(0)` or
//!   `Some(false)` is sent,
//! - strings, integers, booleans and unit enum variants are stringified,
//!   any other non-zero field is rejected.

use std::collections::HashMap;

use serde::ser::{self, Impossible, Serialize};

use crate::linode_error::{Error, Result};

/// Flatten a struct (or `Option`/newtype around one) into query parameters.
///
/// # Errors
///
/// - `Error::InvalidInput` if `value` is `None` or not a struct.
/// - `Error::UnsupportedType` if a field cannot be stringified.
pub fn flatten_query_struct<T>(value: &T) -> Result<HashMap<String, String>>
where
    T: Serialize + ?Sized,
{
    value.serialize(QueryStructSerializer)
}

fn not_a_struct(kind: &str) -> Error {
    Error::InvalidInput(format!(
        "expected struct type for the query params but got: {kind}"
    ))
}

/// Accepts exactly one struct at the top level.
struct QueryStructSerializer;

impl ser::Serializer for QueryStructSerializer {
    type Ok = HashMap<String, String>;
    type Error = Error;

    type SerializeSeq = Impossible<Self::Ok, Error>;
    type SerializeTuple = Impossible<Self::Ok, Error>;
    type SerializeTupleStruct = Impossible<Self::Ok, Error>;
    type SerializeTupleVariant = Impossible<Self::Ok, Error>;
    type SerializeMap = Impossible<Self::Ok, Error>;
    type SerializeStruct = QueryFields;
    type SerializeStructVariant = Impossible<Self::Ok, Error>;

    fn serialize_bool(self, _v: bool) -> Result<Self::Ok> {
        Err(not_a_struct("bool"))
    }

    fn serialize_i8(self, _v: i8) -> Result<Self::Ok> {
        Err(not_a_struct("int"))
    }

    fn serialize_i16(self, _v: i16) -> Result<Self::Ok> {
        Err(not_a_struct("int"))
    }

    fn serialize_i32(self, _v: i32) -> Result<Self::Ok> {
        Err(not_a_struct("int"))
    }

    fn serialize_i64(self, _v: i64) -> Result<Self::Ok> {
        Err(not_a_struct("int"))
    }

    fn serialize_u8(self, _v: u8) -> Result<Self::Ok> {
        Err(not_a_struct("uint"))
    }

    fn serialize_u16(self, _v: u16) -> Result<Self::Ok> {
        Err(not_a_struct("uint"))
    }

    fn serialize_u32(self, _v: u32) -> Result<Self::Ok> {
        Err(not_a_struct("uint"))
    }

    fn serialize_u64(self, _v: u64) -> Result<Self::Ok> {
        Err(not_a_struct("uint"))
    }

    fn serialize_f32(self, _v: f32) -> Result<Self::Ok> {
        Err(not_a_struct("float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<Self::Ok> {
        Err(not_a_struct("float"))
    }

    fn serialize_char(self, _v: char) -> Result<Self::Ok> {
        Err(not_a_struct("char"))
    }

    fn serialize_str(self, _v: &str) -> Result<Self::Ok> {
        Err(not_a_struct("string"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok> {
        Err(not_a_struct("bytes"))
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        Err(Error::InvalidInput("query params is None".to_string()))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        Err(not_a_struct("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        Ok(HashMap::new())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<Self::Ok> {
        Err(not_a_struct("enum"))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        Err(not_a_struct("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_a_struct("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_a_struct("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_a_struct("tuple"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_a_struct("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(not_a_struct("map"))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        Ok(QueryFields {
            params: HashMap::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_a_struct("enum"))
    }
}

/// Collects the rendered fields of the top-level struct.
struct QueryFields {
    params: HashMap<String, String>,
}

impl ser::SerializeStruct for QueryFields {
    type Ok = HashMap<String, String>;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        if value.serialize(ZeroCheck)? {
            return Ok(());
        }
        let rendered = value.serialize(QueryFieldSerializer {
            field: key,
            dereferenced: false,
        })?;
        self.params.insert(key.to_string(), rendered);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(self.params)
    }
}

// ============================================================================
// Zero values
// ============================================================================

/// Reports whether a value is its type's zero value.
///
/// Scalars compare against their default, `None` and unit are zero, `Some`
/// never is. Sequences and maps are zero when empty, structs and tuples when
/// every field is zero. Enum variants are never zero.
struct ZeroCheck;

impl ser::Serializer for ZeroCheck {
    type Ok = bool;
    type Error = Error;

    type SerializeSeq = ZeroCompound;
    type SerializeTuple = ZeroCompound;
    type SerializeTupleStruct = ZeroCompound;
    type SerializeTupleVariant = ZeroCompound;
    type SerializeMap = ZeroCompound;
    type SerializeStruct = ZeroCompound;
    type SerializeStructVariant = ZeroCompound;

    fn serialize_bool(self, v: bool) -> Result<bool> {
        Ok(!v)
    }

    fn serialize_i8(self, v: i8) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_i16(self, v: i16) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_i32(self, v: i32) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_i64(self, v: i64) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_i128(self, v: i128) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_u8(self, v: u8) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_u16(self, v: u16) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_u32(self, v: u32) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_u64(self, v: u64) -> Result<bool> {
        Ok(v == 0)
    }

    fn serialize_u128(self, v: u128) -> Result<bool> {
        Ok(v == 0)
    }

    // Positive zero only; `-0.0` is a value.
    fn serialize_f32(self, v: f32) -> Result<bool> {
        Ok(v.to_bits() == 0)
    }

    fn serialize_f64(self, v: f64) -> Result<bool> {
        Ok(v.to_bits() == 0)
    }

    fn serialize_char(self, v: char) -> Result<bool> {
        Ok(v == '\0')
    }

    fn serialize_str(self, v: &str) -> Result<bool> {
        Ok(v.is_empty())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<bool> {
        Ok(v.is_empty())
    }

    fn serialize_none(self) -> Result<bool> {
        Ok(true)
    }

    fn serialize_some<T>(self, _value: &T) -> Result<bool>
    where
        T: ?Sized + Serialize,
    {
        Ok(false)
    }

    fn serialize_unit(self) -> Result<bool> {
        Ok(true)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<bool> {
        Ok(true)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<bool> {
        Ok(false)
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<bool>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<bool>
    where
        T: ?Sized + Serialize,
    {
        Ok(false)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<ZeroCompound> {
        Ok(ZeroCompound::empty())
    }

    fn serialize_tuple(self, _len: usize) -> Result<ZeroCompound> {
        Ok(ZeroCompound::fields())
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<ZeroCompound> {
        Ok(ZeroCompound::fields())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<ZeroCompound> {
        Ok(ZeroCompound::variant())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<ZeroCompound> {
        Ok(ZeroCompound::empty())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<ZeroCompound> {
        Ok(ZeroCompound::fields())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<ZeroCompound> {
        Ok(ZeroCompound::variant())
    }
}

/// How a compound value decides whether it is zero.
#[derive(Clone, Copy)]
enum ZeroRule {
    /// Zero when it has no elements (sequences, maps).
    Empty,
    /// Zero when every element is zero (structs, tuples).
    AllFieldsZero,
    /// Never zero (enum variants carrying data).
    Never,
}

struct ZeroCompound {
    rule: ZeroRule,
    zero: bool,
}

impl ZeroCompound {
    const fn empty() -> Self {
        Self {
            rule: ZeroRule::Empty,
            zero: true,
        }
    }

    const fn fields() -> Self {
        Self {
            rule: ZeroRule::AllFieldsZero,
            zero: true,
        }
    }

    const fn variant() -> Self {
        Self {
            rule: ZeroRule::Never,
            zero: false,
        }
    }

    fn element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match self.rule {
            ZeroRule::Empty => self.zero = false,
            ZeroRule::AllFieldsZero => {
                if self.zero {
                    self.zero = value.serialize(ZeroCheck)?;
                }
            }
            ZeroRule::Never => {}
        }
        Ok(())
    }
}

impl ser::SerializeSeq for ZeroCompound {
    type Ok = bool;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<bool> {
        Ok(self.zero)
    }
}

impl ser::SerializeTuple for ZeroCompound {
    type Ok = bool;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<bool> {
        Ok(self.zero)
    }
}

impl ser::SerializeTupleStruct for ZeroCompound {
    type Ok = bool;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<bool> {
        Ok(self.zero)
    }
}

impl ser::SerializeTupleVariant for ZeroCompound {
    type Ok = bool;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<bool> {
        Ok(self.zero)
    }
}

impl ser::SerializeMap for ZeroCompound {
    type Ok = bool;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(key)
    }

    fn serialize_value<T>(&mut self, _value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        Ok(())
    }

    fn end(self) -> Result<bool> {
        Ok(self.zero)
    }
}

impl ser::SerializeStruct for ZeroCompound {
    type Ok = bool;
    type Error = Error;

    fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<()> {
        Ok(())
    }

    fn end(self) -> Result<bool> {
        Ok(self.zero)
    }
}

impl ser::SerializeStructVariant for ZeroCompound {
    type Ok = bool;
    type Error = Error;

    fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<bool> {
        Ok(self.zero)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders one non-zero field.
#[derive(Clone, Copy)]
struct QueryFieldSerializer {
    field: &'static str,
    /// Set once an `Option` has been unwrapped; a second level is rejected.
    dereferenced: bool,
}

impl QueryFieldSerializer {
    const fn unsupported(self, type_name: &'static str) -> Error {
        Error::UnsupportedType {
            field: self.field,
            type_name,
        }
    }
}

impl ser::Serializer for QueryFieldSerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = Impossible<Self::Ok, Error>;
    type SerializeTuple = Impossible<Self::Ok, Error>;
    type SerializeTupleStruct = Impossible<Self::Ok, Error>;
    type SerializeTupleVariant = Impossible<Self::Ok, Error>;
    type SerializeMap = Impossible<Self::Ok, Error>;
    type SerializeStruct = Impossible<Self::Ok, Error>;
    type SerializeStructVariant = Impossible<Self::Ok, Error>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<Self::Ok> {
        Err(self.unsupported("f32"))
    }

    fn serialize_f64(self, _v: f64) -> Result<Self::Ok> {
        Err(self.unsupported("f64"))
    }

    fn serialize_char(self, _v: char) -> Result<Self::Ok> {
        Err(self.unsupported("char"))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok> {
        Err(self.unsupported("bytes"))
    }

    // Only reachable as `Some(None)`.
    fn serialize_none(self) -> Result<Self::Ok> {
        Err(self.unsupported("option"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        if self.dereferenced {
            return Err(self.unsupported("option"));
        }
        value.serialize(Self {
            dereferenced: true,
            ..self
        })
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        Err(self.unsupported("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        Err(self.unsupported("unit"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        Err(self.unsupported("enum"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(self.unsupported("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(self.unsupported("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(self.unsupported("tuple"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(self.unsupported("enum"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(self.unsupported("map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(self.unsupported("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(self.unsupported("enum"))
    }
}
