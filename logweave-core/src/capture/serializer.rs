//! A `serde::Serializer` that builds bounded [`Value`]s.
//!
//! Structural destructuring is driven by `Serialize`: types opt into being
//! captured by deriving it. The serializer tracks the current container depth
//! and applies the [`DestructuringLimits`] as it goes, so oversized input is
//! never materialized past the caps.
//!
//! Mapping of serde's data model:
//!
//! - primitives, strings, chars → [`Scalar`]
//! - `Option::None`, `()` → `Null`; unit structs/variants → their name as a string
//! - sequences, tuples, tuple structs, bytes → [`Value::Sequence`] (count cap)
//! - maps → [`Value::Mapping`] (count cap)
//! - structs, struct variants → [`Value::Structure`] tagged with the type/variant name
//! - tuple variants → [`Value::Structure`] with members named `0`, `1`, ...
//! - newtype variants → single-entry [`Value::Mapping`] keyed by the variant name
//!
//! Element-level failures degrade to a placeholder for that element only.

use serde::ser::{self, Serialize};
use thiserror::Error;

use super::DestructuringLimits;
use crate::value::{Property, Scalar, Value};

/// Error raised by a `Serialize` impl during capture.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct CaptureError(String);

impl ser::Error for CaptureError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CaptureError(msg.to_string())
    }
}

/// Placeholder substituted for a value that could not be read.
pub(crate) fn unreadable(what: &str, err: &dyn std::fmt::Display) -> Value {
    Value::string(format!("<unreadable {}: {}>", what, err))
}

/// Serializer producing a [`Value`] at a given container depth.
#[derive(Clone, Copy)]
pub struct ValueSerializer<'a> {
    limits: &'a DestructuringLimits,
    depth: usize,
}

impl<'a> ValueSerializer<'a> {
    pub(crate) fn new(limits: &'a DestructuringLimits, depth: usize) -> Self {
        Self { limits, depth }
    }

    fn child(self) -> Self {
        Self {
            limits: self.limits,
            depth: self.depth + 1,
        }
    }

    /// Whether opening a container here would exceed the depth cap.
    fn at_depth_limit(self) -> bool {
        self.depth >= self.limits.max_depth
    }

    fn capture_child<T: Serialize + ?Sized>(self, value: &T) -> Value {
        value
            .serialize(self.child())
            .unwrap_or_else(|e| unreadable("member", &e))
    }

    fn scalar(self, s: Scalar) -> Result<Value, CaptureError> {
        Ok(Value::Scalar(s))
    }

    fn placeholder(name: Option<&str>) -> Value {
        match name {
            Some(n) => Value::string(n),
            None => Value::null(),
        }
    }

    fn seq(self, skip: Option<Value>) -> SeqCollector<'a> {
        SeqCollector {
            ser: self,
            items: Vec::new(),
            omitted: 0,
            skip,
        }
    }

    fn structure(self, type_tag: &str) -> StructCollector<'a> {
        let skip = self
            .at_depth_limit()
            .then(|| Self::placeholder(Some(type_tag)));
        StructCollector {
            ser: self,
            type_tag: Some(type_tag.to_string()),
            properties: Vec::new(),
            skip,
        }
    }
}

impl<'a> ser::Serializer for ValueSerializer<'a> {
    type Ok = Value;
    type Error = CaptureError;

    type SerializeSeq = SeqCollector<'a>;
    type SerializeTuple = SeqCollector<'a>;
    type SerializeTupleStruct = SeqCollector<'a>;
    type SerializeTupleVariant = StructCollector<'a>;
    type SerializeMap = MapCollector<'a>;
    type SerializeStruct = StructCollector<'a>;
    type SerializeStructVariant = StructCollector<'a>;

    fn serialize_bool(self, v: bool) -> Result<Value, CaptureError> {
        self.scalar(Scalar::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, CaptureError> {
        self.scalar(Scalar::I64(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, CaptureError> {
        self.scalar(Scalar::I64(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, CaptureError> {
        self.scalar(Scalar::I64(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, CaptureError> {
        self.scalar(Scalar::I64(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, CaptureError> {
        match i64::try_from(v) {
            Ok(n) => self.scalar(Scalar::I64(n)),
            Err(_) => self.scalar(Scalar::Str(v.to_string())),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Value, CaptureError> {
        self.scalar(Scalar::U64(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, CaptureError> {
        self.scalar(Scalar::U64(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, CaptureError> {
        self.scalar(Scalar::U64(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, CaptureError> {
        self.scalar(Scalar::U64(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Value, CaptureError> {
        match u64::try_from(v) {
            Ok(n) => self.scalar(Scalar::U64(n)),
            Err(_) => self.scalar(Scalar::Str(v.to_string())),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Value, CaptureError> {
        self.scalar(Scalar::F64(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, CaptureError> {
        self.scalar(Scalar::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, CaptureError> {
        self.scalar(Scalar::Char(v))
    }

    fn serialize_str(self, v: &str) -> Result<Value, CaptureError> {
        self.scalar(Scalar::Str(self.limits.truncate(v)))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, CaptureError> {
        use ser::SerializeSeq as _;
        let mut seq = ser::Serializer::serialize_seq(self, Some(v.len()))?;
        for b in v {
            seq.serialize_element(b)?;
        }
        seq.end()
    }

    fn serialize_none(self) -> Result<Value, CaptureError> {
        self.scalar(Scalar::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, CaptureError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, CaptureError> {
        self.scalar(Scalar::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Value, CaptureError> {
        self.scalar(Scalar::Str(name.to_string()))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, CaptureError> {
        self.scalar(Scalar::Str(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, CaptureError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, CaptureError> {
        if self.at_depth_limit() {
            return Ok(Self::placeholder(Some(variant)));
        }
        Ok(Value::mapping(vec![(
            Value::string(variant),
            self.capture_child(value),
        )]))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<SeqCollector<'a>, CaptureError> {
        let skip = self.at_depth_limit().then(|| Self::placeholder(None));
        Ok(self.seq(skip))
    }

    fn serialize_tuple(self, _len: usize) -> Result<SeqCollector<'a>, CaptureError> {
        let skip = self.at_depth_limit().then(|| Self::placeholder(None));
        Ok(self.seq(skip))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<SeqCollector<'a>, CaptureError> {
        let skip = self.at_depth_limit().then(|| Self::placeholder(Some(name)));
        Ok(self.seq(skip))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<StructCollector<'a>, CaptureError> {
        Ok(self.structure(variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapCollector<'a>, CaptureError> {
        let skip = self.at_depth_limit().then(|| Self::placeholder(None));
        Ok(MapCollector {
            ser: self,
            entries: Vec::new(),
            omitted: 0,
            pending_key: None,
            skipping_entry: false,
            skip,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<StructCollector<'a>, CaptureError> {
        Ok(self.structure(name))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<StructCollector<'a>, CaptureError> {
        Ok(self.structure(variant))
    }
}

/// Collects sequence-like input, honoring the collection count cap.
pub struct SeqCollector<'a> {
    ser: ValueSerializer<'a>,
    items: Vec<Value>,
    omitted: usize,
    skip: Option<Value>,
}

impl SeqCollector<'_> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) {
        if self.skip.is_some() {
            return;
        }
        if self.ser.limits.collection_full(self.items.len()) {
            self.omitted += 1;
            return;
        }
        self.items.push(self.ser.capture_child(value));
    }

    fn finish(self) -> Value {
        match self.skip {
            Some(placeholder) => placeholder,
            None => Value::Sequence {
                items: self.items,
                omitted: self.omitted,
            },
        }
    }
}

impl ser::SerializeSeq for SeqCollector<'_> {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.push(value);
        Ok(())
    }

    fn end(self) -> Result<Value, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqCollector<'_> {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.push(value);
        Ok(())
    }

    fn end(self) -> Result<Value, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqCollector<'_> {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        self.push(value);
        Ok(())
    }

    fn end(self) -> Result<Value, CaptureError> {
        Ok(self.finish())
    }
}

/// Collects map entries, honoring the collection count cap.
pub struct MapCollector<'a> {
    ser: ValueSerializer<'a>,
    entries: Vec<(Value, Value)>,
    omitted: usize,
    pending_key: Option<Value>,
    skipping_entry: bool,
    skip: Option<Value>,
}

impl ser::SerializeMap for MapCollector<'_> {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), CaptureError> {
        if self.skip.is_some() {
            return Ok(());
        }
        if self.ser.limits.collection_full(self.entries.len()) {
            self.omitted += 1;
            self.skipping_entry = true;
            return Ok(());
        }
        self.pending_key = Some(self.ser.capture_child(key));
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        if self.skip.is_some() {
            return Ok(());
        }
        if self.skipping_entry {
            self.skipping_entry = false;
            return Ok(());
        }
        let key = self.pending_key.take().unwrap_or_else(Value::null);
        let value = self.ser.capture_child(value);
        self.entries.push((key, value));
        Ok(())
    }

    fn end(self) -> Result<Value, CaptureError> {
        Ok(match self.skip {
            Some(placeholder) => placeholder,
            None => Value::Mapping {
                entries: self.entries,
                omitted: self.omitted,
            },
        })
    }
}

/// Collects named (or index-named) members into a tagged structure.
pub struct StructCollector<'a> {
    ser: ValueSerializer<'a>,
    type_tag: Option<String>,
    properties: Vec<Property>,
    skip: Option<Value>,
}

impl StructCollector<'_> {
    fn push<T: Serialize + ?Sized>(&mut self, name: String, value: &T) {
        if self.skip.is_some() {
            return;
        }
        let value = self.ser.capture_child(value);
        self.properties.push(Property { name, value });
    }

    fn finish(self) -> Value {
        match self.skip {
            Some(placeholder) => placeholder,
            None => Value::Structure {
                type_tag: self.type_tag,
                properties: self.properties,
            },
        }
    }
}

impl ser::SerializeStruct for StructCollector<'_> {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CaptureError> {
        self.push(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Value, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for StructCollector<'_> {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CaptureError> {
        self.push(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Value, CaptureError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for StructCollector<'_> {
    type Ok = Value;
    type Error = CaptureError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CaptureError> {
        let name = self.properties.len().to_string();
        self.push(name, value);
        Ok(())
    }

    fn end(self) -> Result<Value, CaptureError> {
        Ok(self.finish())
    }
}
