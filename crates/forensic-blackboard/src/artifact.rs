//! Registros del blackboard: `Artifact` (un hallazgo sobre un objeto) y
//! `Attribute` (un valor tipado asociado a un artifact).

use serde::{Deserialize, Serialize};

/// Tag que indica cuál de los campos de valor de un `Attribute` es el
/// activo. Es la única autoridad; los demás campos se ignoran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ValueType {
    String = 0,
    Int32 = 1,
    Int64 = 2,
    Bytes = 3,
    Double = 4,
}

impl ValueType {
    pub fn code(self) -> i32 { self as i32 }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::String),
            1 => Some(Self::Int32),
            2 => Some(Self::Int64),
            3 => Some(Self::Bytes),
            4 => Some(Self::Double),
            _ => None,
        }
    }
}

/// Valor activo de un atributo, resuelto a partir de su `ValueType`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue<'a> {
    String(&'a str),
    Int32(i32),
    Int64(i64),
    Bytes(&'a [u8]),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: i64,
    pub object_id: i64,
    pub artifact_type_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub artifact_id: i64,
    pub attribute_type_id: i32,
    pub object_id: i64,
    /// Módulo que produjo el valor.
    pub module_name: String,
    pub context: String,
    pub value_type: ValueType,
    pub value_int32: i32,
    pub value_int64: i64,
    pub value_double: f64,
    pub value_string: String,
    pub value_bytes: Vec<u8>,
}

impl Attribute {
    /// Atributo "vacío" de un tipo dado; los setters `with_*` fijan el valor
    /// y el tag a la vez.
    pub fn new(attribute_type_id: i32, module_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self { artifact_id: 0,
               attribute_type_id,
               object_id: 0,
               module_name: module_name.into(),
               context: context.into(),
               value_type: ValueType::String,
               value_int32: 0,
               value_int64: 0,
               value_double: 0.0,
               value_string: String::new(),
               value_bytes: Vec::new() }
    }

    pub fn with_string(mut self, v: impl Into<String>) -> Self {
        self.value_type = ValueType::String;
        self.value_string = v.into();
        self
    }

    pub fn with_int32(mut self, v: i32) -> Self {
        self.value_type = ValueType::Int32;
        self.value_int32 = v;
        self
    }

    pub fn with_int64(mut self, v: i64) -> Self {
        self.value_type = ValueType::Int64;
        self.value_int64 = v;
        self
    }

    pub fn with_double(mut self, v: f64) -> Self {
        self.value_type = ValueType::Double;
        self.value_double = v;
        self
    }

    pub fn with_bytes(mut self, v: impl Into<Vec<u8>>) -> Self {
        self.value_type = ValueType::Bytes;
        self.value_bytes = v.into();
        self
    }

    pub fn value(&self) -> AttributeValue<'_> {
        match self.value_type {
            ValueType::String => AttributeValue::String(&self.value_string),
            ValueType::Int32 => AttributeValue::Int32(self.value_int32),
            ValueType::Int64 => AttributeValue::Int64(self.value_int64),
            ValueType::Bytes => AttributeValue::Bytes(&self.value_bytes),
            ValueType::Double => AttributeValue::Double(self.value_double),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_follows_tag_not_fields() {
        let mut a = Attribute::new(3, "m", "").with_string("hello");
        a.value_int32 = 99;
        assert_eq!(a.value(), AttributeValue::String("hello"));
        let a = a.with_int32(7);
        assert_eq!(a.value(), AttributeValue::Int32(7));
        // el string anterior sigue ahí, pero ya no es el valor activo
        assert_eq!(a.value_string, "hello");
    }

    #[test]
    fn value_type_codes() {
        for vt in [ValueType::String, ValueType::Int32, ValueType::Int64, ValueType::Bytes, ValueType::Double] {
            assert_eq!(ValueType::from_code(vt.code()), Some(vt));
        }
        assert_eq!(ValueType::from_code(9), None);
    }
}
