use crate::{
    error::{Error, Result},
    types::{Eip712ArrayLevel, Eip712FieldType, Eip712FieldValue, Eip712StructDefinitions},
    utils::*,
};

use alloc::{
    borrow::ToOwned,
    boxed::Box,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use alloy_primitives::hex;
use serde_json::{Number, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSchema {
    // primitive type (uint256, address...), never a custom type
    Primitive(Eip712FieldType),
    Array {
        item: Box<TypeSchema>,
        level: Eip712ArrayLevel,
    },
    // Struct name(Person) and its fields
    Struct { name: String, fields: Vec<Field> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    // the field name, eg: from, not type
    pub name: String,
    pub ty: TypeSchema,
}

/// Expand `type_name` into a schema tree. The definitions must have gone
/// through [`crate::types::validate_struct_defs`], recursion follows the type
/// graph.
pub fn build_schema(struct_defs: &Eip712StructDefinitions, type_name: &str) -> Result<TypeSchema> {
    let field_defs = struct_defs
        .get(type_name)
        .ok_or_else(|| Error::schema(format!("unknown type {}", type_name)))?;

    let mut fields = Vec::new();

    for fd in field_defs.iter() {
        let mut ty = match fd.field_type.custom_type_name() {
            Some(custom_type_name) => build_schema(struct_defs, custom_type_name)?,
            None => TypeSchema::Primitive(fd.field_type.clone()),
        };
        for level in &fd.array_levels {
            ty = TypeSchema::Array {
                item: Box::new(ty),
                level: level.clone(),
            };
        }

        fields.push(Field {
            name: fd.name.clone(),
            ty,
        });
    }

    Ok(TypeSchema::Struct {
        name: type_name.to_owned(),
        fields,
    })
}

/// Fetch the elements of an array value, checking fixed sizes
pub(crate) fn array_items<'a>(level: &Eip712ArrayLevel, value: &'a Value) -> Result<&'a [Value]> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::schema(format!("expected array, got {}", value)))?;
    if let Some(size) = level.size() {
        if items.len() != size as usize {
            return Err(Error::schema(format!(
                "expected {} array items, got {}",
                size,
                items.len()
            )));
        }
    }
    Ok(items)
}

/// Fetch the value of a struct member, all members are mandatory
pub(crate) fn struct_member<'a>(struct_name: &str, field: &Field, value: &'a Value) -> Result<&'a Value> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::schema(format!("expected {} object, got {}", struct_name, value)))?;
    obj.get(&field.name)
        .ok_or_else(|| Error::schema(format!("{} is missing field {}", struct_name, field.name)))
}

/// Serialize a JSON value into the ordered item stream the device consumes:
/// one item per primitive, one length item before every array.
pub fn encode_stream(schema: &TypeSchema, value: &Value, out: &mut Vec<Eip712FieldValue>) -> Result<()> {
    match schema {
        TypeSchema::Primitive(ty) => out.push(Eip712FieldValue::from_json(ty, value)?),
        TypeSchema::Array { item, level } => {
            let items = array_items(level, value)?;
            out.push(Eip712FieldValue::from_len(items.len()).map_err(Error::schema)?);
            for v in items {
                encode_stream(item, v, out)?;
            }
        }
        TypeSchema::Struct { name, fields } => {
            for f in fields {
                encode_stream(&f.ty, struct_member(name, f, value)?, out)?;
            }
        }
    }
    Ok(())
}

// from type schema and raw data build serde_json::Value
pub fn build_value(
    schema: &TypeSchema,
    data: &mut impl Iterator<Item = Vec<u8>>,
) -> core::result::Result<Value, String> {
    let res = match schema {
        TypeSchema::Primitive(ty) => {
            let raw = data.next().ok_or("build value data.next failed")?;
            match ty {
                Eip712FieldType::Bool => Value::Bool(raw.first() == Some(&1)),
                Eip712FieldType::Int(size) => {
                    if raw.len() > *size as usize {
                        return Err("invalid int len".to_string());
                    }
                    let val = parse_i256(&raw).map_err(|err| err.to_string())?;
                    Value::String(val.to_string())
                }
                Eip712FieldType::Uint(size) => {
                    if raw.len() > *size as usize {
                        return Err("invalid uint len".to_string());
                    }
                    if raw.len() <= 8 {
                        let val = parse_u64(&raw).map_err(|err| err.to_string())?;
                        Value::Number(Number::from(val))
                    } else {
                        let val = parse_u256(&raw).map_err(|err| err.to_string())?;
                        Value::String(format!("{:#x}", val))
                    }
                }
                Eip712FieldType::FixedBytes(size) => {
                    if raw.len() != *size as usize {
                        return Err("invalid bytes len".to_string());
                    }
                    Value::String(format!("0x{}", hex::encode(&raw)))
                }
                Eip712FieldType::DynamicBytes => Value::String(format!("0x{}", hex::encode(&raw))),
                Eip712FieldType::String => {
                    let val = parse_utf8_string(&raw).map_err(|err| err.to_string())?;
                    Value::String(val)
                }
                Eip712FieldType::Address => {
                    if raw.len() != 20 {
                        return Err("invalid address len".to_string());
                    }
                    Value::String(format!("0x{}", hex::encode(&raw)))
                }
                Eip712FieldType::Custom(name) => {
                    return Err(format!("custom type {} in primitive position", name));
                }
            }
        }
        TypeSchema::Array { item, level: _ } => {
            let len_v = data.next().ok_or("build value data.next failed")?;
            if len_v.len() != 1 {
                return Err("invalid array size len".to_string());
            }
            let len = len_v[0];
            let mut arr = vec![];

            for _ in 0..len {
                arr.push(build_value(item, data)?);
            }

            arr.into()
        }
        TypeSchema::Struct { name: _, fields } => {
            let mut obj = serde_json::Map::new();
            for f in fields {
                let value = build_value(&f.ty, data)?;
                obj.insert(f.name.clone(), value);
            }
            Value::Object(obj)
        }
    };
    Ok(res)
}
