use crate::{
    consts::{EIP712_DOMAIN_TYPE_NAME, EIP712_PREFIX},
    error::{Error, Result},
    message::TypedDataModel,
    parser::{TypeSchema, array_items, build_schema, struct_member},
    types::{Eip712FieldType, Eip712FieldValue, Eip712StructDefinitions},
    utils::*,
};
use alloc::{
    borrow::ToOwned,
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use alloy_primitives::{Address, B256, keccak256};
use serde_json::Value;

pub fn encode_types_without_sub_type(struct_defs: &Eip712StructDefinitions) -> BTreeMap<String, String> {
    let mut res: BTreeMap<String, String> = Default::default();

    for (struct_name, field_defs) in struct_defs {
        let mut type_str: String = String::new();
        type_str.push_str(&format!("{}(", struct_name));
        for (index, field_def) in field_defs.iter().enumerate() {
            if index > 0 {
                type_str.push(',');
            }
            let field_type_str = field_def.type_string();
            type_str.push_str(&format!("{} {}", field_type_str, field_def.name));
        }
        type_str.push(')');

        res.insert(struct_name.to_owned(), type_str);
    }

    res
}

// return sorted sub custom types
pub fn find_sub_custom_types(struct_defs: &Eip712StructDefinitions, type_name: &str) -> Result<Vec<String>> {
    let mut res = vec![];

    let field_defs = struct_defs
        .get(type_name)
        .ok_or_else(|| Error::schema(format!("{} field defs not found", type_name)))?;
    for f in field_defs {
        let Some(custom_type) = f.field_type.custom_type_name() else {
            continue;
        };

        let sub_custom_types = find_sub_custom_types(struct_defs, custom_type)?;
        res.extend(sub_custom_types);

        res.push(custom_type.to_string());
    }

    // sort and removes consecutive repeated elements
    res.sort();
    res.dedup();

    Ok(res)
}

pub fn encode_type(
    struct_types: &BTreeMap<String, String>,
    struct_defs: &Eip712StructDefinitions,
    type_name: &str,
) -> Result<String> {
    let not_found = |name: &str| Error::schema(format!("type {} not found", name));
    let mut type_str = struct_types.get(type_name).ok_or_else(|| not_found(type_name))?.to_owned();

    let sub_customs = find_sub_custom_types(struct_defs, type_name)?;

    for custom in &sub_customs {
        if custom == type_name {
            return Err(Error::schema(format!("recursive type reference to {}", type_name)));
        }
        let custom_type = struct_types.get(custom).ok_or_else(|| not_found(custom))?;
        type_str.push_str(custom_type);
    }

    Ok(type_str)
}

pub fn encode_all_struct_type(struct_defs: &Eip712StructDefinitions) -> Result<BTreeMap<String, String>> {
    let struct_types = encode_types_without_sub_type(struct_defs);
    let mut res: BTreeMap<String, String> = Default::default();

    for type_name in struct_defs.keys() {
        let type_str = encode_type(&struct_types, struct_defs, type_name)?;
        res.insert(type_name.to_owned(), type_str);
    }

    Ok(res)
}

/// One 32-byte word for an atomic value, the keccak of the content for
/// `string` / `bytes`
pub fn encode_primitive(ty: &Eip712FieldType, raw: &[u8]) -> Result<B256> {
    let word = match ty {
        Eip712FieldType::Bool => {
            let mut word = B256::ZERO;
            word[31] = u8::from(raw.first() == Some(&1));
            word
        }
        Eip712FieldType::Int(_) => B256::from(parse_i256(raw).map_err(Error::schema)?.to_be_bytes::<32>()),
        Eip712FieldType::Uint(_) => B256::from(parse_u256(raw).map_err(Error::schema)?),
        Eip712FieldType::Address => {
            if raw.len() != 20 {
                return Err(Error::schema("invalid address len"));
            }
            Address::from_slice(raw).into_word()
        }
        Eip712FieldType::FixedBytes(size) => {
            if raw.len() != *size as usize {
                return Err(Error::schema("invalid fixed bytes len"));
            }
            B256::right_padding_from(raw)
        }
        Eip712FieldType::String | Eip712FieldType::DynamicBytes => keccak256(raw),
        Eip712FieldType::Custom(name) => {
            return Err(Error::schema(format!("custom type {} in primitive position", name)));
        }
    };
    Ok(word)
}

/// `encodeData` of a struct: the concatenated encoding of its members.
/// For arrays the result is already the 32-byte keccak of the elements.
pub fn encode_data(schema: &TypeSchema, struct_types: &BTreeMap<String, String>, value: &Value) -> Result<Vec<u8>> {
    let res = match schema {
        TypeSchema::Primitive(ty) => {
            let raw = Eip712FieldValue::from_json(ty, value)?;
            encode_primitive(ty, &raw.value)?.to_vec()
        }
        TypeSchema::Array { item, level } => {
            let mut arr = vec![];

            for v in array_items(level, value)? {
                let mut tmp_value = encode_data(item, struct_types, v)?;

                if let TypeSchema::Struct { name, fields: _ } = item.as_ref() {
                    let type_str = struct_types.get(name).ok_or("not found").map_err(Error::schema)?;
                    tmp_value = hash_struct(type_str, &tmp_value).to_vec();
                }
                arr.extend(tmp_value);
            }

            keccak256(arr).to_vec()
        }
        TypeSchema::Struct { name, fields } => {
            let mut encoded_data = vec![];
            for f in fields {
                let member = struct_member(name, f, value)?;
                let mut f_data = encode_data(&f.ty, struct_types, member)?;

                if let TypeSchema::Struct { name, fields: _ } = &f.ty {
                    let type_str = struct_types.get(name).ok_or("not found").map_err(Error::schema)?;
                    f_data = hash_struct(type_str, &f_data).to_vec();
                }

                encoded_data.extend(f_data);
            }

            encoded_data
        }
    };
    Ok(res)
}

pub fn hash_struct(type_str: &str, encoded_data: &[u8]) -> B256 {
    let type_hash = keccak256(type_str.as_bytes());
    let mut hasher = alloy_primitives::Keccak256::new();
    hasher.update(type_hash);
    hasher.update(encoded_data);
    hasher.finalize()
}

fn hash_typed_value(struct_defs: &Eip712StructDefinitions, type_name: &str, value: &Value) -> Result<B256> {
    let struct_types = encode_all_struct_type(struct_defs)?;
    let schema = build_schema(struct_defs, type_name)?;

    let type_str = struct_types
        .get(type_name)
        .ok_or_else(|| Error::schema(format!("type str of {} not found", type_name)))?;
    let encoded_data = encode_data(&schema, &struct_types, value)?;
    Ok(hash_struct(type_str, &encoded_data))
}

/// `hashStruct(EIP712Domain)` over the domain fields the message declares
pub fn domain_separator(model: &TypedDataModel) -> Result<B256> {
    hash_typed_value(model.struct_defs(), EIP712_DOMAIN_TYPE_NAME, &model.domain_value())
}

/// `hashStruct(primaryType)` of the message
pub fn struct_hash(model: &TypedDataModel) -> Result<B256> {
    hash_typed_value(model.struct_defs(), model.primary_type(), &model.message().message)
}

/// Combine a domain separator and a struct hash into the digest to sign
pub fn legacy_signing_hash(domain_hash: &B256, message_hash: &B256) -> B256 {
    let mut buf = [0u8; 66];
    buf[..2].copy_from_slice(&EIP712_PREFIX);
    buf[2..34].copy_from_slice(domain_hash.as_slice());
    buf[34..].copy_from_slice(message_hash.as_slice());

    keccak256(buf)
}

pub fn signing_hash(model: &TypedDataModel) -> Result<B256> {
    Ok(legacy_signing_hash(&domain_separator(model)?, &struct_hash(model)?))
}
