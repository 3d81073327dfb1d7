use crate::{
    consts::MAX_STRUCT_DEPTH,
    error::{Error, Result},
    utils::{parse_utf8_string, u256_to_minimal_bytes, uint_max},
};
use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use alloy_dyn_abi::{Eip712Types, PropertyDef, Resolver};
use alloy_primitives::{Address, I256, U256, hex};
use bytes::{Buf, BufMut, Bytes, BytesMut, TryGetError};
use serde_json::Value;

/// EIP-712 field type enumeration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Eip712FieldType {
    /// Custom struct type
    Custom(String),
    /// Integer type with size in bytes
    Int(u8),
    /// Unsigned integer type with size in bytes
    Uint(u8),
    /// Ethereum address type
    Address,
    /// Boolean type
    Bool,
    /// String type
    String,
    /// Fixed-size bytes with size
    FixedBytes(u8),
    /// Dynamic-size bytes
    DynamicBytes,
}

impl Eip712FieldType {
    /// Get the type ID for encoding
    pub fn type_id(&self) -> u8 {
        match self {
            Eip712FieldType::Custom(_) => 0,
            Eip712FieldType::Int(_) => 1,
            Eip712FieldType::Uint(_) => 2,
            Eip712FieldType::Address => 3,
            Eip712FieldType::Bool => 4,
            Eip712FieldType::String => 5,
            Eip712FieldType::FixedBytes(_) => 6,
            Eip712FieldType::DynamicBytes => 7,
        }
    }

    /// Get the type size if applicable
    pub fn type_size(&self) -> Option<u8> {
        match self {
            Eip712FieldType::Int(size) => Some(*size),
            Eip712FieldType::Uint(size) => Some(*size),
            Eip712FieldType::FixedBytes(size) => Some(*size),
            _ => None,
        }
    }

    /// Get the type name for custom types
    pub fn custom_type_name(&self) -> Option<&str> {
        match self {
            Eip712FieldType::Custom(name) => Some(name),
            _ => None,
        }
    }

    pub fn type_string(&self) -> String {
        match self {
            Eip712FieldType::Custom(name) => name.clone(),
            Eip712FieldType::Int(size) => format!("int{}", *size as usize * 8),
            Eip712FieldType::Uint(size) => format!("uint{}", *size as usize * 8),
            Eip712FieldType::Address => "address".to_string(),
            Eip712FieldType::Bool => "bool".to_string(),
            Eip712FieldType::String => "string".to_string(),
            Eip712FieldType::FixedBytes(size) => format!("bytes{}", size),
            Eip712FieldType::DynamicBytes => "bytes".to_string(),
        }
    }

    /// Parse the base of a type tag (no array suffix). Anything that is not
    /// an elementary type is taken as a struct name.
    pub fn parse(base: &str) -> Result<Self> {
        let sized = |digits: &str, bits: bool| -> Result<u8> {
            let n: usize = digits
                .parse()
                .map_err(|_| Error::schema(format!("invalid type size in {:?}", base)))?;
            let (bytes, valid) = if bits {
                (n / 8, n % 8 == 0 && (8..=256).contains(&n))
            } else {
                (n, (1..=32).contains(&n))
            };
            if !valid {
                return Err(Error::schema(format!("invalid type size in {:?}", base)));
            }
            Ok(bytes as u8)
        };

        let ty = match base {
            "address" => Eip712FieldType::Address,
            "bool" => Eip712FieldType::Bool,
            "string" => Eip712FieldType::String,
            "bytes" => Eip712FieldType::DynamicBytes,
            "uint" => Eip712FieldType::Uint(32),
            "int" => Eip712FieldType::Int(32),
            _ if base.starts_with("uint") && base[4..].bytes().all(|b| b.is_ascii_digit()) => {
                Eip712FieldType::Uint(sized(&base[4..], true)?)
            }
            _ if base.starts_with("int") && base[3..].bytes().all(|b| b.is_ascii_digit()) => {
                Eip712FieldType::Int(sized(&base[3..], true)?)
            }
            _ if base.starts_with("bytes") && base[5..].bytes().all(|b| b.is_ascii_digit()) => {
                Eip712FieldType::FixedBytes(sized(&base[5..], false)?)
            }
            "" => return Err(Error::schema("empty type name")),
            _ if base.contains(['[', ']', ' ', '(', ')', ',']) => {
                return Err(Error::schema(format!("invalid type name {:?}", base)));
            }
            name => Eip712FieldType::Custom(name.to_string()),
        };
        Ok(ty)
    }
}

/// EIP-712 array level type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Eip712ArrayLevel {
    /// Dynamic array (type[])
    Dynamic,
    /// Fixed-size array (type[N]) u8 means the array size can not bigger than 256
    Fixed(u8),
}

impl Eip712ArrayLevel {
    /// Get the array level type ID for encoding
    pub fn type_id(&self) -> u8 {
        match self {
            Eip712ArrayLevel::Dynamic => 0,
            Eip712ArrayLevel::Fixed(_) => 1,
        }
    }

    /// Get the array size if fixed
    pub fn size(&self) -> Option<u8> {
        match self {
            Eip712ArrayLevel::Fixed(size) => Some(*size),
            Eip712ArrayLevel::Dynamic => None,
        }
    }

    pub fn type_string(&self) -> String {
        match self {
            Eip712ArrayLevel::Dynamic => "[]".to_string(),
            Eip712ArrayLevel::Fixed(size) => format!("[{}]", size),
        }
    }
}

/// EIP-712 struct field definition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip712FieldDefinition {
    /// Field data type
    pub field_type: Eip712FieldType,
    /// Field name
    pub name: String,
    /// Array levels (empty if not an array)
    pub array_levels: Vec<Eip712ArrayLevel>,
}

impl Eip712FieldDefinition {
    /// Create a new field definition
    pub fn new(field_type: Eip712FieldType, name: String) -> Self {
        Eip712FieldDefinition {
            field_type,
            name,
            array_levels: Vec::new(),
        }
    }

    /// Parse a `{ name, type }` entry of a typed-data `types` table,
    /// e.g. `("cc3", "string[][][2]")`.
    pub fn parse(name: &str, type_tag: &str) -> Result<Self> {
        let base_end = type_tag.find('[').unwrap_or(type_tag.len());
        let field_type = Eip712FieldType::parse(&type_tag[..base_end])?;

        // levels are kept in suffix order, innermost first:
        // `T[2][]` is a dynamic array of `T[2]`
        let mut suffixes = Vec::new();
        let mut rest = &type_tag[base_end..];
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .filter(|_| rest.starts_with('['))
                .ok_or_else(|| Error::schema(format!("invalid array suffix in {:?}", type_tag)))?;
            let level = match &rest[1..close] {
                "" => Eip712ArrayLevel::Dynamic,
                digits => Eip712ArrayLevel::Fixed(digits.parse().map_err(|_| {
                    Error::schema(format!("invalid array size in {:?}", type_tag))
                })?),
            };
            suffixes.push(level);
            rest = &rest[close + 1..];
        }

        Ok(Eip712FieldDefinition {
            field_type,
            name: name.to_string(),
            array_levels: suffixes,
        })
    }

    /// Add an array level to the field
    pub fn with_array_level(mut self, level: Eip712ArrayLevel) -> Self {
        self.array_levels.push(level);
        self
    }

    /// Check if this field is an array
    pub fn is_array(&self) -> bool {
        !self.array_levels.is_empty()
    }

    pub fn type_string(&self) -> String {
        let mut type_str = self.field_type.type_string();
        for level in &self.array_levels {
            type_str.push_str(&level.type_string());
        }
        type_str
    }

    pub fn to_proper_def(&self) -> Result<PropertyDef> {
        PropertyDef::new(self.type_string(), self.name.clone())
            .map_err(|_| Error::schema(format!("invalid type {}", self.type_string())))
    }

    pub fn from_bytes(bytes: &[u8]) -> core::result::Result<Self, &'static str> {
        let get_err_str = |_: TryGetError| "Invalid len";

        let mut buf = Bytes::copy_from_slice(bytes);

        // decode type info
        let type_desc = buf.try_get_u8().map_err(get_err_str)?;
        let is_array = (type_desc & 0x80) == 0x80;
        let is_type_size_specified = (type_desc & 0x40) == 0x40;
        let field_type_id = type_desc & 0x0F;

        let field_type = match field_type_id {
            0 => {
                let custom_name_len = buf.try_get_u8().map_err(get_err_str)? as usize;
                if buf.remaining() < custom_name_len {
                    return Err("Unexpected end of input when reading custom name");
                }
                let mut custom_name_bytes = vec![0u8; custom_name_len];
                buf.copy_to_slice(&mut custom_name_bytes);
                let custom_name = parse_utf8_string(&custom_name_bytes)?;
                Eip712FieldType::Custom(custom_name)
            }
            1 | 2 | 6 => {
                if !is_type_size_specified {
                    return Err("Sized type must specify size");
                }
                let type_size = buf.try_get_u8().map_err(get_err_str)?;
                match field_type_id {
                    1 => Eip712FieldType::Int(type_size),
                    2 => Eip712FieldType::Uint(type_size),
                    _ => Eip712FieldType::FixedBytes(type_size),
                }
            }
            3 => Eip712FieldType::Address,
            4 => Eip712FieldType::Bool,
            5 => Eip712FieldType::String,
            7 => Eip712FieldType::DynamicBytes,
            _ => return Err("Unknown field type"),
        };

        // decode array levels info
        let array_levels = if is_array {
            let mut levels = Vec::new();
            let level_count = buf.try_get_u8().map_err(get_err_str)? as usize;
            for _ in 0..level_count {
                let level_desc = buf.try_get_u8().map_err(get_err_str)?;

                match level_desc {
                    0 => levels.push(Eip712ArrayLevel::Dynamic),
                    1 => {
                        let size = buf.try_get_u8().map_err(get_err_str)?;
                        levels.push(Eip712ArrayLevel::Fixed(size));
                    }
                    _ => return Err("Unknown array level type"),
                }
            }
            levels
        } else {
            Vec::new()
        };

        // decode field name
        let name_len = buf.try_get_u8().map_err(get_err_str)? as usize;
        if buf.remaining() < name_len {
            return Err("Unexpected end of input when reading field name");
        }
        let mut name_bytes = vec![0u8; name_len];
        buf.copy_to_slice(&mut name_bytes);
        let name = parse_utf8_string(&name_bytes)?;

        Ok(Eip712FieldDefinition {
            field_type,
            name,
            array_levels,
        })
    }

    /// Device wire encoding, inverse of [`Self::from_bytes`]
    pub fn to_bytes(&self) -> core::result::Result<Vec<u8>, &'static str> {
        let mut buf = BytesMut::new();

        let mut type_desc = self.field_type.type_id();
        if self.is_array() {
            type_desc |= 0x80;
        }
        if self.field_type.type_size().is_some() {
            type_desc |= 0x40;
        }
        buf.put_u8(type_desc);

        if let Some(name) = self.field_type.custom_type_name() {
            put_short_str(&mut buf, name)?;
        }
        if let Some(size) = self.field_type.type_size() {
            buf.put_u8(size);
        }
        if self.is_array() {
            let level_count =
                u8::try_from(self.array_levels.len()).map_err(|_| "Too many array levels")?;
            buf.put_u8(level_count);
            for level in &self.array_levels {
                buf.put_u8(level.type_id());
                if let Some(size) = level.size() {
                    buf.put_u8(size);
                }
            }
        }
        put_short_str(&mut buf, &self.name)?;

        Ok(buf.to_vec())
    }
}

pub(crate) fn put_short_str(buf: &mut BytesMut, s: &str) -> core::result::Result<(), &'static str> {
    let len = u8::try_from(s.len()).map_err(|_| "String too long")?;
    buf.put_u8(len);
    buf.put_slice(s.as_bytes());
    Ok(())
}

pub type Eip712StructDefinitions = BTreeMap<String, Vec<Eip712FieldDefinition>>;

/// Check that every referenced struct exists and that the type graph is acyclic
pub fn validate_struct_defs(struct_defs: &Eip712StructDefinitions) -> Result<()> {
    fn visit(
        struct_defs: &Eip712StructDefinitions,
        name: &str,
        visiting: &mut BTreeSet<String>,
        done: &mut BTreeSet<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if visiting.len() >= MAX_STRUCT_DEPTH {
            return Err(Error::schema(format!("type {} nested too deeply", name)));
        }
        if !visiting.insert(name.to_string()) {
            return Err(Error::schema(format!("recursive type reference to {}", name)));
        }
        let fields = struct_defs
            .get(name)
            .ok_or_else(|| Error::schema(format!("unknown type {}", name)))?;
        for field in fields {
            if let Some(sub) = field.field_type.custom_type_name() {
                if !struct_defs.contains_key(sub) {
                    return Err(Error::schema(format!(
                        "{}.{} references unknown type {}",
                        name, field.name, sub
                    )));
                }
                visit(struct_defs, sub, visiting, done)?;
            }
        }
        visiting.remove(name);
        done.insert(name.to_string());
        Ok(())
    }

    let mut done = BTreeSet::new();
    for name in struct_defs.keys() {
        visit(struct_defs, name, &mut BTreeSet::new(), &mut done)?;
    }
    Ok(())
}

pub fn build_resolver_from_struct_defs(struct_defs: &Eip712StructDefinitions) -> Result<Resolver> {
    let mut eip712_types: Eip712Types = Default::default();
    for (name, defs) in struct_defs.iter() {
        let mut property_defs = Vec::new();
        for field in defs {
            property_defs.push(field.to_proper_def()?);
        }
        eip712_types.insert(name.clone(), property_defs);
    }
    Ok(Resolver::from(eip712_types))
}

/// EIP-712 primitive value in device wire encoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip712FieldValue {
    /// Raw value data
    pub value: Vec<u8>,
}

impl Eip712FieldValue {
    /// Create a new field value
    pub fn new(value: Vec<u8>) -> Self {
        Eip712FieldValue { value }
    }

    /// Create from a string value
    pub fn from_string(s: &str) -> Self {
        Eip712FieldValue {
            value: s.as_bytes().to_vec(),
        }
    }

    /// Create from an address
    pub fn from_address(address: &Address) -> Self {
        Eip712FieldValue {
            value: address.to_vec(),
        }
    }

    /// Create from a boolean
    pub fn from_bool(value: bool) -> Self {
        Eip712FieldValue {
            value: vec![if value { 1 } else { 0 }],
        }
    }

    pub fn from_u256(value: &U256) -> Self {
        Eip712FieldValue {
            value: u256_to_minimal_bytes(value),
        }
    }

    /// Array length item of the value stream
    pub fn from_len(len: usize) -> core::result::Result<Self, &'static str> {
        let len = u8::try_from(len).map_err(|_| "array too long")?;
        Ok(Eip712FieldValue { value: vec![len] })
    }

    /// Convert a JSON literal of the given primitive type, checking it fits
    /// the declared width.
    pub fn from_json(field_type: &Eip712FieldType, json: &Value) -> Result<Self> {
        let mismatch = || {
            Error::schema(format!(
                "value {} does not fit type {}",
                json,
                field_type.type_string()
            ))
        };

        let value = match field_type {
            Eip712FieldType::Custom(_) => return Err(mismatch()),
            Eip712FieldType::Bool => match json {
                Value::Bool(b) => Eip712FieldValue::from_bool(*b),
                _ => return Err(mismatch()),
            },
            Eip712FieldType::String => match json {
                Value::String(s) => Eip712FieldValue::from_string(s),
                _ => return Err(mismatch()),
            },
            Eip712FieldType::Address => {
                let s = json.as_str().ok_or_else(mismatch)?;
                let address: Address = s.parse().map_err(|_| mismatch())?;
                Eip712FieldValue::from_address(&address)
            }
            Eip712FieldType::DynamicBytes => Eip712FieldValue::new(json_hex(json).ok_or_else(mismatch)?),
            Eip712FieldType::FixedBytes(size) => {
                let raw = json_hex(json).ok_or_else(mismatch)?;
                if raw.len() != *size as usize {
                    return Err(mismatch());
                }
                Eip712FieldValue::new(raw)
            }
            Eip712FieldType::Uint(size) => {
                let v = json_u256(json).ok_or_else(mismatch)?;
                if v > uint_max(*size) {
                    return Err(mismatch());
                }
                Eip712FieldValue::from_u256(&v)
            }
            Eip712FieldType::Int(size) => {
                let v = json_i256(json).ok_or_else(mismatch)?;
                let word = v.to_be_bytes::<32>();
                let cut = 32 - *size as usize;
                // everything above the declared width must be sign extension
                let sign = if word[cut] & 0x80 != 0 { 0xFF } else { 0x00 };
                if word[..cut].iter().any(|b| *b != sign) {
                    return Err(mismatch());
                }
                Eip712FieldValue::new(word[cut..].to_vec())
            }
        };
        Ok(value)
    }
}

fn json_hex(json: &Value) -> Option<Vec<u8>> {
    let s = json.as_str()?;
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()
}

fn json_u256(json: &Value) -> Option<U256> {
    match json {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex_digits) => U256::from_str_radix(hex_digits, 16).ok(),
            None => U256::from_str_radix(s, 10).ok(),
        },
        _ => None,
    }
}

fn json_i256(json: &Value) -> Option<I256> {
    match json {
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| I256::from_dec_str(&v.to_string()).ok())
            .or_else(|| n.as_u64().map(|v| I256::from_raw(U256::from(v)))),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex_digits) => I256::from_hex_str(hex_digits).ok(),
            None => I256::from_dec_str(s).ok(),
        },
        _ => None,
    }
}
