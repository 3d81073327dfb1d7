use crate::{
    consts::EIP712_DOMAIN_TYPE_NAME,
    error::{Error, Result},
    parser::{TypeSchema, array_items, build_schema, encode_stream, struct_member},
    path::FieldPath,
    types::{
        Eip712FieldDefinition, Eip712FieldType, Eip712FieldValue, Eip712StructDefinitions,
        build_resolver_from_struct_defs, validate_struct_defs,
    },
    utils::parse_u256,
};
use alloc::{
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec::Vec,
};
use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One `{ "name": .., "type": .. }` entry of the `types` table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Typed-data message as found in `eth_signTypedData_v4` payloads
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataMessage {
    pub domain: Map<String, Value>,
    pub types: BTreeMap<String, Vec<TypeEntry>>,
    pub primary_type: String,
    pub message: Value,
}

impl TypedDataMessage {
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::schema(format!("invalid typed data: {}", e)))
    }
}

/// A primitive leaf of a flattened message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatField {
    /// Wildcard path, the join key against filter specifications
    pub path: FieldPath,
    /// Concrete index taken at every wildcard of `path`
    pub indices: Vec<usize>,
    pub field_type: Eip712FieldType,
    pub value: Eip712FieldValue,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Flattened {
    /// Primitive leaves in message order
    pub leaves: Vec<FlatField>,
    /// Paths of the arrays visited with zero elements
    pub empty_arrays: Vec<FieldPath>,
}

/// Validated typed-data message
#[derive(Clone, Debug)]
pub struct TypedDataModel {
    message: TypedDataMessage,
    struct_defs: Eip712StructDefinitions,
}

impl TypedDataModel {
    pub fn new(message: TypedDataMessage) -> Result<Self> {
        let mut struct_defs = Eip712StructDefinitions::new();
        for (name, entries) in &message.types {
            let mut fields = Vec::with_capacity(entries.len());
            for entry in entries {
                fields.push(Eip712FieldDefinition::parse(&entry.name, &entry.ty)?);
            }
            struct_defs.insert(name.clone(), fields);
        }

        if !struct_defs.contains_key(EIP712_DOMAIN_TYPE_NAME) {
            return Err(Error::schema("missing EIP712Domain type"));
        }
        if !struct_defs.contains_key(&message.primary_type) {
            return Err(Error::schema(format!(
                "primary type {} not declared",
                message.primary_type
            )));
        }
        validate_struct_defs(&struct_defs)?;

        Ok(TypedDataModel {
            message,
            struct_defs,
        })
    }

    pub fn from_json(value: Value) -> Result<Self> {
        Self::new(TypedDataMessage::from_json(value)?)
    }

    pub fn message(&self) -> &TypedDataMessage {
        &self.message
    }

    pub fn struct_defs(&self) -> &Eip712StructDefinitions {
        &self.struct_defs
    }

    pub fn primary_type(&self) -> &str {
        &self.message.primary_type
    }

    pub fn domain_value(&self) -> Value {
        Value::Object(self.message.domain.clone())
    }

    pub fn schema(&self, type_name: &str) -> Result<TypeSchema> {
        build_schema(&self.struct_defs, type_name)
    }

    /// Domain `chainId`, when declared and small enough to be a chain id
    pub fn chain_id(&self) -> Option<u64> {
        let ty = self.domain_field_type("chainId")?;
        let raw = Eip712FieldValue::from_json(&ty, self.message.domain.get("chainId")?).ok()?;
        let id = parse_u256(&raw.value).ok()?;
        (id <= U256::from(u64::MAX)).then(|| id.as_limbs()[0])
    }

    /// Domain `verifyingContract`, when declared
    pub fn verifying_contract(&self) -> Option<Address> {
        match self.domain_field_type("verifyingContract")? {
            Eip712FieldType::Address => self.message.domain.get("verifyingContract")?.as_str()?.parse().ok(),
            _ => None,
        }
    }

    fn domain_field_type(&self, name: &str) -> Option<Eip712FieldType> {
        self.struct_defs
            .get(EIP712_DOMAIN_TYPE_NAME)?
            .iter()
            .find(|f| f.name == name && !f.is_array())
            .map(|f| f.field_type.clone())
    }

    /// Flatten the primary-type message
    pub fn flatten(&self) -> Result<Flattened> {
        let schema = self.schema(&self.message.primary_type)?;
        let mut out = Flattened::default();
        flatten_into(&schema, &self.message.message, &FieldPath::root(), &mut Vec::new(), &mut out)?;
        Ok(out)
    }

    /// Item stream of the domain, as streamed to the device
    pub fn domain_stream(&self) -> Result<Vec<Eip712FieldValue>> {
        let mut out = Vec::new();
        encode_stream(&self.schema(EIP712_DOMAIN_TYPE_NAME)?, &self.domain_value(), &mut out)?;
        Ok(out)
    }

    /// Item stream of the message, as streamed to the device
    pub fn message_stream(&self) -> Result<Vec<Eip712FieldValue>> {
        let mut out = Vec::new();
        encode_stream(&self.schema(&self.message.primary_type)?, &self.message.message, &mut out)?;
        Ok(out)
    }

    /// The same message as an `alloy-dyn-abi` [`TypedData`]
    pub fn to_typed_data(&self) -> Result<TypedData> {
        let domain = serde_json::from_value(self.domain_value())
            .map_err(|e| Error::schema(format!("invalid domain: {}", e)))?;
        Ok(TypedData {
            domain,
            resolver: build_resolver_from_struct_defs(&self.struct_defs)?,
            primary_type: self.message.primary_type.to_string(),
            message: self.message.message.clone(),
        })
    }
}

fn flatten_into(
    schema: &TypeSchema,
    value: &Value,
    path: &FieldPath,
    indices: &mut Vec<usize>,
    out: &mut Flattened,
) -> Result<()> {
    match schema {
        TypeSchema::Primitive(ty) => {
            let value = Eip712FieldValue::from_json(ty, value)
                .map_err(|e| Error::schema(format!("{}: {}", path, e)))?;
            out.leaves.push(FlatField {
                path: path.clone(),
                indices: indices.clone(),
                field_type: ty.clone(),
                value,
            });
        }
        TypeSchema::Array { item, level } => {
            let items = array_items(level, value).map_err(|e| Error::schema(format!("{}: {}", path, e)))?;
            if items.is_empty() {
                out.empty_arrays.push(path.clone());
            }
            let item_path = path.wildcard();
            for (index, v) in items.iter().enumerate() {
                indices.push(index);
                flatten_into(item, v, &item_path, indices, out)?;
                indices.pop();
            }
        }
        TypeSchema::Struct { name, fields } => {
            for f in fields {
                let member = struct_member(name, f, value)?;
                flatten_into(&f.ty, member, &path.field(&f.name), indices, out)?;
            }
        }
    }
    Ok(())
}
