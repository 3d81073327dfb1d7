use crate::{
    eip712_filter::{Eip712FilterParams, Eip712FilterType, FieldFilter, FilterSpec},
    error::{Error, Result},
    message::{FlatField, Flattened, TypedDataModel},
    path::FieldPath,
    trusted::{ProxyInfo, TrustedNameTable},
    types::Eip712FieldType,
    utils::*,
};
use alloc::{
    collections::BTreeSet,
    format,
    string::{String, ToString},
    vec::Vec,
};
use alloy_primitives::{Address, U256, hex};
use log::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    Raw,
    Amount,
    Datetime,
    TrustedName,
}

/// One screen of the disclosure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub label: String,
    pub value: String,
    /// Field the value was read from
    pub path: FieldPath,
    pub indices: Vec<usize>,
    /// Filter frame announcing this field to the device, none when unfiltered
    pub frame: Option<Eip712FilterParams>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Display name of the filter, none when unfiltered
    pub name: Option<String>,
    pub directives: Vec<Directive>,
    /// One frame per filtered leaf, token halves included, in message order
    pub field_frames: Vec<Eip712FilterParams>,
    /// Filter entries lying under an empty array
    pub discarded: Vec<(FieldPath, Eip712FilterParams)>,
}

impl Resolution {
    pub fn is_filtered(&self) -> bool {
        self.name.is_some()
    }

    /// Frames streamed after the message values, in order. Activation is not
    /// among them, it precedes the domain.
    pub fn frames(&self) -> core::result::Result<Vec<Eip712FilterParams>, &'static str> {
        let Some(name) = &self.name else {
            return Ok(Vec::new());
        };
        let filters_count = u8::try_from(self.field_frames.len()).map_err(|_| "Too many filters")?;

        let mut frames = Vec::with_capacity(self.field_frames.len() + 2 * self.discarded.len() + 1);
        frames.push(Eip712FilterParams::new(Eip712FilterType::MessageInfo {
            display_name: name.clone(),
            filters_count,
        }));
        for (path, frame) in &self.discarded {
            frames.push(Eip712FilterParams::new(Eip712FilterType::DiscardedFilterPath(
                path.to_string(),
            )));
            frames.push(frame.clone());
        }
        frames.extend(self.field_frames.iter().cloned());
        Ok(frames)
    }
}

struct PendingValue<'f> {
    pos: usize,
    leaf: &'f FlatField,
    name: &'f str,
    token: u8,
    frame: Eip712FilterParams,
}

struct PendingToken<'f> {
    token: u8,
    leaf: &'f FlatField,
}

fn prefix_compatible(a: &[usize], b: &[usize]) -> bool {
    if a.len() <= b.len() { b.starts_with(a) } else { a.starts_with(b) }
}

/// Raw rendering of a primitive value
pub fn render_raw(field_type: &Eip712FieldType, raw: &[u8]) -> Result<String> {
    let rendered = match field_type {
        Eip712FieldType::Address => {
            if raw.len() != 20 {
                return Err(Error::schema("invalid address len"));
            }
            Address::from_slice(raw).to_checksum(None)
        }
        Eip712FieldType::Uint(_) => parse_u256(raw).map_err(Error::schema)?.to_string(),
        Eip712FieldType::Int(_) => parse_i256(raw).map_err(Error::schema)?.to_string(),
        Eip712FieldType::Bool => (raw.first() == Some(&1)).to_string(),
        Eip712FieldType::String => String::from_utf8_lossy(raw).into_owned(),
        Eip712FieldType::FixedBytes(_) | Eip712FieldType::DynamicBytes => {
            format!("0x{}", hex::encode(raw))
        }
        Eip712FieldType::Custom(name) => {
            return Err(Error::schema(format!("custom type {} in primitive position", name)));
        }
    };
    Ok(rendered)
}

/// Non-negative integer value of a leaf
fn leaf_uint(leaf: &FlatField) -> Result<Option<U256>> {
    match leaf.field_type {
        Eip712FieldType::Uint(_) => Ok(Some(parse_u256(&leaf.value.value).map_err(Error::schema)?)),
        Eip712FieldType::Int(_) => {
            let v = parse_i256(&leaf.value.value).map_err(Error::schema)?;
            Ok((!v.is_negative()).then(|| v.into_raw()))
        }
        _ => Err(Error::schema(format!(
            "{} is {}, an integer is required",
            leaf.path,
            leaf.field_type.type_string()
        ))),
    }
}

fn require_address(leaf: &FlatField) -> Result<Address> {
    if leaf.field_type != Eip712FieldType::Address || leaf.value.value.len() != 20 {
        return Err(Error::schema(format!(
            "{} is {}, an address is required",
            leaf.path,
            leaf.field_type.type_string()
        )));
    }
    Ok(Address::from_slice(&leaf.value.value))
}

pub struct FilterResolver<'a> {
    spec: Option<&'a FilterSpec>,
    chain_id: Option<u64>,
    verifying_contract: Option<Address>,
    trusted_names: TrustedNameTable,
    proxy: Option<ProxyInfo>,
}

impl<'a> FilterResolver<'a> {
    pub fn new(spec: &'a FilterSpec, model: &TypedDataModel) -> Self {
        FilterResolver {
            spec: Some(spec),
            chain_id: model.chain_id(),
            verifying_contract: model.verifying_contract(),
            trusted_names: TrustedNameTable::new(),
            proxy: None,
        }
    }

    /// Resolver disclosing every leaf raw, labelled with its field name
    pub fn unfiltered(model: &TypedDataModel) -> Self {
        FilterResolver {
            spec: None,
            chain_id: model.chain_id(),
            verifying_contract: model.verifying_contract(),
            trusted_names: TrustedNameTable::new(),
            proxy: None,
        }
    }

    pub fn with_trusted_names(mut self, trusted_names: TrustedNameTable) -> Self {
        self.trusted_names = trusted_names;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyInfo>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Check that the filter is meant for the domain's verifying contract
    fn check_binding(&self, spec: &FilterSpec) -> Result<()> {
        let Some(filter_address) = spec.address else {
            return Ok(());
        };
        let Some(verifying_contract) = self.verifying_contract else {
            return Err(Error::FilterMismatch(format!(
                "filter for {} but the domain has no verifying contract",
                filter_address
            )));
        };
        if filter_address == verifying_contract {
            return Ok(());
        }
        match &self.proxy {
            Some(proxy) if proxy.binds(&filter_address, &verifying_contract, self.chain_id) => {
                debug!("filter {} applies through proxy {}", filter_address, verifying_contract);
                Ok(())
            }
            _ => Err(Error::FilterMismatch(format!(
                "filter for {} does not apply to {}",
                filter_address, verifying_contract
            ))),
        }
    }

    /// Render a joined amount, or `None` when the token is not usable
    fn render_amount(&self, amount_leaf: &FlatField, token: u8, token_addr: Option<Address>) -> Result<Option<String>> {
        let Some(amount) = leaf_uint(amount_leaf)? else {
            return Ok(None);
        };
        let Some(spec) = self.spec else {
            return Ok(None);
        };
        let Some(info) = spec.token(token).and_then(|slot| slot.info()) else {
            debug!("token {} unknown, {} shown raw", token, amount_leaf.path);
            return Ok(None);
        };
        if token_addr.is_some_and(|addr| addr != info.addr) {
            debug!("token {} is not {}, {} shown raw", info.ticker, info.addr, amount_leaf.path);
            return Ok(None);
        }
        if self.chain_id.is_some_and(|id| id != info.chain_id) {
            debug!("token {} is on chain {}, {} shown raw", info.ticker, info.chain_id, amount_leaf.path);
            return Ok(None);
        }

        if let Eip712FieldType::Uint(size) = amount_leaf.field_type {
            if amount == uint_max(size) {
                return Ok(Some(format!("Unlimited {}", info.ticker)));
            }
        }
        Ok(format_units(&amount, info.decimals).map(|s| format!("{} {}", s, info.ticker)))
    }

    /// Slot of the token deployed at the verifying contract
    fn implied_token(&self, spec: &FilterSpec) -> Option<u8> {
        let vc = self.verifying_contract?;
        let index = spec.tokens.iter().position(|slot| {
            slot.info()
                .is_some_and(|t| t.addr == vc && self.chain_id.is_none_or(|id| id == t.chain_id))
        })?;
        u8::try_from(index).ok()
    }

    fn raw_directive(
        &self,
        leaf: &FlatField,
        label: &str,
        frame: Option<Eip712FilterParams>,
    ) -> Result<Directive> {
        Ok(Directive {
            kind: DirectiveKind::Raw,
            label: label.to_string(),
            value: render_raw(&leaf.field_type, &leaf.value.value)?,
            path: leaf.path.clone(),
            indices: leaf.indices.clone(),
            frame,
        })
    }

    fn directive(
        &self,
        kind: DirectiveKind,
        leaf: &FlatField,
        label: &str,
        value: String,
        frame: Eip712FilterParams,
    ) -> Directive {
        Directive {
            kind,
            label: label.to_string(),
            value,
            path: leaf.path.clone(),
            indices: leaf.indices.clone(),
            frame: Some(frame),
        }
    }

    pub fn resolve(&mut self, flat: &Flattened) -> Result<Resolution> {
        let Some(spec) = self.spec else {
            let mut directives = Vec::with_capacity(flat.leaves.len());
            for leaf in &flat.leaves {
                let label = leaf.path.last_field().unwrap_or_default();
                directives.push(self.raw_directive(leaf, label, None)?);
            }
            info!("unfiltered message, {} fields disclosed", directives.len());
            return Ok(Resolution {
                name: None,
                directives,
                field_frames: Vec::new(),
                discarded: Vec::new(),
            });
        };
        self.check_binding(spec)?;

        let mut positioned: Vec<(usize, Directive)> = Vec::new();
        let mut field_frames = Vec::new();
        let mut matched: BTreeSet<&FieldPath> = BTreeSet::new();
        let mut pending_values: Vec<PendingValue<'_>> = Vec::new();
        let mut pending_tokens: Vec<PendingToken<'_>> = Vec::new();

        for (pos, leaf) in flat.leaves.iter().enumerate() {
            let Some((path, filter)) = spec.fields.get_key_value(&leaf.path) else {
                continue;
            };
            matched.insert(path);
            let frame = Eip712FilterParams::from_field_filter(filter, false);
            field_frames.push(frame.clone());

            match filter {
                FieldFilter::Raw { name } => {
                    positioned.push((pos, self.raw_directive(leaf, name, Some(frame))?));
                }
                FieldFilter::Datetime { name } => {
                    let rendered = leaf_uint(leaf)?.and_then(|ts| format_datetime(&ts));
                    let directive = match rendered {
                        Some(value) => self.directive(DirectiveKind::Datetime, leaf, name, value, frame),
                        None => {
                            debug!("{} is not a valid date, shown raw", leaf.path);
                            self.raw_directive(leaf, name, Some(frame))?
                        }
                    };
                    positioned.push((pos, directive));
                }
                FieldFilter::TrustedName {
                    name,
                    tn_type,
                    tn_source,
                } => {
                    let address = require_address(leaf)?;
                    let directive = match self.trusted_names.claim(&address, self.chain_id, tn_type, tn_source) {
                        Some(trusted) => self.directive(DirectiveKind::TrustedName, leaf, name, trusted, frame),
                        None => {
                            debug!("no trusted name for {}, shown raw", address);
                            self.raw_directive(leaf, name, Some(frame))?
                        }
                    };
                    positioned.push((pos, directive));
                }
                FieldFilter::AmountJoinValue { name, token: None } => {
                    leaf_uint(leaf)?;
                    let rendered = match self.implied_token(spec) {
                        Some(token) => self.render_amount(leaf, token, None)?,
                        None => {
                            debug!("verifying contract is not a known token, {} shown raw", leaf.path);
                            None
                        }
                    };
                    let directive = match rendered {
                        Some(value) => self.directive(DirectiveKind::Amount, leaf, name, value, frame),
                        None => self.raw_directive(leaf, name, Some(frame))?,
                    };
                    positioned.push((pos, directive));
                }
                FieldFilter::AmountJoinValue { name, token: Some(token) } => {
                    leaf_uint(leaf)?;
                    let paired = pending_tokens
                        .iter()
                        .position(|t| t.token == *token && prefix_compatible(&t.leaf.indices, &leaf.indices));
                    match paired {
                        Some(i) => {
                            let token_half = pending_tokens.remove(i);
                            let token_addr = require_address(token_half.leaf)?;
                            let directive = match self.render_amount(leaf, *token, Some(token_addr))? {
                                Some(value) => self.directive(DirectiveKind::Amount, leaf, name, value, frame),
                                None => self.raw_directive(leaf, name, Some(frame))?,
                            };
                            positioned.push((pos, directive));
                        }
                        None => pending_values.push(PendingValue {
                            pos,
                            leaf,
                            name,
                            token: *token,
                            frame,
                        }),
                    }
                }
                FieldFilter::AmountJoinToken { token } => {
                    let token_addr = require_address(leaf)?;
                    let Some(token) = token else {
                        debug!("token half {} names no token, ignored", leaf.path);
                        continue;
                    };
                    let paired = pending_values
                        .iter()
                        .position(|v| v.token == *token && prefix_compatible(&v.leaf.indices, &leaf.indices));
                    match paired {
                        Some(i) => {
                            let value_half = pending_values.remove(i);
                            let directive = match self.render_amount(value_half.leaf, *token, Some(token_addr))? {
                                Some(value) => self.directive(
                                    DirectiveKind::Amount,
                                    value_half.leaf,
                                    value_half.name,
                                    value,
                                    value_half.frame,
                                ),
                                None => self.raw_directive(value_half.leaf, value_half.name, Some(value_half.frame))?,
                            };
                            positioned.push((pos, directive));
                        }
                        None => pending_tokens.push(PendingToken { token: *token, leaf }),
                    }
                }
            }
        }

        for value_half in pending_values {
            debug!("amount {} has no token counterpart, shown raw", value_half.leaf.path);
            positioned.push((
                value_half.pos,
                self.raw_directive(value_half.leaf, value_half.name, Some(value_half.frame))?,
            ));
        }
        for token_half in pending_tokens {
            debug!("token {} has no amount counterpart, ignored", token_half.leaf.path);
        }
        // stable: directives sharing a position keep their emission order
        positioned.sort_by_key(|(pos, _)| *pos);

        let mut discarded = Vec::new();
        for (path, filter) in &spec.fields {
            if matched.contains(path) {
                continue;
            }
            if flat.empty_arrays.iter().any(|empty| path.starts_with(empty)) {
                discarded.push((path.clone(), Eip712FilterParams::from_field_filter(filter, true)));
            } else {
                debug!("filter entry {} matches nothing", path);
            }
        }

        let directives: Vec<Directive> = positioned.into_iter().map(|(_, d)| d).collect();
        info!(
            "filter {}: {} directives, {} discarded paths",
            spec.name,
            directives.len(),
            discarded.len()
        );
        Ok(Resolution {
            name: Some(spec.name.clone()),
            directives,
            field_frames,
            discarded,
        })
    }
}
