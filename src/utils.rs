use alloc::{
    borrow::ToOwned,
    format,
    string::{String, ToString},
    vec::Vec,
};
use alloy_primitives::{I256, U256};
use chrono::DateTime;

pub fn parse_utf8_string(data: &[u8]) -> Result<String, &'static str> {
    String::from_utf8(data.to_owned()).map_err(|_| "Invalid UTF-8 in custom type")
}

pub fn parse_u64(data: &[u8]) -> Result<u64, &'static str> {
    if data.len() > 8 {
        return Err("invalid data len");
    }
    let mut buf = [0u8; 8];
    buf[8 - data.len()..].copy_from_slice(data);
    Ok(u64::from_be_bytes(buf))
}

/// Sign-extend a two's complement big-endian integer to 256 bits
pub fn parse_i256(data: &[u8]) -> Result<I256, &'static str> {
    if data.is_empty() || data.len() > 32 {
        return Err("invalid data len");
    }
    let sign = if data[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [sign; 32];
    buf[32 - data.len()..].copy_from_slice(data);
    Ok(I256::from_be_bytes(buf))
}

pub fn parse_u256(data: &[u8]) -> Result<U256, &'static str> {
    if data.len() > 32 {
        return Err("invalid data len");
    }
    let mut buf = [0; 32];
    buf[32 - data.len()..].copy_from_slice(data);
    Ok(U256::from_be_bytes(buf))
}

/// Minimal big-endian encoding, at least one byte
pub fn u256_to_minimal_bytes(value: &U256) -> Vec<u8> {
    let bytes = value.to_be_bytes::<32>();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(31);
    bytes[start..].to_vec()
}

/// Largest value representable by an unsigned integer of `size` bytes
pub fn uint_max(size: u8) -> U256 {
    if size >= 32 {
        U256::MAX
    } else {
        (U256::from(1u8) << (size as usize * 8)) - U256::from(1u8)
    }
}

/// Render `value / 10^decimals` without trailing fractional zeros
pub fn format_units(value: &U256, decimals: u8) -> Option<String> {
    let scale = U256::from(10u8).checked_pow(U256::from(decimals))?;
    let int_part = *value / scale;
    if decimals == 0 {
        return Some(format!("{}", int_part));
    }
    let frac = format!("{:0>width$}", (*value % scale).to_string(), width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        Some(format!("{}", int_part))
    } else {
        Some(format!("{}.{}", int_part, frac))
    }
}

pub fn format_datetime(timestamp: &U256) -> Option<String> {
    if timestamp.bit_len() > 63 {
        return None;
    }
    let secs = timestamp.as_limbs()[0] as i64;
    let dt = DateTime::from_timestamp(secs, 0)?;
    Some(dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
