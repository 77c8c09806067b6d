//! Blob signatures the index builder needs
//!
//! - Custom attribute values whose single fixed argument is a `System.Type`
//!   (serialized as a reflection type name string)
//! - `TypeSpec` signatures of generic instantiations used as base types

use super::reader::ByteReader;
use super::tables::TableId;
use crate::error::{SymbolError, SymbolResult};

const CUSTOM_ATTRIBUTE_PROLOG: u16 = 0x0001;
const NULL_STRING: u8 = 0xFF;

const ELEMENT_TYPE_VALUETYPE: u8 = 0x11;
const ELEMENT_TYPE_CLASS: u8 = 0x12;
const ELEMENT_TYPE_GENERICINST: u8 = 0x15;

/// Separator used for nested types in index names
pub const NESTED_SEPARATOR: char = '/';

/// Read the `System.Type` argument of a one-argument custom attribute
///
/// Returns `None` when the argument is a null type.
pub fn read_type_argument(value: &[u8]) -> SymbolResult<Option<String>> {
    let mut r = ByteReader::new(value, "custom attribute value");
    let prolog = r.u16()?;
    if prolog != CUSTOM_ATTRIBUTE_PROLOG {
        return Err(SymbolError::malformed(format!(
            "custom attribute prolog 0x{:04X}",
            prolog
        )));
    }
    if r.remaining() > 0 && value[r.position()] == NULL_STRING {
        return Ok(None);
    }
    let len = r.compressed_u32()? as usize;
    let bytes = r.bytes(len)?;
    let name = std::str::from_utf8(bytes)
        .map_err(|e| SymbolError::malformed(format!("type name is not UTF-8: {}", e)))?;
    Ok(Some(name.to_string()))
}

/// Canonical index form of a type name
///
/// Drops assembly qualification (`, Assembly, Version=...`) outside generic
/// argument brackets and joins nested types with `/` instead of the
/// reflection `+`.
pub fn canonical_type_name(name: &str) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => break,
            _ => {}
        }
        out.push(if c == '+' && depth == 0 {
            NESTED_SEPARATOR
        } else {
            c
        });
    }
    out.trim().to_string()
}

/// Join a namespace and a simple name
pub fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// Name of a nested type under its enclosing type
pub fn nested_name(enclosing: &str, name: &str) -> String {
    format!("{}{}{}", enclosing, NESTED_SEPARATOR, name)
}

/// Generic type definition instantiated by a `TypeSpec` signature
///
/// Only `GENERICINST (CLASS | VALUETYPE) TypeDefOrRefEncoded ...` is
/// understood; any other signature yields `None`.
pub fn generic_instance_target(signature: &[u8]) -> SymbolResult<Option<(TableId, u32)>> {
    let mut r = ByteReader::new(signature, "TypeSpec signature");
    if r.u8()? != ELEMENT_TYPE_GENERICINST {
        return Ok(None);
    }
    let kind = r.u8()?;
    if kind != ELEMENT_TYPE_CLASS && kind != ELEMENT_TYPE_VALUETYPE {
        return Ok(None);
    }
    let encoded = r.compressed_u32()?;
    let row = encoded >> 2;
    let table = match encoded & 0x3 {
        0 => TableId::TypeDef,
        1 => TableId::TypeRef,
        _ => return Ok(None),
    };
    Ok((row != 0).then_some((table, row)))
}
