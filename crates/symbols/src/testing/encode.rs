//! Writers for the primitive encodings the readers understand

/// Append an ECMA-335 compressed unsigned integer (at most 0x1FFF_FFFF)
pub fn compressed_u32(out: &mut Vec<u8>, value: u32) {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.extend_from_slice(&((value as u16) | 0x8000).to_be_bytes());
    } else {
        out.extend_from_slice(&((value & 0x1FFF_FFFF) | 0xC000_0000).to_be_bytes());
    }
}

/// Append an ECMA-335 compressed signed integer
pub fn compressed_i32(out: &mut Vec<u8>, value: i32) {
    let (bits, prefix_len) = if (-(1 << 6)..(1 << 6)).contains(&value) {
        (7, 1)
    } else if (-(1 << 13)..(1 << 13)).contains(&value) {
        (14, 2)
    } else {
        (29, 4)
    };
    let mask = (1u32 << bits) - 1;
    let sign = u32::from(value < 0);
    let raw = (((value as u32) << 1) | sign) & mask;
    match prefix_len {
        1 => out.push(raw as u8),
        2 => out.extend_from_slice(&((raw as u16) | 0x8000).to_be_bytes()),
        _ => out.extend_from_slice(&(raw | 0xC000_0000).to_be_bytes()),
    }
}

/// Append a little-endian u16
pub fn u16_le(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a little-endian u32
pub fn u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Pad with zeros to a multiple of `alignment`
pub fn pad_to(out: &mut Vec<u8>, alignment: usize) {
    while out.len() % alignment != 0 {
        out.push(0);
    }
}
