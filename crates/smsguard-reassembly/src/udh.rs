//! User data header decoding
//!
//! A user data header (UDH) starts with its own length byte (UDHL) followed
//! by information elements, each encoded as `IEI, IEDL, data[IEDL]`. Only
//! the concatenation elements matter here:
//!
//! | IEI    | IEDL | data                               |
//! |--------|------|------------------------------------|
//! | `0x00` | 3    | reference (8 bit), total, sequence |
//! | `0x08` | 4    | reference (16 bit), total, sequence |
//!
//! All other elements are skipped.

use smsguard_core::{ConcatInfo, Error, Result};

const IEI_CONCAT_8BIT: u8 = 0x00;
const IEI_CONCAT_16BIT: u8 = 0x08;

/// Extract concatenation metadata from a raw header.
///
/// Returns `Ok(None)` for a well-formed header without a concatenation
/// element and an error for anything truncated, overrunning, or carrying
/// an invalid part count.
pub fn parse_concat(header: &[u8]) -> Result<Option<ConcatInfo>> {
    let (&udhl, rest) = header
        .split_first()
        .ok_or_else(|| Error::malformed("empty user data header"))?;

    let udhl = udhl as usize;
    if udhl > rest.len() {
        return Err(Error::malformed(format!(
            "header length {} exceeds {} available bytes",
            udhl,
            rest.len()
        )));
    }

    let mut elements = &rest[..udhl];
    let mut found = None;

    while !elements.is_empty() {
        let [iei, iedl, tail @ ..] = elements else {
            return Err(Error::malformed("truncated information element"));
        };
        let iedl = *iedl as usize;
        if iedl > tail.len() {
            return Err(Error::malformed(format!(
                "element 0x{:02x} declares {} bytes, {} remain",
                iei,
                iedl,
                tail.len()
            )));
        }
        let data = &tail[..iedl];

        match *iei {
            IEI_CONCAT_8BIT => {
                let [reference, total, index] = data else {
                    return Err(Error::malformed(format!(
                        "8-bit concatenation element has length {}",
                        iedl
                    )));
                };
                found = Some(ConcatInfo::new(*reference as u32, *total as u32, *index as u32));
            }
            IEI_CONCAT_16BIT => {
                let [hi, lo, total, index] = data else {
                    return Err(Error::malformed(format!(
                        "16-bit concatenation element has length {}",
                        iedl
                    )));
                };
                let reference = u16::from_be_bytes([*hi, *lo]) as u32;
                found = Some(ConcatInfo::new(reference, *total as u32, *index as u32));
            }
            _ => {}
        }

        elements = &tail[iedl..];
    }

    found.map(validate).transpose()
}

/// Reject part counts that can never complete
pub fn validate(info: ConcatInfo) -> Result<ConcatInfo> {
    if info.total_parts == 0 {
        return Err(Error::malformed("concatenation declares zero parts"));
    }
    if info.index > info.total_parts {
        return Err(Error::malformed(format!(
            "part index {} exceeds total {}",
            info.index, info.total_parts
        )));
    }
    Ok(info)
}
