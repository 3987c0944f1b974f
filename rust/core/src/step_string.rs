// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP string literal encoding (ISO 10303-21 section 6.4.3)
//!
//! Printable ASCII is written as-is, apostrophes and backslashes are doubled,
//! everything else goes through `\X2\` (UCS-2) or `\X4\` (UCS-4) control
//! directives. Decoding also understands the legacy `\X\hh` and `\S\c` forms
//! found in files written by older exporters.

/// Encode a Rust string as the body of a STEP string literal (without quotes)
pub fn encode_step_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut wide: Vec<char> = Vec::new();

    for c in value.chars() {
        if (' '..='~').contains(&c) {
            flush_wide(&mut out, &mut wide);
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
        } else {
            wide.push(c);
        }
    }
    flush_wide(&mut out, &mut wide);
    out
}

fn flush_wide(out: &mut String, wide: &mut Vec<char>) {
    if wide.is_empty() {
        return;
    }
    let bmp_only = wide.iter().all(|c| (*c as u32) <= 0xFFFF);
    if bmp_only {
        out.push_str("\\X2\\");
        for c in wide.iter() {
            out.push_str(&format!("{:04X}", *c as u32));
        }
    } else {
        out.push_str("\\X4\\");
        for c in wide.iter() {
            out.push_str(&format!("{:08X}", *c as u32));
        }
    }
    out.push_str("\\X0\\");
    wide.clear();
}

/// Decode the raw body of a STEP string literal (as returned by the tokenizer)
pub fn decode_step_string(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
            out.push('\'');
            i += 2;
            continue;
        }
        if b != b'\\' {
            // Safe: we only split on ASCII boundaries
            let next = next_special(bytes, i);
            out.push_str(&raw[i..next]);
            i = next;
            continue;
        }

        let rest = &raw[i..];
        if rest.starts_with("\\\\") {
            out.push('\\');
            i += 2;
        } else if let Some(body) = rest.strip_prefix("\\X2\\") {
            let (decoded, consumed) = decode_hex_run(body, 4);
            out.push_str(&decoded);
            i += 4 + consumed;
        } else if let Some(body) = rest.strip_prefix("\\X4\\") {
            let (decoded, consumed) = decode_hex_run(body, 8);
            out.push_str(&decoded);
            i += 4 + consumed;
        } else if rest.starts_with("\\X\\") {
            match rest.get(3..5).map(|hex| u8::from_str_radix(hex, 16)) {
                Some(Ok(latin1)) => {
                    out.push(latin1 as char);
                    i += 5;
                }
                _ => {
                    out.push('\\');
                    i += 1;
                }
            }
        } else if rest.starts_with("\\S\\") && rest.len() >= 4 {
            let c = rest[3..].chars().next().unwrap_or(' ');
            out.push(char::from_u32(c as u32 + 128).unwrap_or(c));
            i += 3 + c.len_utf8();
        } else {
            out.push('\\');
            i += 1;
        }
    }

    out
}

fn next_special(bytes: &[u8], from: usize) -> usize {
    let mut j = from + 1;
    while j < bytes.len() && bytes[j] != b'\\' && bytes[j] != b'\'' {
        j += 1;
    }
    j
}

/// Decode `width`-digit hex groups until `\X0\`; returns text and bytes consumed
/// (including the terminator when present)
fn decode_hex_run(body: &str, width: usize) -> (String, usize) {
    let mut units: Vec<u32> = Vec::new();
    let mut pos = 0;

    while pos + width <= body.len() {
        if body[pos..].starts_with("\\X0\\") {
            break;
        }
        match body.get(pos..pos + width).map(|hex| u32::from_str_radix(hex, 16)) {
            Some(Ok(v)) => units.push(v),
            _ => break,
        }
        pos += width;
    }

    let text = if width == 4 {
        let utf16: Vec<u16> = units.iter().map(|u| *u as u16).collect();
        String::from_utf16_lossy(&utf16)
    } else {
        units
            .iter()
            .map(|u| char::from_u32(*u).unwrap_or('\u{FFFD}'))
            .collect()
    };

    if body[pos..].starts_with("\\X0\\") {
        pos += 4;
    }
    (text, pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii_passes_through() {
        assert_eq!(encode_step_string("IMG_0042.jpg"), "IMG_0042.jpg");
        assert_eq!(decode_step_string("IMG_0042.jpg"), "IMG_0042.jpg");
    }

    #[test]
    fn test_apostrophe_and_backslash_are_doubled() {
        let encoded = encode_step_string(r"C:\photos\Ola's.jpg");
        assert_eq!(encoded, r"C:\\photos\\Ola''s.jpg");
        assert_eq!(decode_step_string(&encoded), r"C:\photos\Ola's.jpg");
    }

    #[test]
    fn test_non_ascii_uses_x2_directive() {
        let encoded = encode_step_string("Bjørvika 360°");
        assert_eq!(encoded, "Bj\\X2\\00F8\\X0\\rvika 360\\X2\\00B0\\X0\\");
        assert_eq!(decode_step_string(&encoded), "Bjørvika 360°");
    }

    #[test]
    fn test_astral_plane_uses_x4_directive() {
        let encoded = encode_step_string("pin 📍");
        assert!(encoded.contains("\\X4\\"));
        assert_eq!(decode_step_string(&encoded), "pin 📍");
    }

    #[test]
    fn test_legacy_latin1_escape() {
        assert_eq!(decode_step_string("Tr\\X\\F8ndelag"), "Trøndelag");
    }
}
