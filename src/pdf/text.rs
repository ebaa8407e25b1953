use lopdf::{Object, StringFormat};

const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Encodes a title as a UTF-16BE hex string with a byte order mark, which every reader decodes
/// to the same text regardless of the characters involved.
pub fn encode_title(title: &str) -> Object {
    let mut bytes = Vec::with_capacity(2 + title.len() * 2);
    bytes.extend_from_slice(&UTF16_BOM);
    for unit in title.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decodes a text string object. Returns `None` for anything that is not a string or does not
/// decode cleanly in the encoding its prefix announces.
pub fn decode_title(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };
    let text = if let Some(rest) = bytes.strip_prefix(&UTF16_BOM) {
        decode_utf16_be(rest)?
    } else if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        String::from_utf8(rest.to_vec()).ok()?
    } else {
        decode_pdf_doc_encoding(bytes)?
    };
    Some(text.trim_end_matches('\0').to_string())
}

fn decode_utf16_be(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

fn decode_pdf_doc_encoding(bytes: &[u8]) -> Option<String> {
    bytes.iter().map(|&b| pdf_doc_char(b)).collect()
}

/// PDFDocEncoding agrees with Latin-1 outside of these ranges.
fn pdf_doc_char(byte: u8) -> Option<char> {
    let c = match byte {
        0x18 => '\u{02D8}',
        0x19 => '\u{02C7}',
        0x1A => '\u{02C6}',
        0x1B => '\u{02D9}',
        0x1C => '\u{02DD}',
        0x1D => '\u{02DB}',
        0x1E => '\u{02DA}',
        0x1F => '\u{02DC}',
        0x7F | 0x9F => return None,
        0x80 => '\u{2022}',
        0x81 => '\u{2020}',
        0x82 => '\u{2021}',
        0x83 => '\u{2026}',
        0x84 => '\u{2014}',
        0x85 => '\u{2013}',
        0x86 => '\u{0192}',
        0x87 => '\u{2044}',
        0x88 => '\u{2039}',
        0x89 => '\u{203A}',
        0x8A => '\u{2212}',
        0x8B => '\u{2030}',
        0x8C => '\u{201E}',
        0x8D => '\u{201C}',
        0x8E => '\u{201D}',
        0x8F => '\u{2018}',
        0x90 => '\u{2019}',
        0x91 => '\u{201A}',
        0x92 => '\u{2122}',
        0x93 => '\u{FB01}',
        0x94 => '\u{FB02}',
        0x95 => '\u{0141}',
        0x96 => '\u{0152}',
        0x97 => '\u{0160}',
        0x98 => '\u{0178}',
        0x99 => '\u{017D}',
        0x9A => '\u{0131}',
        0x9B => '\u{0142}',
        0x9C => '\u{0153}',
        0x9D => '\u{0161}',
        0x9E => '\u{017E}',
        0xA0 => '\u{20AC}',
        other => other as char,
    };
    Some(c)
}
