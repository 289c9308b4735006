//! Recipient sanitation.
//!
//! Subjects and bodies interpolate student and book names, so the recipient
//! is the one header value a crafted string could use to inject extra
//! headers or recipients. Anything that could split a header line or a
//! recipient list is rejected outright rather than repaired.

/// Maximum address length (RFC 5321 path limit).
pub const MAX_ADDRESS_LEN: usize = 254;

/// Characters that reject an address outright.
const FORBIDDEN: [char; 7] = ['\n', '\r', '\\', ';', ',', '<', '>'];

/// Return the cleaned address, or `None` when it must not be used.
///
/// Steps: reject empty input; reject any forbidden character; trim; require
/// an `@` and a `.`; drop non-printable characters; reject anything longer
/// than [`MAX_ADDRESS_LEN`] characters.
pub fn sanitize_address(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.contains(&FORBIDDEN[..]) {
        return None;
    }

    let trimmed = raw.trim();
    if !trimmed.contains('@') || !trimmed.contains('.') {
        return None;
    }

    let cleaned: String = trimmed.chars().filter(|c| is_printable(*c)).collect();
    if cleaned.is_empty() || cleaned.chars().count() > MAX_ADDRESS_LEN {
        return None;
    }
    Some(cleaned)
}

/// Printable in the sense of "renders as a glyph or a plain space": control
/// characters, line/paragraph separators, non-space whitespace, the common
/// zero-width/bidi format characters, private-use code points and
/// noncharacters are not.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
            | '\u{E000}'..='\u{F8FF}'
            | '\u{F0000}'..='\u{10FFFF}'
            | '\u{FDD0}'..='\u{FDEF}'
    ) && !is_noncharacter(c)
}

/// U+FFFE and U+FFFF in every plane.
fn is_noncharacter(c: char) -> bool {
    (c as u32) & 0xFFFE == 0xFFFE
}
