//! Permission strings to canonical numeric modes.
//!
//! Servers report permissions either in `ls`-style symbolic notation
//! (`-rwxr-xr-x`) or as an octal string (`0755`). Both are reduced to the
//! nine permission bits, so `parse("-rwxr-xr-x") == parse("0755") == 0o755`.
//! File type and setuid/setgid/sticky bits are not part of the result.

use crate::error::ParseError;

const PERMISSION_BITS: u32 = 0o777;

/// Leading type characters accepted in symbolic notation.
const FILE_TYPES: &[char] = &['-', 'd', 'l', 'c', 'b', 'p', 's', 'D'];

/// Trailing markers some servers append for ACLs or extended attributes.
const ATTRIBUTE_MARKERS: &[char] = &['+', '.', '@'];

/// Parse a symbolic or octal permission string.
pub fn parse(raw: &str) -> Result<u32, ParseError> {
    let raw = raw.trim();
    parse_octal(raw)
        .or_else(|| parse_symbolic(raw))
        .ok_or_else(|| ParseError::Permissions(raw.to_string()))
}

/// Reduce a raw `st_mode` (as returned by stat calls) to its permission bits.
pub fn from_mode(mode: u32) -> u32 {
    mode & PERMISSION_BITS
}

/// Three or four digits, each 0-7. Anything else is not octal, even when it
/// is all digits.
fn parse_octal(raw: &str) -> Option<u32> {
    if !(3..=4).contains(&raw.len()) || !raw.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return None;
    }
    u32::from_str_radix(raw, 8).ok().map(from_mode)
}

fn parse_symbolic(raw: &str) -> Option<u32> {
    let chars: Vec<char> = raw.chars().collect();
    let bits = match chars.len() {
        10 => &chars[1..],
        11 if ATTRIBUTE_MARKERS.contains(&chars[10]) => &chars[1..10],
        _ => return None,
    };
    if !FILE_TYPES.contains(&chars[0]) {
        return None;
    }

    bits.chunks(3)
        .enumerate()
        .try_fold(0, |mode, (index, triplet)| {
            Some((mode << 3) | parse_triplet(triplet, index == 2)?)
        })
}

/// Decode one `rwx` group. `s`/`S` are valid in the owner and group
/// execute slot, `t`/`T` only in the other slot; the lowercase forms imply
/// the execute bit.
fn parse_triplet(triplet: &[char], other: bool) -> Option<u32> {
    let read = match triplet[0] {
        'r' => 4,
        '-' => 0,
        _ => return None,
    };
    let write = match triplet[1] {
        'w' => 2,
        '-' => 0,
        _ => return None,
    };
    let execute = match (triplet[2], other) {
        ('x', _) | ('s', false) | ('t', true) => 1,
        ('-', _) | ('S', false) | ('T', true) => 0,
        _ => return None,
    };
    Some(read | write | execute)
}
