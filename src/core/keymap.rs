// src/core/keymap.rs
use crate::core::types::{is_word_letter, UNMAPPED};
use crate::error::KeyParseError;
use std::fmt::{self, Display, Formatter};

const APOSTROPHE: u8 = b'\'';
const SLOTS: usize = 27; // A–Z, then the apostrophe

/// Partial bijection from cipher letters to plaintext letters.
///
/// `key` maps a cipher slot to its plaintext letter, `used` is a bitset of
/// the plaintext slots already claimed. The map is `Copy`: every search
/// branch works on its own value and nothing is shared between branches.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyMap {
    key: [Option<u8>; SLOTS],
    used: u32,
}

fn slot(c: u8) -> Option<usize> {
    match c {
        b'A'..=b'Z' => Some((c - b'A') as usize),
        APOSTROPHE => Some(SLOTS - 1),
        _ => None,
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMap {
    /// An empty key. The apostrophe always decodes to itself.
    pub fn new() -> Self {
        let mut key = [None; SLOTS];
        key[SLOTS - 1] = Some(APOSTROPHE);
        Self { key, used: 1 << (SLOTS - 1) }
    }

    pub fn get(&self, cipher: u8) -> Option<u8> {
        slot(cipher).and_then(|i| self.key[i])
    }

    /// Whether some cipher letter already decodes to `plain`.
    pub fn is_claimed(&self, plain: u8) -> bool {
        slot(plain).map_or(false, |i| self.used & (1 << i) != 0)
    }

    /// Number of cipher letters A–Z with an assignment.
    pub fn assigned(&self) -> usize {
        self.key[..SLOTS - 1].iter().filter(|k| k.is_some()).count()
    }

    /// Extends the mapping so that `code` decodes to `candidate`, position by
    /// position. Returns the extended copy, or `None` when the words conflict
    /// with the current assignments, with each other, or (unless
    /// `allow_self_mapping`) when a new assignment would decode a letter to
    /// itself. Assignments already in the map are honoured as they are.
    /// `self` is never modified.
    pub fn try_word(&self, code: &[u8], candidate: &[u8], allow_self_mapping: bool) -> Option<KeyMap> {
        if code.len() != candidate.len() {
            return None;
        }
        let mut next = *self;

        for (&c, &p) in code.iter().zip(candidate) {
            let (ci, pi) = (slot(c)?, slot(p)?);
            match next.key[ci] {
                Some(existing) if existing == p => {}
                Some(_) => return None,
                None if next.used & (1 << pi) != 0 => return None,
                None if !allow_self_mapping && c == p => return None,
                None => {
                    next.key[ci] = Some(p);
                    next.used |= 1 << pi;
                }
            }
        }
        Some(next)
    }

    /// Plaintext of `code` when every letter has an assignment.
    pub fn decode_word(&self, code: &[u8]) -> Option<String> {
        code.iter().map(|&c| self.get(c).map(char::from)).collect()
    }

    /// Plaintext of `code` with `_` for letters that are still unknown.
    pub fn decode_partial(&self, code: &[u8]) -> String {
        code.iter().map(|&c| self.get(c).unwrap_or(UNMAPPED) as char).collect()
    }

    /// Plaintext for every cipher letter A–Z, `_` when unassigned.
    pub fn key_row(&self) -> String {
        (b'A'..=b'Z').map(|c| self.get(c).unwrap_or(UNMAPPED) as char).collect()
    }

    /// Parses a partial key such as `A=X, QRS=THE`, case-insensitive. Each
    /// segment pairs cipher letters with plaintext letters position by
    /// position. Any bad segment rejects the whole key.
    pub fn parse_partial(text: &str) -> Result<KeyMap, KeyParseError> {
        let text = text.to_ascii_uppercase();
        let segments: Vec<&str> = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut map = KeyMap::new();
        for segment in segments {
            let (cipher, plain) = segment
                .split_once('=')
                .filter(|(c, p)| {
                    !c.is_empty() && !p.is_empty() && c.bytes().chain(p.bytes()).all(is_word_letter)
                })
                .ok_or_else(|| KeyParseError::Syntax(segment.to_string()))?;
            if cipher.len() != plain.len() {
                return Err(KeyParseError::LengthMismatch(segment.to_string()));
            }
            for (c, p) in cipher.bytes().zip(plain.bytes()) {
                map = map.assign(c, p)?;
            }
        }
        Ok(map)
    }

    /// Single user-supplied assignment. Self-mapping is the user's call here.
    fn assign(&self, cipher: u8, plain: u8) -> Result<KeyMap, KeyParseError> {
        self.try_word(&[cipher], &[plain], true).ok_or(KeyParseError::Conflict {
            cipher: cipher as char,
            plain: plain as char,
        })
    }
}

impl Display for KeyMap {
    /// `A=X B=Y …` for assigned letters A–Z.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in b'A'..=b'Z' {
            if let Some(p) = self.get(c) {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{}={}", c as char, p as char)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for KeyMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "ABCDEFGHIJKLMNOPQRSTUVWXYZ")?;
        writeln!(f, "{}", self.key_row())
    }
}
