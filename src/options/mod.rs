//! DHCP option TLV codec and RFC 3396 long-option handling.
//!
//! A [`DhcpOption`] is one *logical* option: its `data` may be the concatenation
//! of several consecutive same-code physical TLVs per RFC 3396, already
//! stitched back together by [`OptionList::decode`]. [`OptionList::encode`]
//! re-splits it the other way on the way out.
pub mod registry;
pub mod value;

use std::fmt;

use crate::error::Error;
use registry::Grammar;
pub use value::Value;

const PAD: u8 = 0;
const END: u8 = 255;

/// Maximum length a single physical TLV can carry; longer logical options
/// are split across several TLVs of this size (RFC 3396).
const MAX_TLV_LEN: usize = 255;

/// One DHCP option: a code and its raw payload.
///
/// The payload is stored decoded (concatenated, per RFC 3396) rather than as
/// wire bytes; [`DhcpOption::value`] additionally projects it into a
/// human-readable [`Value`] using the code's registered grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpOption {
    code: u8,
    data: Vec<u8>,
}

impl DhcpOption {
    pub fn new(code: u8, data: Vec<u8>) -> Self {
        Self { code, data }
    }

    pub const fn code(&self) -> u8 {
        self.code
    }

    /// The logical length of this option's data. May exceed 255 even though
    /// no single wire TLV can: RFC 3396 options are concatenated in memory
    /// and re-split into multiple TLVs by [`OptionList::encode`].
    pub fn length(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Projects this option's raw bytes into a human-readable [`Value`]
    /// using the registered grammar for its code. Unregistered codes project
    /// as `{"unknown": "<hex>"}`.
    pub fn value(&self) -> Result<Value, Error> {
        match registry::entry_by_code(self.code) {
            Some(entry) => registry::decode_value(self.code, entry.grammar, &self.data),
            None => Ok(value::map([(
                "unknown",
                Value::Str(hex::encode(&self.data)),
            )])),
        }
    }

    /// Encodes this option's logical payload as one or more wire TLVs
    /// (`code`, `len`, `data...`), splitting at [`MAX_TLV_LEN`] boundaries
    /// per RFC 3396. PAD and END are single bytes with no length/data.
    pub fn asbytes(&self) -> Vec<u8> {
        if self.code == PAD || self.code == END {
            return vec![self.code];
        }

        if self.data.is_empty() {
            return vec![self.code, 0];
        }

        let mut out = Vec::with_capacity(self.data.len() + self.data.len() / MAX_TLV_LEN * 2 + 2);
        for chunk in self.data.chunks(MAX_TLV_LEN) {
            out.push(self.code);
            out.push(chunk.len() as u8);
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Builds an option from a selector (name or code) and a [`Value`],
    /// encoding it per the selected code's registered grammar.
    pub fn from_value<'a>(selector: impl Into<Selector<'a>>, value: &Value) -> Result<Self, Error> {
        let selector = selector.into();
        let entry = selector.resolve()?;
        let data = registry::encode_value(entry.code, entry.grammar, value)?;
        Ok(Self::new(entry.code, data))
    }

    /// Builds an option from a numeric code and its already-unwrapped
    /// (non-named) value, e.g. `from_short_value(53, Value::Str("DHCPDISCOVER"))`.
    pub fn from_short_value(code: u8, value: &Value) -> Result<Self, Error> {
        let entry = registry::entry_by_code(code)
            .ok_or_else(|| Error::UnknownOption(format!("code {code}")))?;
        let data = registry::encode_value(entry.code, entry.grammar, value)?;
        Ok(Self::new(entry.code, data))
    }
}

/// Selects a registry entry either by its canonical snake_case name or its
/// numeric code.
#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    Name(&'a str),
    Code(u8),
}

impl<'a> From<&'a str> for Selector<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<u8> for Selector<'static> {
    fn from(code: u8) -> Self {
        Self::Code(code)
    }
}

impl Selector<'_> {
    fn resolve(&self) -> Result<&'static registry::Entry, Error> {
        match self {
            Self::Name(name) => registry::entry_by_name(name)
                .ok_or_else(|| Error::UnknownOption((*name).to_string())),
            Self::Code(code) => registry::entry_by_code(*code)
                .ok_or_else(|| Error::UnknownOption(format!("code {code}"))),
        }
    }
}

/// Reads a single *physical* TLV at `offset`, returning it along with the
/// offset just past it. PAD and END are represented as zero-length options
/// so callers can distinguish "no more bytes" from "hit END".
pub fn decode_one(bytes: &[u8], offset: usize) -> Result<(DhcpOption, usize), Error> {
    let code = *bytes
        .get(offset)
        .ok_or(Error::TruncatedOption)?;

    if code == PAD || code == END {
        return Ok((DhcpOption::new(code, Vec::new()), offset + 1));
    }

    let len = *bytes
        .get(offset + 1)
        .ok_or(Error::TruncatedOption)? as usize;
    let start = offset + 2;
    let end = start + len;
    let data = bytes.get(start..end).ok_or(Error::TruncatedOption)?;
    Ok((DhcpOption::new(code, data.to_vec()), end))
}

/// An ordered collection of options with at most one entry per code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionList {
    options: Vec<DhcpOption>,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DhcpOption> {
        self.options.iter()
    }

    pub fn by_code(&self, code: u8) -> std::option::Option<&DhcpOption> {
        self.options.iter().find(|o| o.code == code)
    }

    pub fn by_name(&self, name: &str) -> std::option::Option<&DhcpOption> {
        let code = registry::entry_by_name(name)?.code;
        self.by_code(code)
    }

    /// Appends `option`, replacing any existing entry with the same code in
    /// place (default, non-strict behavior).
    pub fn append(&mut self, option: DhcpOption) {
        if let Some(existing) = self.options.iter_mut().find(|o| o.code == option.code) {
            *existing = option;
        } else {
            self.options.push(option);
        }
    }

    /// Like [`OptionList::append`], but raises [`Error::DuplicateOptionCode`]
    /// instead of silently replacing (strict mode).
    pub fn try_append_strict(&mut self, option: DhcpOption) -> Result<(), Error> {
        if self.options.iter().any(|o| o.code == option.code) {
            return Err(Error::DuplicateOptionCode(option.code));
        }
        self.options.push(option);
        Ok(())
    }

    /// Decodes the options area of a packet (non-strict: duplicate codes
    /// replace in place). Consecutive same-code TLVs are concatenated per
    /// RFC 3396; PAD bytes are dropped; decoding stops at END without
    /// storing it.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        Self::decode_impl(bytes, false)
    }

    /// Like [`OptionList::decode`], but raises [`Error::DuplicateOptionCode`]
    /// if the same code appears as two non-adjacent options.
    pub fn decode_strict(bytes: &[u8]) -> Result<Self, Error> {
        Self::decode_impl(bytes, true)
    }

    fn decode_impl(bytes: &[u8], strict: bool) -> Result<Self, Error> {
        let mut list = Self::new();
        let mut offset = 0;
        let mut last_code: std::option::Option<u8> = None;

        while offset < bytes.len() {
            let (option, next) = decode_one(bytes, offset)?;
            offset = next;

            if option.code == PAD {
                last_code = None;
                continue;
            }
            if option.code == END {
                break;
            }

            if last_code == Some(option.code) {
                // RFC 3396: a run of consecutive same-code TLVs is one logical option.
                list.options.last_mut().unwrap().data.extend_from_slice(&option.data);
            } else if let Some(existing) = list.options.iter_mut().find(|o| o.code == option.code) {
                if strict {
                    return Err(Error::DuplicateOptionCode(option.code));
                }
                *existing = option;
            } else {
                list.options.push(option);
            }

            last_code = Some(list.options.last().unwrap().code);
        }

        Ok(list)
    }

    /// Encodes the option list as wire bytes, automatically re-splitting any
    /// logical option longer than 255 bytes into multiple TLVs. Does not
    /// append the END sentinel; callers (e.g. [`crate::packet::Packet`])
    /// append it once for the whole packet.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for option in &self.options {
            out.extend_from_slice(&option.asbytes());
        }
        out
    }
}

/// `bytes_to_object(bytes)`: decodes one physical TLV starting at
/// offset 0 into a [`DhcpOption`].
pub fn bytes_to_object(bytes: &[u8]) -> Result<DhcpOption, Error> {
    let (option, _) = decode_one(bytes, 0)?;
    Ok(option)
}

/// `value_to_object(selector, value)`: builds the [`DhcpOption`] a
/// structured value encodes to, looking up the grammar by name or code.
pub fn value_to_object<'a>(selector: impl Into<Selector<'a>>, value: &Value) -> Result<DhcpOption, Error> {
    DhcpOption::from_value(selector, value)
}

/// `short_value_to_object(code, value)`: like [`value_to_object`]
/// but addressed by numeric code and an already-unwrapped value.
pub fn short_value_to_object(code: u8, value: &Value) -> Result<DhcpOption, Error> {
    DhcpOption::from_short_value(code, value)
}

/// `value_to_bytes(value)`: the single-argument form where `value`
/// is a one-entry map `{name: inner}`, e.g.
/// `{"client_identifier": {"hwtype": 1, "hwaddr": "..."}}`. Encodes straight
/// to wire bytes (code, length, payload).
pub fn value_to_bytes(value: &Value) -> Result<Vec<u8>, Error> {
    let (name, inner) = value.as_named()?;
    Ok(DhcpOption::from_value(name, inner)?.asbytes())
}

/// Minimal hex encoding for the `{"unknown": "<hex>"}` projection of codes
/// absent from the registry; kept local rather than pulling in a `hex`
/// crate dependency for one call site.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for DhcpOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option({}, {} bytes)", self.code, self.data.len())
    }
}
