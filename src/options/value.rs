use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::error::Error;

/// A JSON-like dynamic value used as the boundary representation for an
/// option's human-readable projection (design choice "(a)").
///
/// Internally, each option kind has a fixed wire grammar (§4.1); `Value` is
/// only how that grammar is expressed to and from callers who don't want to
/// match on a per-kind Rust type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    UInt(u64),
    Bool(bool),
    Str(String),
    Ipv4(Ipv4Addr),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_u64(&self) -> Result<u64, Error> {
        match self {
            Self::UInt(n) => Ok(*n),
            other => Err(Error::InvalidValue(format!("expected an integer, got {other:?}"))),
        }
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(Error::InvalidValue(format!("expected a boolean, got {other:?}"))),
        }
    }

    pub fn as_str(&self) -> Result<&str, Error> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(Error::InvalidValue(format!("expected a string, got {other:?}"))),
        }
    }

    pub fn as_ipv4(&self) -> Result<Ipv4Addr, Error> {
        match self {
            Self::Ipv4(addr) => Ok(*addr),
            Self::Str(s) => s
                .parse()
                .map_err(|_| Error::InvalidValue(format!("'{s}' is not a dotted-quad IPv4 address"))),
            other => Err(Error::InvalidValue(format!("expected an IPv4 address, got {other:?}"))),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], Error> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(Error::InvalidValue(format!("expected a list, got {other:?}"))),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, Value>, Error> {
        match self {
            Self::Map(m) => Ok(m),
            other => Err(Error::InvalidValue(format!("expected a map, got {other:?}"))),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], Error> {
        match self {
            Self::Bytes(b) => Ok(b),
            other => Err(Error::InvalidValue(format!("expected raw bytes, got {other:?}"))),
        }
    }

    pub(crate) fn map_field<'a>(&'a self, field: &str) -> Result<&'a Value, Error> {
        self.as_map()?
            .get(field)
            .ok_or_else(|| Error::InvalidValue(format!("missing field '{field}'")))
    }

    /// Splits `{"name": inner}` into its single name and inner value, as used
    /// by [`crate::options::value_to_bytes`] to recover the arguments
    /// `from_value` expects.
    pub fn as_named(&self) -> Result<(&str, &Value), Error> {
        let map = self.as_map()?;
        let mut iter = map.iter();
        match (iter.next(), iter.next()) {
            (Some((name, inner)), None) => Ok((name.as_str(), inner)),
            _ => Err(Error::InvalidValue(
                "expected a single-entry map of the form {name: value}".into(),
            )),
        }
    }
}

pub fn map(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_named_splits_single_entry_map() {
        let v = map([("client_identifier", map([("hwtype", Value::UInt(1))]))]);
        let (name, inner) = v.as_named().unwrap();
        assert_eq!(name, "client_identifier");
        assert_eq!(inner.as_map().unwrap().get("hwtype"), Some(&Value::UInt(1)));
    }

    #[test]
    fn as_named_rejects_multi_entry_map() {
        let v = map([("a", Value::UInt(1)), ("b", Value::UInt(2))]);
        assert!(v.as_named().is_err());
    }
}
