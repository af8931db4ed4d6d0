//! The static code -> kind registry.
//!
//! Every RFC 2132 option code (1-61) is dispatched through one of a small set
//! of wire grammars (this "Wire grammars" table); this module is the
//! data-driven table the design notes (§9) call for, in place of a class
//! hierarchy per variant.
use std::net::Ipv4Addr;

use crate::error::Error;
use crate::hwaddr;
use crate::message::MessageType;
use crate::options::value::{map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    U8,
    U16,
    U32,
    I32,
    Bool,
    Ipv4,
    Ipv4List,
    Text,
    U8List,
    U16List,
    MessageType,
    ClientIdentifier,
    /// Pairs of (destination, router) IPv4 addresses — option 33 (Static Route).
    Ipv4PairList,
    /// Pairs of (address, mask) IPv4 addresses — option 21 (Policy Filter).
    Ipv4AddressMaskList,
    Opaque,
}

/// One entry of the registry: the canonical snake_case name and wire grammar
/// for a given option code.
pub struct Entry {
    pub code: u8,
    pub name: &'static str,
    pub grammar: Grammar,
}

macro_rules! registry {
    ($(($code:expr, $name:expr, $grammar:expr)),* $(,)?) => {
        const REGISTRY: &[Entry] = &[
            $(Entry { code: $code, name: $name, grammar: $grammar }),*
        ];
    };
}

use Grammar::*;

registry! {
    (1, "subnet_mask", Ipv4),
    (2, "time_offset", I32),
    (3, "router", Ipv4List),
    (4, "time_server", Ipv4List),
    (5, "name_server", Ipv4List),
    (6, "domain_name_server", Ipv4List),
    (7, "log_server", Ipv4List),
    (8, "cookie_server", Ipv4List),
    (9, "lpr_server", Ipv4List),
    (10, "impress_server", Ipv4List),
    (11, "resource_location_server", Ipv4List),
    (12, "host_name", Text),
    (13, "boot_file_size", U16),
    (14, "merit_dump_file", Text),
    (15, "domain_name", Text),
    (16, "swap_server", Ipv4),
    (17, "root_path", Text),
    (18, "extensions_path", Text),
    (19, "ip_forwarding", Bool),
    (20, "non_local_source_routing", Bool),
    (21, "policy_filter", Ipv4AddressMaskList),
    (22, "max_datagram_reassembly_size", U16),
    (23, "default_ip_ttl", U8),
    (24, "path_mtu_aging_timeout", U32),
    (25, "path_mtu_plateau_table", U16List),
    (26, "interface_mtu", U16),
    (27, "all_subnets_local", Bool),
    (28, "broadcast_address", Ipv4),
    (29, "perform_mask_discovery", Bool),
    (30, "mask_supplier", Bool),
    (31, "perform_router_discovery", Bool),
    (32, "router_solicitation_address", Ipv4),
    (33, "static_route", Ipv4PairList),
    (34, "trailer_encapsulation", Bool),
    (35, "arp_cache_timeout", U32),
    (36, "ethernet_encapsulation", Bool),
    (37, "tcp_default_ttl", U8),
    (38, "tcp_keepalive_interval", U32),
    (39, "tcp_keepalive_garbage", Bool),
    (40, "nis_domain", Text),
    (41, "nis_servers", Ipv4List),
    (42, "ntp_servers", Ipv4List),
    (43, "vendor_specific", Opaque),
    (44, "netbios_name_server", Ipv4List),
    (45, "netbios_datagram_distribution_server", Ipv4List),
    (46, "netbios_node_type", U8),
    (47, "netbios_scope", Text),
    (48, "x_font_server", Ipv4List),
    (49, "x_display_manager", Ipv4List),
    (50, "requested_ip_address", Ipv4),
    (51, "lease_time", U32),
    (52, "option_overload", U8),
    (53, "message_type", MessageType),
    (54, "server_identifier", Ipv4),
    (55, "parameter_request_list", U8List),
    (56, "message", Text),
    (57, "max_dhcp_message_size", U16),
    (58, "renewal_time", U32),
    (59, "rebinding_time", U32),
    (60, "vendor_class_identifier", Text),
    (61, "client_identifier", ClientIdentifier),
}

pub fn entry_by_code(code: u8) -> Option<&'static Entry> {
    REGISTRY.iter().find(|e| e.code == code)
}

pub fn entry_by_name(name: &str) -> Option<&'static Entry> {
    REGISTRY.iter().find(|e| e.name == name)
}

/// Decodes `data` per `code`'s wire grammar into its human-readable
/// [`Value`] projection. A code absent from the registry is handled by the
/// caller (see [`crate::options::Option::value`]), not here.
pub fn decode_value(code: u8, grammar: Grammar, data: &[u8]) -> Result<Value, Error> {
    match grammar {
        U8 => Ok(Value::UInt(single_byte(code, data)? as u64)),
        U16 => Ok(Value::UInt(u16::from_be_bytes(fixed_arr(code, data)?) as u64)),
        U32 => Ok(Value::UInt(u32::from_be_bytes(fixed_arr(code, data)?) as u64)),
        I32 => Ok(Value::UInt(i32::from_be_bytes(fixed_arr(code, data)?) as u32 as u64)),
        Bool => Ok(Value::Bool(single_byte(code, data)? != 0)),
        Ipv4 => Ok(Value::Ipv4(single_ip(code, data)?)),
        Ipv4List => Ok(Value::List(ip_list(code, data)?.into_iter().map(Value::Ipv4).collect())),
        Text => Ok(Value::Str(
            std::str::from_utf8(data)
                .map_err(|_| Error::InvalidValue(format!("option {code} is not valid UTF-8")))?
                .to_string(),
        )),
        U8List => Ok(Value::List(data.iter().map(|b| Value::UInt(*b as u64)).collect())),
        U16List => {
            if data.len() % 2 != 0 || data.is_empty() {
                return Err(Error::InvalidValue(format!(
                    "option {code} must be a non-empty multiple of 2 bytes, got {}",
                    data.len()
                )));
            }
            Ok(Value::List(
                data.chunks_exact(2)
                    .map(|c| Value::UInt(u16::from_be_bytes([c[0], c[1]]) as u64))
                    .collect(),
            ))
        }
        MessageType => {
            let byte = single_byte(code, data)?;
            let mt = MessageType::try_from(byte)
                .map_err(|_| Error::InvalidValue(format!("{byte} is not a valid DHCP message type")))?;
            Ok(Value::Str(mt.name().to_string()))
        }
        ClientIdentifier => {
            if data.is_empty() {
                return Err(Error::InvalidValue("client_identifier option is empty".into()));
            }
            Ok(map([
                ("hwtype", Value::UInt(data[0] as u64)),
                ("hwaddr", Value::Str(hwaddr::format(&data[1..]))),
            ]))
        }
        Ipv4PairList => {
            if data.len() % 8 != 0 || data.is_empty() {
                return Err(Error::InvalidValue(format!(
                    "option {code} must be a non-empty multiple of 8 bytes, got {}",
                    data.len()
                )));
            }
            Ok(Value::List(
                data.chunks_exact(8)
                    .map(|c| {
                        map([
                            ("destination", Value::Ipv4(ipv4_from(&c[0..4]))),
                            ("router", Value::Ipv4(ipv4_from(&c[4..8]))),
                        ])
                    })
                    .collect(),
            ))
        }
        Ipv4AddressMaskList => {
            if data.len() % 8 != 0 || data.is_empty() {
                return Err(Error::InvalidValue(format!(
                    "option {code} must be a non-empty multiple of 8 bytes, got {}",
                    data.len()
                )));
            }
            Ok(Value::List(
                data.chunks_exact(8)
                    .map(|c| {
                        map([
                            ("address", Value::Ipv4(ipv4_from(&c[0..4]))),
                            ("mask", Value::Ipv4(ipv4_from(&c[4..8]))),
                        ])
                    })
                    .collect(),
            ))
        }
        Opaque => Ok(Value::Bytes(data.to_vec())),
    }
}

/// Encodes a [`Value`] against `code`'s wire grammar, producing the TLV
/// payload bytes (not including the code/length prefix).
pub fn encode_value(code: u8, grammar: Grammar, value: &Value) -> Result<Vec<u8>, Error> {
    match grammar {
        U8 => Ok(vec![u8_range(code, value.as_u64()?)?]),
        U16 => Ok(u16_range(code, value.as_u64()?)?.to_be_bytes().to_vec()),
        U32 => Ok(u32_range(code, value.as_u64()?)?.to_be_bytes().to_vec()),
        I32 => Ok((value.as_u64()? as u32 as i32).to_be_bytes().to_vec()),
        Bool => Ok(vec![value.as_bool()? as u8]),
        Ipv4 => Ok(value.as_ipv4()?.octets().to_vec()),
        Ipv4List => {
            let addrs = value.as_list()?;
            if addrs.is_empty() {
                return Err(Error::InvalidValue(format!("option {code} requires at least one address")));
            }
            let mut out = Vec::with_capacity(addrs.len() * 4);
            for a in addrs {
                out.extend_from_slice(&a.as_ipv4()?.octets());
            }
            Ok(out)
        }
        Text => Ok(value.as_str()?.as_bytes().to_vec()),
        U8List => {
            let codes = value.as_list()?;
            codes.iter().map(|v| Ok(u8_range(code, v.as_u64()?)?)).collect()
        }
        U16List => {
            let items = value.as_list()?;
            if items.is_empty() {
                return Err(Error::InvalidValue(format!("option {code} requires at least one entry")));
            }
            let mut out = Vec::with_capacity(items.len() * 2);
            for v in items {
                out.extend_from_slice(&u16_range(code, v.as_u64()?)?.to_be_bytes());
            }
            Ok(out)
        }
        MessageType => {
            let name = value.as_str()?;
            let mt = MessageType::from_name(name)
                .ok_or_else(|| Error::InvalidValue(format!("'{name}' is not a valid DHCP message type")))?;
            Ok(vec![mt as u8])
        }
        ClientIdentifier => {
            let hwtype = u8_range(code, value.map_field("hwtype")?.as_u64()?)?;
            let hwaddr = hwaddr::parse(value.map_field("hwaddr")?.as_str()?)?;
            let mut out = Vec::with_capacity(1 + hwaddr.len());
            out.push(hwtype);
            out.extend_from_slice(&hwaddr);
            Ok(out)
        }
        Ipv4PairList => {
            let pairs = value.as_list()?;
            if pairs.is_empty() {
                return Err(Error::InvalidValue(format!("option {code} requires at least one pair")));
            }
            let mut out = Vec::with_capacity(pairs.len() * 8);
            for pair in pairs {
                out.extend_from_slice(&pair.map_field("destination")?.as_ipv4()?.octets());
                out.extend_from_slice(&pair.map_field("router")?.as_ipv4()?.octets());
            }
            Ok(out)
        }
        Ipv4AddressMaskList => {
            let pairs = value.as_list()?;
            if pairs.is_empty() {
                return Err(Error::InvalidValue(format!("option {code} requires at least one pair")));
            }
            let mut out = Vec::with_capacity(pairs.len() * 8);
            for pair in pairs {
                out.extend_from_slice(&pair.map_field("address")?.as_ipv4()?.octets());
                out.extend_from_slice(&pair.map_field("mask")?.as_ipv4()?.octets());
            }
            Ok(out)
        }
        Opaque => Ok(value.as_bytes()?.to_vec()),
    }
}

fn single_byte(code: u8, data: &[u8]) -> Result<u8, Error> {
    match data {
        [b] => Ok(*b),
        _ => Err(Error::InvalidValue(format!(
            "option {code} must be exactly 1 byte, got {}",
            data.len()
        ))),
    }
}

fn fixed_arr<const N: usize>(code: u8, data: &[u8]) -> Result<[u8; N], Error> {
    data.try_into().map_err(|_| {
        Error::InvalidValue(format!("option {code} must be exactly {N} bytes, got {}", data.len()))
    })
}

fn ipv4_from(bytes: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

fn single_ip(code: u8, data: &[u8]) -> Result<Ipv4Addr, Error> {
    Ok(ipv4_from(&fixed_arr::<4>(code, data)?))
}

fn ip_list(code: u8, data: &[u8]) -> Result<Vec<Ipv4Addr>, Error> {
    if data.len() % 4 != 0 || data.is_empty() {
        return Err(Error::InvalidValue(format!(
            "option {code} must be a non-empty multiple of 4 bytes, got {}",
            data.len()
        )));
    }
    Ok(data.chunks_exact(4).map(ipv4_from).collect())
}

fn u8_range(code: u8, n: u64) -> Result<u8, Error> {
    u8::try_from(n).map_err(|_| Error::InvalidValue(format!("option {code} value {n} out of range for u8")))
}

fn u16_range(code: u8, n: u64) -> Result<u16, Error> {
    u16::try_from(n).map_err(|_| Error::InvalidValue(format!("option {code} value {n} out of range for u16")))
}

fn u32_range(code: u8, n: u64) -> Result<u32, Error> {
    u32::try_from(n).map_err(|_| Error::InvalidValue(format!("option {code} value {n} out of range for u32")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_1_to_61_is_registered() {
        for code in 1..=61u8 {
            assert!(entry_by_code(code).is_some(), "missing registry entry for code {code}");
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = REGISTRY.iter().map(|e| e.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REGISTRY.len());
    }

    #[test]
    fn message_type_round_trips_through_value() {
        let bytes = encode_value(53, MessageType, &Value::Str("DHCPDISCOVER".into())).unwrap();
        assert_eq!(bytes, vec![1]);
        let value = decode_value(53, MessageType, &bytes).unwrap();
        assert_eq!(value, Value::Str("DHCPDISCOVER".into()));
    }

    #[test]
    fn client_identifier_round_trips() {
        let value = map([
            ("hwtype", Value::UInt(1)),
            ("hwaddr", Value::Str("8C:45:00:45:12:09".into())),
        ]);
        let bytes = encode_value(61, ClientIdentifier, &value).unwrap();
        assert_eq!(bytes, vec![0x01, 0x8c, 0x45, 0x00, 0x45, 0x12, 0x09]);
    }

    #[test]
    fn static_route_pairs_round_trip() {
        let a = Ipv4Addr::new(10, 0, 0, 0);
        let b = Ipv4Addr::new(10, 0, 0, 1);
        let value = Value::List(vec![map([
            ("destination", Value::Ipv4(a)),
            ("router", Value::Ipv4(b)),
        ])]);
        let bytes = encode_value(33, Ipv4PairList, &value).unwrap();
        assert_eq!(bytes, vec![10, 0, 0, 0, 10, 0, 0, 1]);
        assert_eq!(decode_value(33, Ipv4PairList, &bytes).unwrap(), value);
    }

    #[test]
    fn policy_filter_pairs_project_as_address_and_mask_not_router() {
        let a = Ipv4Addr::new(10, 0, 0, 0);
        let b = Ipv4Addr::new(255, 255, 255, 0);
        let value = Value::List(vec![map([
            ("address", Value::Ipv4(a)),
            ("mask", Value::Ipv4(b)),
        ])]);
        let bytes = encode_value(21, Ipv4AddressMaskList, &value).unwrap();
        assert_eq!(bytes, vec![10, 0, 0, 0, 255, 255, 255, 0]);
        assert_eq!(decode_value(21, Ipv4AddressMaskList, &bytes).unwrap(), value);
        assert!(entry_by_code(21).unwrap().grammar == Ipv4AddressMaskList);
    }
}
