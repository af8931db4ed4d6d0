//! A codec and minimal client for DHCP over IPv4 (RFC 2131 / RFC 2132).
//!
//! The crate is organized the way the option registry itself is: a small
//! set of wire grammars dispatched by code, rather than one type per option.
//! [`options`] holds the TLV codec and the code/name/grammar table,
//! [`packet`] the BOOTP framing around it, and [`client`] a blocking DORA
//! state machine built on top of both.
pub mod client;
pub mod error;
pub mod hwaddr;
pub mod message;
pub mod options;
pub mod packet;

pub use client::{Client, ClientConfig, Lease};
pub use error::{ClientError, Error};
pub use message::MessageType;
pub use options::{
    bytes_to_object, short_value_to_object, value_to_bytes, value_to_object, DhcpOption, OptionList,
    Selector, Value,
};
pub use packet::Packet;
