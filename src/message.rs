use num_enum::TryFromPrimitive;

/// DHCP Message Type.
///
/// # Standards
///
/// The semantics of the various DHCP message types are described in RFC 2131
/// (see Table 2). Their numeric values are described in Section 9.6 of RFC
/// 2132, which begins:
///
/// > This option is used to convey the type of the DHCP message. The code for
/// > this option is 53, and its length is 1.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageType {
    /// Client broadcast to locate available servers.
    Discover = 1,
    /// Server to client in response to DHCPDISCOVER with offer of configuration parameters.
    Offer = 2,
    /// Client message requesting offered parameters from one server and
    /// implicitly declining offers from all others, confirming correctness of
    /// a previously allocated address, or extending a lease.
    Request = 3,
    /// Client to server indicating the network address is already in use.
    Decline = 4,
    /// Server to client with configuration parameters, including the committed network address.
    Ack = 5,
    /// Server to client indicating the client's notion of network address is
    /// incorrect or its lease has expired.
    Nak = 6,
    /// Client to server relinquishing a network address and cancelling the remaining lease.
    Release = 7,
    /// Client to server asking only for local configuration parameters.
    Inform = 8,
}

impl MessageType {
    /// The symbolic name used in the human-readable option projection, e.g. `"DHCPDISCOVER"`.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Discover => "DHCPDISCOVER",
            Self::Offer => "DHCPOFFER",
            Self::Request => "DHCPREQUEST",
            Self::Decline => "DHCPDECLINE",
            Self::Ack => "DHCPACK",
            Self::Nak => "DHCPNAK",
            Self::Release => "DHCPRELEASE",
            Self::Inform => "DHCPINFORM",
        }
    }

    /// Parses the symbolic name back into a [`MessageType`]; the inverse of [`MessageType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "DHCPDISCOVER" => Self::Discover,
            "DHCPOFFER" => Self::Offer,
            "DHCPREQUEST" => Self::Request,
            "DHCPDECLINE" => Self::Decline,
            "DHCPACK" => Self::Ack,
            "DHCPNAK" => Self::Nak,
            "DHCPRELEASE" => Self::Release,
            "DHCPINFORM" => Self::Inform,
            _ => return None,
        })
    }
}
