//! BOOTP/DHCP packet framing (RFC 2131 §2).
//!
//! `Packet` owns its fixed-size header fields plus an [`crate::options::OptionList`]
//! for the variable-length options region that follows the magic cookie.
use std::net::Ipv4Addr;

use crate::error::Error;
use crate::hwaddr;
use crate::message::MessageType;
use crate::options::{value, DhcpOption, OptionList, Value};

const BOOT_REQUEST: u8 = 1;
const BOOT_REPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;
const HLEN_ETHERNET: u8 = 6;
const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];
const SNAME_LEN: usize = 64;
const FILE_LEN: usize = 128;
const FIXED_HEADER_LEN: usize = 236 + 4; // up to and including the magic cookie
const MIN_PACKET_LEN: usize = 300;
const END: u8 = 255;
const PAD: u8 = 0;

/// A fully decoded BOOTP/DHCP packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; 16],
    pub sname: [u8; SNAME_LEN],
    pub file: [u8; FILE_LEN],
    pub options: OptionList,
}

impl Packet {
    pub const FLAG_BROADCAST: u16 = 0x8000;

    /// Whether this is a client-origin (`BOOTREQUEST`) or server-origin
    /// (`BOOTREPLY`) packet, per the `op` field's symbolic name.
    pub fn op_name(&self) -> &'static str {
        if self.op == BOOT_REPLY {
            "BOOTREPLY"
        } else {
            "BOOTREQUEST"
        }
    }

    pub fn broadcast(&self) -> bool {
        self.flags & Self::FLAG_BROADCAST != 0
    }

    /// Decodes a packet from wire bytes. Rejects buffers shorter than the
    /// 240-octet fixed BOOTP header or whose magic cookie doesn't match RFC
    /// 1497.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < FIXED_HEADER_LEN {
            return Err(Error::MalformedPacket(
                "buffer shorter than the 240-octet fixed BOOTP header",
            ));
        }

        let op = bytes[0];
        let htype = bytes[1];
        let hlen = bytes[2];
        if hlen as usize > 16 {
            return Err(Error::MalformedPacket("hlen exceeds the 16-octet chaddr field"));
        }
        let hops = bytes[3];
        let xid = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        let secs = u16::from_be_bytes(bytes[8..10].try_into().unwrap());
        let flags = u16::from_be_bytes(bytes[10..12].try_into().unwrap());
        let ciaddr = ipv4_at(bytes, 12);
        let yiaddr = ipv4_at(bytes, 16);
        let siaddr = ipv4_at(bytes, 20);
        let giaddr = ipv4_at(bytes, 24);

        let mut chaddr = [0u8; 16];
        chaddr.copy_from_slice(&bytes[28..44]);

        let mut sname = [0u8; SNAME_LEN];
        sname.copy_from_slice(&bytes[44..44 + SNAME_LEN]);

        let mut file = [0u8; FILE_LEN];
        file.copy_from_slice(&bytes[44 + SNAME_LEN..44 + SNAME_LEN + FILE_LEN]);

        let cookie_offset = 44 + SNAME_LEN + FILE_LEN;
        if bytes[cookie_offset..cookie_offset + 4] != MAGIC_COOKIE {
            return Err(Error::MalformedPacket("missing or invalid magic cookie"));
        }

        let options = OptionList::decode(&bytes[cookie_offset + 4..])?;

        Ok(Self {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
            options,
        })
    }

    /// Encodes the packet to wire bytes: the 236-octet fixed header, the
    /// magic cookie, the options area, an END sentinel, and padding out to
    /// the conventional 300-octet minimum BOOTP datagram size.
    pub fn asbytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_PACKET_LEN);
        out.push(self.op);
        out.push(self.htype);
        out.push(self.hlen);
        out.push(self.hops);
        out.extend_from_slice(&self.xid.to_be_bytes());
        out.extend_from_slice(&self.secs.to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&self.ciaddr.octets());
        out.extend_from_slice(&self.yiaddr.octets());
        out.extend_from_slice(&self.siaddr.octets());
        out.extend_from_slice(&self.giaddr.octets());
        out.extend_from_slice(&self.chaddr);
        out.extend_from_slice(&self.sname);
        out.extend_from_slice(&self.file);
        out.extend_from_slice(&MAGIC_COOKIE);
        out.extend_from_slice(&self.options.encode());
        out.push(END);

        while out.len() < MIN_PACKET_LEN {
            out.push(PAD);
        }

        out
    }

    fn template(op: u8, xid: u32, secs: u16, broadcast: bool, chaddr: [u8; 16]) -> Self {
        Self {
            op,
            htype: HTYPE_ETHERNET,
            hlen: HLEN_ETHERNET,
            hops: 0,
            xid,
            secs,
            flags: if broadcast { Self::FLAG_BROADCAST } else { 0 },
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr,
            sname: [0; SNAME_LEN],
            file: [0; FILE_LEN],
            options: OptionList::new(),
        }
    }

    fn chaddr_from_mac(mac: &str) -> Result<[u8; 16], Error> {
        let mac = hwaddr::parse(mac)?;
        if mac.len() != 6 {
            return Err(Error::InvalidValue(format!(
                "hardware address must be 6 bytes, got {}",
                mac.len()
            )));
        }
        let mut chaddr = [0u8; 16];
        chaddr[..6].copy_from_slice(&mac);
        Ok(chaddr)
    }

    /// Builds a DHCPDISCOVER (this template table): broadcast flag set,
    /// `MessageType` = DISCOVER, and the caller's requested-option list if
    /// provided. `opts` are merged in afterwards under the usual
    /// one-per-code replace rule, so a caller-supplied `parameter_request_list`
    /// overrides `requested_options`.
    pub fn discover(
        mac: &str,
        xid: u32,
        secs: u16,
        requested_options: &[u8],
        opts: Option<&OptionList>,
    ) -> Result<Self, Error> {
        let mut packet = Self::template(BOOT_REQUEST, xid, secs, true, Self::chaddr_from_mac(mac)?);
        packet.options.append(message_type_option(MessageType::Discover)?);
        if !requested_options.is_empty() {
            packet.options.append(DhcpOption::from_value(
                "parameter_request_list",
                &Value::List(requested_options.iter().map(|c| Value::UInt(*c as u64)).collect()),
            )?);
        }
        merge_opts(&mut packet, opts);
        Ok(packet)
    }

    /// Builds a DHCPREQUEST in the SELECTING state, echoing the
    /// `requested_ip_address` and `server_identifier` copied from the OFFER
    /// it is responding to.
    pub fn request(
        mac: &str,
        xid: u32,
        secs: u16,
        requested_ip: Ipv4Addr,
        server_identifier: Ipv4Addr,
        opts: Option<&OptionList>,
    ) -> Result<Self, Error> {
        let mut packet = Self::template(BOOT_REQUEST, xid, secs, true, Self::chaddr_from_mac(mac)?);
        packet.options.append(message_type_option(MessageType::Request)?);
        packet
            .options
            .append(DhcpOption::from_value("requested_ip_address", &Value::Ipv4(requested_ip))?);
        packet
            .options
            .append(DhcpOption::from_value("server_identifier", &Value::Ipv4(server_identifier))?);
        merge_opts(&mut packet, opts);
        Ok(packet)
    }

    /// Builds a DHCPOFFER: `MessageType` = OFFER, `yiaddr` set to the offered
    /// address, `hwaddr` parsed into `chaddr` the same way as the other
    /// templates.
    pub fn offer(mac: &str, xid: u32, yiaddr: Ipv4Addr, opts: Option<&OptionList>) -> Result<Self, Error> {
        let mut packet = Self::template(BOOT_REPLY, xid, 0, true, Self::chaddr_from_mac(mac)?);
        packet.yiaddr = yiaddr;
        packet.options.append(message_type_option(MessageType::Offer)?);
        merge_opts(&mut packet, opts);
        Ok(packet)
    }

    /// Builds a DHCPACK: `MessageType` = ACK, `yiaddr` set to the committed
    /// address.
    pub fn ack(mac: &str, xid: u32, yiaddr: Ipv4Addr, opts: Option<&OptionList>) -> Result<Self, Error> {
        let mut packet = Self::template(BOOT_REPLY, xid, 0, true, Self::chaddr_from_mac(mac)?);
        packet.yiaddr = yiaddr;
        packet.options.append(message_type_option(MessageType::Ack)?);
        merge_opts(&mut packet, opts);
        Ok(packet)
    }

    /// The `message_type` option's decoded value, if present.
    pub fn message_type(&self) -> Option<MessageType> {
        let option = self.options.by_code(53)?;
        let byte = *option.data().first()?;
        MessageType::try_from(byte).ok()
    }

    /// The hardware address encoded in the first `hlen` bytes of `chaddr`,
    /// formatted as colon-separated hex (e.g. `"8C:45:00:45:12:09"`).
    pub fn chaddr_str(&self) -> String {
        hwaddr::format(&self.chaddr[..self.hlen as usize])
    }
}

/// Merges `opts` into `packet.options` under the usual one-entry-per-code
/// replace rule, per spec.md §4.2 ("Extra options from opts are merged
/// under the OptionList uniqueness rule").
fn merge_opts(packet: &mut Packet, opts: Option<&OptionList>) {
    if let Some(opts) = opts {
        for option in opts.iter() {
            packet.options.append(option.clone());
        }
    }
}

fn message_type_option(mt: MessageType) -> Result<DhcpOption, Error> {
    DhcpOption::from_value("message_type", &Value::Str(mt.name().to_string()))
}

fn ipv4_at(bytes: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exact capture of an Android DHCPDISCOVER.
    const ANDROID_DISCOVER: &[u8] = &[
        0x01, 0x01, 0x06, 0x00, 0xea, 0xc6, 0x95, 0x57, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x8c, 0x45, 0x00, 0x45,
        0x12, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x63, 0x82, 0x53, 0x63, 0x35, 0x01, 0x01, 0x3d, 0x07, 0x01, 0x8c, 0x45, 0x00, 0x45, 0x12, 0x09,
        0x32, 0x04, 0x00, 0x00, 0x00, 0x00, 0x37, 0x03, 0x01, 0x03, 0x06, 0xff,
    ];

    #[test]
    fn decodes_android_discover() {
        let packet = Packet::from_bytes(ANDROID_DISCOVER).unwrap();
        assert_eq!(packet.op_name(), "BOOTREQUEST");
        assert_eq!(packet.xid, 0xeac69557);
        assert_eq!(packet.chaddr_str(), "8C:45:00:45:12:09");
        assert_eq!(packet.message_type(), Some(MessageType::Discover));
        assert_eq!(
            packet.options.by_code(61).unwrap().value().unwrap(),
            value::map([
                ("hwtype", Value::UInt(1)),
                ("hwaddr", Value::Str("8C:45:00:45:12:09".into())),
            ])
        );
        assert_eq!(
            packet.options.by_code(55).unwrap().data(),
            &[1, 3, 6]
        );
    }

    #[test]
    fn re_encoding_a_decoded_discover_round_trips_the_options() {
        let packet = Packet::from_bytes(ANDROID_DISCOVER).unwrap();
        let re_encoded = Packet::from_bytes(&packet.asbytes()).unwrap();
        assert_eq!(re_encoded.xid, packet.xid);
        assert_eq!(re_encoded.chaddr, packet.chaddr);
        assert_eq!(re_encoded.options, packet.options);
    }

    #[test]
    fn decode_rejects_bad_magic_cookie() {
        let mut bytes = ANDROID_DISCOVER.to_vec();
        bytes[236] = 0;
        assert!(matches!(Packet::from_bytes(&bytes), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert!(matches!(Packet::from_bytes(&[0; 10]), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn decode_rejects_hlen_over_16_instead_of_panicking() {
        let mut bytes = ANDROID_DISCOVER.to_vec();
        bytes[2] = 17;
        assert!(matches!(Packet::from_bytes(&bytes), Err(Error::MalformedPacket(_))));
    }

    #[test]
    fn magic_cookie_stays_at_offset_236_with_non_empty_sname_and_file() {
        let mut packet = Packet::discover("8C:45:00:45:12:09", 1, 0, &[], None).unwrap();
        packet.sname[..4].copy_from_slice(b"srv\0");
        packet.file[..9].copy_from_slice(b"boot.bin\0");

        let bytes = packet.asbytes();
        assert_eq!(&bytes[236..240], &MAGIC_COOKIE);

        let decoded = Packet::from_bytes(&bytes).unwrap();
        assert_eq!(&decoded.sname[..4], b"srv\0");
        assert_eq!(&decoded.file[..9], b"boot.bin\0");
        assert_eq!(decoded.message_type(), Some(MessageType::Discover));
    }

    #[test]
    fn discover_template_sets_broadcast_and_message_type() {
        let packet = Packet::discover("8C:45:00:45:12:09", 42, 0, &[1, 3, 6], None).unwrap();
        assert!(packet.broadcast());
        assert_eq!(packet.message_type(), Some(MessageType::Discover));
        assert_eq!(packet.options.by_code(55).unwrap().data(), &[1, 3, 6]);
    }

    #[test]
    fn encoded_packet_is_at_least_300_bytes() {
        let packet = Packet::discover("8C:45:00:45:12:09", 1, 0, &[], None).unwrap();
        assert!(packet.asbytes().len() >= MIN_PACKET_LEN);
    }

    #[test]
    fn discover_merges_extra_options_and_lets_them_override_the_prl() {
        let mut extra = OptionList::new();
        extra.append(DhcpOption::from_value("host_name", &Value::Str("Galaxy-S9".into())).unwrap());
        extra.append(DhcpOption::from_value(
            "parameter_request_list",
            &Value::List(vec![Value::UInt(1)]),
        ).unwrap());

        let packet = Packet::discover("8C:45:00:45:12:09", 1, 0, &[1, 3, 6], Some(&extra)).unwrap();
        assert_eq!(
            packet.options.by_code(12).unwrap().value().unwrap(),
            Value::Str("Galaxy-S9".into())
        );
        assert_eq!(packet.options.by_code(55).unwrap().data(), &[1]);
    }

    #[test]
    fn offer_and_ack_templates_set_yiaddr_and_message_type() {
        let yiaddr = Ipv4Addr::new(192, 168, 56, 3);
        let offer = Packet::offer("8C:45:00:45:12:09", 7, yiaddr, None).unwrap();
        assert_eq!(offer.op_name(), "BOOTREPLY");
        assert_eq!(offer.yiaddr, yiaddr);
        assert_eq!(offer.message_type(), Some(MessageType::Offer));

        let ack = Packet::ack("8C:45:00:45:12:09", 7, yiaddr, None).unwrap();
        assert_eq!(ack.message_type(), Some(MessageType::Ack));
    }
}
