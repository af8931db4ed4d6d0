//! A minimal synchronous DHCP client implementing the DISCOVER -> OFFER ->
//! REQUEST -> ACK exchange.
//!
//! The client is generic over an `RngCore` so transaction ids stay
//! injectable in tests, and drives a blocking `std::net::UdpSocket` built
//! via [`socket2`] for the broadcast/bind-device socket options the
//! standard library can't set pre-bind.
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::RngCore;
use socket2::{Domain, Socket, Type};

use crate::error::ClientError;
use crate::hwaddr;
use crate::message::MessageType;
use crate::options::{OptionList, Value};
use crate::packet::Packet;

pub const CLIENT_PORT: u16 = 68;
pub const SERVER_PORT: u16 = 67;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_LEASE_REQUEST_OPTIONS: &[u8] = &[1, 3, 6, 15, 51, 54, 58, 59];

/// Configuration for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Network interface to bind the socket to (`SO_BINDTODEVICE`), e.g. `"eth0"`.
    pub interface: Option<String>,
    /// Whether to set `SO_BROADCAST` and use `255.255.255.255` as the
    /// destination when no relay is configured.
    pub send_broadcast: bool,
    /// A specific server to unicast to instead of broadcasting.
    pub server: Option<Ipv4Addr>,
    /// A relay agent address to place in `giaddr`.
    pub relay: Option<Ipv4Addr>,
    /// Additional options to attach to every outgoing packet (e.g. a custom
    /// `parameter_request_list`, `vendor_class_identifier`, ...).
    pub extra_options: Option<OptionList>,
    /// Per-attempt reply timeout; there is no internal retry loop, so
    /// retrying a failed attempt is the caller's responsibility.
    pub timeout: Duration,
    /// Local UDP port to bind. Defaults to the well-known client port 68;
    /// overridable so tests (and setups without `CAP_NET_BIND_SERVICE`) can
    /// use an unprivileged or ephemeral (`0`) port instead.
    pub client_port: u16,
    /// Remote UDP port to send to. Defaults to the well-known server port
    /// 67; overridable for tests against a loopback responder bound to an
    /// ephemeral port.
    pub server_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            interface: None,
            send_broadcast: true,
            server: None,
            relay: None,
            extra_options: None,
            timeout: DEFAULT_TIMEOUT,
            client_port: CLIENT_PORT,
            server_port: SERVER_PORT,
        }
    }
}

/// The outcome of a successful DORA exchange: the four packets exchanged and
/// where the lease came from.
#[derive(Debug, Clone)]
pub struct Lease {
    pub discover: Packet,
    pub offer: Packet,
    pub request: Packet,
    pub ack: Packet,
    pub elapsed_seconds: u16,
    pub server_endpoint: Ipv4Addr,
}

impl Lease {
    pub fn yiaddr(&self) -> Ipv4Addr {
        self.ack.yiaddr
    }

    pub fn lease_time_seconds(&self) -> Option<u32> {
        let option = self.ack.options.by_code(51)?;
        option.value().ok()?.as_u64().ok().map(|n| n as u32)
    }
}

/// A blocking DHCPv4 client bound to one hardware address.
///
/// `T: RngCore` generates transaction ids, so callers can supply a
/// deterministic RNG in tests.
pub struct Client<T> {
    rng: T,
    mac: String,
    config: ClientConfig,
}

impl<T: RngCore> Client<T> {
    pub fn new(rng: T, mac: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            rng,
            mac: mac.into(),
            config,
        }
    }

    fn next_xid(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn bind_socket(&self) -> Result<Socket, ClientError> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
        socket.set_reuse_address(true)?;
        if self.config.send_broadcast {
            socket.set_broadcast(true)?;
        }
        #[cfg(target_os = "linux")]
        if let Some(interface) = &self.config.interface {
            socket.bind_device(Some(interface.as_bytes()))?;
        }
        let addr: SocketAddr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.config.client_port).into();
        socket.bind(&addr.into())?;
        socket.set_read_timeout(Some(self.config.timeout))?;
        Ok(socket)
    }

    fn destination(&self) -> Ipv4Addr {
        self.config
            .server
            .unwrap_or(if self.config.send_broadcast {
                Ipv4Addr::BROADCAST
            } else {
                Ipv4Addr::UNSPECIFIED
            })
    }

    /// Places the configured relay address in `giaddr` and clears the
    /// broadcast flag, per spec.md §4.3 ("when relay is set... the broadcast
    /// flag is cleared; otherwise giaddr is zero").
    fn apply_relay(&self, packet: &mut Packet) {
        if let Some(relay) = self.config.relay {
            packet.giaddr = relay;
            packet.flags &= !Packet::FLAG_BROADCAST;
        }
    }

    /// Runs one full DISCOVER -> OFFER -> REQUEST -> ACK exchange and
    /// returns the resulting [`Lease`]. A DHCPNAK, a timeout on either leg,
    /// or a missing ServerIdentifier in the OFFER are all reported as
    /// [`ClientError`] rather than retried; retrying is the caller's
    /// responsibility.
    pub fn get_lease(&mut self) -> Result<Lease, ClientError> {
        let start = Instant::now();
        let socket = self.bind_socket()?;
        let dest: SocketAddr = SocketAddrV4::new(self.destination(), self.config.server_port).into();

        let xid = self.next_xid();
        let mut discover = Packet::discover(
            &self.mac,
            xid,
            0,
            DEFAULT_LEASE_REQUEST_OPTIONS,
            self.config.extra_options.as_ref(),
        )?;
        self.apply_relay(&mut discover);

        info!("discovering DHCP servers (xid={xid:#010x})");
        socket.send_to(&discover.asbytes(), &dest.into())?;

        let offer = self.receive_matching(&socket, xid, &[MessageType::Offer])?;
        let server_identifier = offer
            .options
            .by_code(54)
            .and_then(|o| o.value().ok())
            .and_then(|v| v.as_ipv4().ok())
            .ok_or(ClientError::ProtocolViolation(
                "OFFER is missing a server_identifier option",
            ))?;

        info!("offered {} by server {server_identifier}", offer.yiaddr);

        let secs = Instant::now().saturating_duration_since(start).as_secs() as u16;
        let mut request = Packet::request(
            &self.mac,
            xid,
            secs,
            offer.yiaddr,
            server_identifier,
            self.config.extra_options.as_ref(),
        )?;
        self.apply_relay(&mut request);

        let request_dest: SocketAddr = SocketAddrV4::new(
            if self.config.send_broadcast {
                Ipv4Addr::BROADCAST
            } else {
                server_identifier
            },
            self.config.server_port,
        )
        .into();
        socket.send_to(&request.asbytes(), &request_dest.into())?;

        let ack = self.receive_matching(&socket, xid, &[MessageType::Ack, MessageType::Nak])?;
        if ack.message_type() == Some(MessageType::Nak) {
            warn!("server {server_identifier} sent DHCPNAK for {}", offer.yiaddr);
            return Err(ClientError::Nak);
        }

        info!("leased {} from {server_identifier}", ack.yiaddr);

        Ok(Lease {
            discover,
            offer,
            request,
            ack,
            elapsed_seconds: Instant::now().saturating_duration_since(start).as_secs() as u16,
            server_endpoint: server_identifier,
        })
    }

    /// Receives datagrams until one matches `xid`, our `chaddr`, op =
    /// BOOTREPLY, and one of `expected`'s message types; packets failing
    /// any of those checks are silently discarded (this "transaction
    /// correlation").
    fn receive_matching(
        &self,
        socket: &Socket,
        xid: u32,
        expected: &[MessageType],
    ) -> Result<Packet, ClientError> {
        let deadline = Instant::now() + self.config.timeout;
        let mut buf = [std::mem::MaybeUninit::new(0u8); 1500];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ClientError::Timeout);
            }
            socket.set_read_timeout(Some(remaining))?;

            let len = match socket.recv(&mut buf) {
                Ok(len) => len,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(ClientError::Timeout);
                }
                Err(e) => return Err(e.into()),
            };

            let bytes: Vec<u8> = buf[..len].iter().map(|b| unsafe { b.assume_init() }).collect();

            let packet = match Packet::from_bytes(&bytes) {
                Ok(packet) => packet,
                Err(e) => {
                    debug!("dropping malformed reply: {e}");
                    continue;
                }
            };

            if !self.is_reply_for_us(&packet, xid) {
                continue;
            }

            if expected.iter().any(|mt| packet.message_type() == Some(*mt)) {
                return Ok(packet);
            }
        }
    }

    /// Compares hardware addresses by parsed bytes rather than raw text, so
    /// a client configured with a dash-separated MAC still matches replies
    /// (always rendered colon-separated by [`Packet::chaddr_str`]).
    fn is_reply_for_us(&self, packet: &Packet, xid: u32) -> bool {
        if packet.op_name() != "BOOTREPLY" || packet.xid != xid {
            return false;
        }
        match hwaddr::parse(&self.mac) {
            Ok(expected) => packet.chaddr[..packet.hlen as usize] == expected[..],
            Err(_) => false,
        }
    }
}

/// Builds the default parameter-request-list value sent with every
/// DISCOVER/REQUEST, as a [`Value`] for callers who want to extend it.
pub fn default_requested_options() -> Value {
    Value::List(
        DEFAULT_LEASE_REQUEST_OPTIONS
            .iter()
            .map(|c| Value::UInt(*c as u64))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DhcpOption;
    use std::net::UdpSocket;
    use std::thread;

    struct StepRng(u32);

    impl RngCore for StepRng {
        fn next_u32(&mut self) -> u32 {
            self.0 = self.0.wrapping_add(1);
            self.0
        }
        fn next_u64(&mut self) -> u64 {
            self.next_u32() as u64
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(4) {
                let bytes = self.next_u32().to_be_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    #[test]
    fn default_requested_options_matches_constant() {
        let value = default_requested_options();
        assert_eq!(value.as_list().unwrap().len(), DEFAULT_LEASE_REQUEST_OPTIONS.len());
    }

    /// Drives a full DORA exchange against a canned loopback responder.
    #[test]
    fn get_lease_completes_dora_against_a_loopback_server() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();
        server.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let client_mac = "02:00:00:00:00:01";
        let offered_ip = Ipv4Addr::new(192, 168, 56, 3);
        let server_ip = *server_addr.ip();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 1500];
            let (len, from) = server.recv_from(&mut buf).unwrap();
            let discover = Packet::from_bytes(&buf[..len]).unwrap();
            assert_eq!(discover.message_type(), Some(MessageType::Discover));

            let mut offer_opts = OptionList::new();
            offer_opts.append(DhcpOption::from_value("server_identifier", &Value::Ipv4(server_ip)).unwrap());
            offer_opts.append(DhcpOption::from_value("lease_time", &Value::UInt(3600)).unwrap());
            let offer = Packet::offer(&discover.chaddr_str(), discover.xid, offered_ip, Some(&offer_opts)).unwrap();
            server.send_to(&offer.asbytes(), from).unwrap();

            let (len, from) = server.recv_from(&mut buf).unwrap();
            let request = Packet::from_bytes(&buf[..len]).unwrap();
            assert_eq!(request.message_type(), Some(MessageType::Request));
            assert_eq!(request.xid, discover.xid);

            let ack = Packet::ack(&request.chaddr_str(), request.xid, offered_ip, Some(&offer_opts)).unwrap();
            server.send_to(&ack.asbytes(), from).unwrap();
        });

        let config = ClientConfig {
            server: Some(*server_addr.ip()),
            send_broadcast: false,
            timeout: Duration::from_secs(2),
            client_port: 0,
            server_port: server_addr.port(),
            ..Default::default()
        };
        let mut client = Client::new(StepRng(0), client_mac, config);

        let lease = client.get_lease().unwrap();
        handle.join().unwrap();

        assert_eq!(lease.yiaddr(), offered_ip);
        assert_eq!(lease.server_endpoint, server_ip);
        assert_eq!(lease.discover.xid, lease.offer.xid);
        assert_eq!(lease.discover.xid, lease.request.xid);
        assert_eq!(lease.discover.xid, lease.ack.xid);
    }

    #[test]
    fn is_reply_for_us_matches_regardless_of_mac_separator_style() {
        let client = Client::new(StepRng(0), "8c-45-00-45-12-09", ClientConfig::default());
        let reply = Packet::ack("8C:45:00:45:12:09", 42, Ipv4Addr::new(10, 0, 0, 1), None).unwrap();
        assert!(client.is_reply_for_us(&reply, 42));
    }
}
