use std::fmt;

/// Errors raised by the option and packet codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The packet is shorter than the 240-octet fixed BOOTP header, or an
    /// option's declared length runs past the end of the buffer.
    MalformedPacket(&'static str),
    /// An option's declared `length` byte exceeds the bytes remaining in the
    /// enclosing buffer.
    TruncatedOption,
    /// `from_value`/`from_short_value` was asked for an option name that
    /// isn't in the registry.
    UnknownOption(String),
    /// A structured value didn't fit the grammar of the option kind it was
    /// encoded against (wrong arity, out-of-range integer, non-UTF8 text,
    /// malformed dotted-quad, ...).
    InvalidValue(String),
    /// An `OptionList` insert in strict mode found the code already present.
    DuplicateOptionCode(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPacket(why) => write!(f, "malformed DHCP packet: {why}"),
            Self::TruncatedOption => write!(f, "option length exceeds remaining buffer"),
            Self::UnknownOption(name) => write!(f, "unknown DHCP option: {name}"),
            Self::InvalidValue(why) => write!(f, "invalid option value: {why}"),
            Self::DuplicateOptionCode(code) => write!(f, "duplicate option code: {code}"),
        }
    }
}

impl std::error::Error for Error {}

/// Errors raised by the client state machine.
///
/// Wraps [`Error`] the way `edge-dhcp::io::Error<E>` wraps the codec's own
/// error alongside the transport error, generalized to the client's own
/// failure modes (timeout, NAK, protocol violation) called out in this.
#[derive(Debug)]
pub enum ClientError {
    /// The codec rejected a packet we tried to encode or a reply we tried to
    /// decode.
    Codec(Error),
    /// An OS-level socket failure (bind, send, recv, setsockopt, ...).
    Socket(std::io::Error),
    /// No matching OFFER or ACK arrived before the per-attempt deadline.
    Timeout,
    /// The server replied with DHCPNAK.
    Nak,
    /// A reply lacked an option required for the exchange to proceed (e.g. no
    /// ServerIdentifier in an OFFER).
    ProtocolViolation(&'static str),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "DHCP codec error: {e}"),
            Self::Socket(e) => write!(f, "socket error: {e}"),
            Self::Timeout => write!(f, "timed out waiting for a DHCP reply"),
            Self::Nak => write!(f, "DHCP server returned DHCPNAK"),
            Self::ProtocolViolation(why) => write!(f, "protocol violation: {why}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Socket(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for ClientError {
    fn from(value: Error) -> Self {
        Self::Codec(value)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(value: std::io::Error) -> Self {
        Self::Socket(value)
    }
}
