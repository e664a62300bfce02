use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timestamp(pub OffsetDateTime);

impl Timestamp {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }
}

/// A frame as it went out on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SentFrame {
    pub bytes: Vec<u8>,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug)]
pub struct PortInfo {
    pub name: String,
    pub driver: String,
}
