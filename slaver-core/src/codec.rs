//! Fixed-size control packets exchanged on a standby connection before it is activated.
//!
//! Every frame is exactly [`PACKAGE_SIZE`] bytes: a one byte type, a zero-filled payload
//! region and a four byte integrity tag. The tag is `crc32(secret ‖ pkg_type ‖ payload)` —
//! a cheap shared-secret filter against accidental cross-traffic, not a cryptographic MAC.
//! Interop with a `shootback`-protocol master depends on keeping this exact layout and
//! algorithm; do not "upgrade" it without coordinating with the peer.

use byteorder::{BigEndian, ByteOrder};

/// Wire size of a control frame, in bytes.
pub const PACKAGE_SIZE: usize = 32;

const TAG_SIZE: usize = 4;
const TAG_OFFSET: usize = PACKAGE_SIZE - TAG_SIZE;

/// The control-packet types a slaver will ever receive or send on the spare channel.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PkgType {
    HeartBeat,
    /// Master-to-slaver activation handshake.
    HsM2S,
    /// Slaver-to-master handshake reply.
    HsS2M,
}

impl PkgType {
    #[inline]
    fn from_byte(b: u8) -> Option<PkgType> {
        match b {
            0x01 => Some(PkgType::HeartBeat),
            0x02 => Some(PkgType::HsM2S),
            0x03 => Some(PkgType::HsS2M),
            _ => None,
        }
    }

    #[inline]
    fn to_byte(self) -> u8 {
        match self {
            PkgType::HeartBeat => 0x01,
            PkgType::HsM2S => 0x02,
            PkgType::HsS2M => 0x03,
        }
    }
}

/// A decoded, integrity-verified control frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CtrlPkg {
    pub pkg_type: PkgType,
}

/// Encodes and verifies control frames under a fixed shared secret.
///
/// Built once from [`crate::config::Config`] at startup; the secret never changes for the
/// lifetime of the codec. Construct a new `Codec` (e.g. restarting the process) to rekey.
#[derive(Clone)]
pub struct Codec {
    secret: Vec<u8>,
}

impl Codec {
    #[inline]
    pub fn new(secret: impl Into<Vec<u8>>) -> Codec {
        Codec {
            secret: secret.into(),
        }
    }

    /// Recomputes the integrity tag for `pkg_type ‖ payload` under the current secret.
    fn tag(&self, pkg_type: u8, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.secret);
        hasher.update(&[pkg_type]);
        hasher.update(payload);
        hasher.finalize()
    }

    /// Produces a padded, tag-filled frame for `pkg_type`. The payload region is always
    /// zero-filled: no control frame defined by this protocol revision carries a payload.
    pub fn encode(&self, pkg_type: PkgType) -> [u8; PACKAGE_SIZE] {
        let mut frame = [0u8; PACKAGE_SIZE];
        let type_byte = pkg_type.to_byte();
        frame[0] = type_byte;

        let tag = self.tag(type_byte, &frame[1..TAG_OFFSET]);
        BigEndian::write_u32(&mut frame[TAG_OFFSET..], tag);
        frame
    }

    /// Decodes and verifies a frame. Returns `None` if the length is wrong, the type byte
    /// is not one of the three defined values, or the integrity tag does not match.
    pub fn decode(&self, bytes: &[u8]) -> Option<CtrlPkg> {
        if bytes.len() != PACKAGE_SIZE {
            return None;
        }

        let pkg_type = PkgType::from_byte(bytes[0])?;
        let payload = &bytes[1..TAG_OFFSET];
        let expected_tag = self.tag(bytes[0], payload);
        let actual_tag = BigEndian::read_u32(&bytes[TAG_OFFSET..]);

        if expected_tag != actual_tag {
            return None;
        }

        Some(CtrlPkg { pkg_type })
    }

    #[inline]
    pub fn heartbeat(&self) -> [u8; PACKAGE_SIZE] {
        self.encode(PkgType::HeartBeat)
    }

    #[inline]
    pub fn handshake_master_to_slaver(&self) -> [u8; PACKAGE_SIZE] {
        self.encode(PkgType::HsM2S)
    }

    #[inline]
    pub fn handshake_slaver_to_master(&self) -> [u8; PACKAGE_SIZE] {
        self.encode(PkgType::HsS2M)
    }
}
