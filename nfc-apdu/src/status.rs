//! ISO 7816-4 status words

use core::fmt;

/// Trailing two bytes (SW1 SW2) of a response APDU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusWord(u16);

impl StatusWord {
    /// Normal processing, no further qualification
    pub const SUCCESS: Self = Self(0x9000);
    /// Wrong length
    pub const WRONG_LENGTH: Self = Self(0x6700);
    /// Security status not satisfied
    pub const SECURITY_STATUS_NOT_SATISFIED: Self = Self(0x6982);
    /// Conditions of use not satisfied
    pub const CONDITIONS_NOT_SATISFIED: Self = Self(0x6985);
    /// Incorrect parameters in the command data field
    pub const WRONG_DATA: Self = Self(0x6A80);
    /// Function not supported
    pub const FUNCTION_NOT_SUPPORTED: Self = Self(0x6A81);
    /// File or application not found
    pub const FILE_NOT_FOUND: Self = Self(0x6A82);
    /// Incorrect parameters P1-P2
    pub const INCORRECT_P1_P2: Self = Self(0x6A86);
    /// Wrong parameters P1-P2
    pub const WRONG_P1_P2: Self = Self(0x6B00);
    /// Instruction code not supported or invalid
    pub const INS_NOT_SUPPORTED: Self = Self(0x6D00);
    /// Class not supported
    pub const CLA_NOT_SUPPORTED: Self = Self(0x6E00);
    /// No precise diagnosis
    pub const UNKNOWN: Self = Self(0x6F00);

    /// Build a status word from its 16-bit value
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Build a status word from SW1 and SW2
    pub const fn from_bytes(sw1: u8, sw2: u8) -> Self {
        Self(((sw1 as u16) << 8) | sw2 as u16)
    }

    /// 16-bit value
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// First status byte
    pub const fn sw1(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Second status byte
    pub const fn sw2(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Big-endian wire form
    pub const fn to_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// `true` only for `90 00`
    pub const fn is_success(&self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    /// Human readable meaning, as listed in ISO 7816-4
    pub fn description(&self) -> &'static str {
        match self.0 {
            0x9000 => "success",
            0x6700 => "wrong length",
            0x6982 => "security status not satisfied",
            0x6985 => "conditions of use not satisfied",
            0x6A80 => "incorrect parameters in the data field",
            0x6A81 => "function not supported",
            0x6A82 => "file or application not found",
            0x6A86 => "incorrect parameters P1-P2",
            0x6B00 => "wrong parameters P1-P2",
            0x6D00 => "instruction code not supported or invalid",
            0x6E00 => "class not supported",
            0x6F00 => "no precise diagnosis",
            sw if sw >> 8 == 0x61 => "response bytes still available",
            sw if sw >> 8 == 0x6C => "wrong Le field",
            _ => "unknown status word",
        }
    }
}

impl From<u16> for StatusWord {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<StatusWord> for u16 {
    fn from(sw: StatusWord) -> Self {
        sw.0
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}
