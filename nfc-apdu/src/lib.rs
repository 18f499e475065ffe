//! APDU types for contactless ISO 7816-4 exchanges
//!
//! Commands are generic over their data buffer so constant commands can live in
//! `static` memory while parsed commands own a `Vec<u8>`. Only the short APDU
//! form (Lc and Le on one byte) is supported.

#![no_std]
#![deny(missing_docs)]

extern crate no_std_compat as std;
use std::prelude::v1::*;

use core::ops::Deref;
use snafu::prelude::*;

mod status;
pub use status::StatusWord;

/// Largest data field a short APDU can carry
pub const MAX_SHORT_DATA_LEN: usize = 255;

/// Errors raised while building or parsing a command APDU
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
pub enum APDUCommandError {
    /// The command is shorter than the 4-byte header
    #[snafu(display("command too short: {len} bytes (header needs 4)"))]
    HeaderTooShort {
        /// Received length
        len: usize,
    },
    /// The data field does not fit a short APDU
    #[snafu(display("command data too long: {len} bytes (max 255)"))]
    DataTooLong {
        /// Data length
        len: usize,
    },
    /// Lc does not match the bytes following it
    #[snafu(display("Lc announces {lc} bytes but {available} follow"))]
    LengthMismatch {
        /// Announced data length
        lc: usize,
        /// Bytes available after Lc
        available: usize,
    },
}

/// Errors raised while splitting a response APDU
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
pub enum APDUAnswerError {
    /// The response carries no complete status word
    #[snafu(display("answer too short (< 2 bytes)"))]
    TooShort,
}

/// ISO 7816-4 command cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum APDUCase {
    /// Header only
    Case1,
    /// Header and Le
    Case2,
    /// Header, Lc and data
    Case3,
    /// Header, Lc, data and Le
    Case4,
}

/// A command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct APDUCommand<B> {
    /// Class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Data field, sent with a one-byte Lc when not empty
    pub data: B,
    /// Expected response length, absent when no data is expected back
    pub le: Option<u8>,
}

impl<B> APDUCommand<B>
where
    B: Deref<Target = [u8]>,
{
    /// Which of the four ISO cases this command is
    pub fn case(&self) -> APDUCase {
        match (self.data.is_empty(), self.le.is_some()) {
            (true, false) => APDUCase::Case1,
            (true, true) => APDUCase::Case2,
            (false, false) => APDUCase::Case3,
            (false, true) => APDUCase::Case4,
        }
    }

    /// Serialize to the short APDU wire form
    pub fn serialize(&self) -> Result<Vec<u8>, APDUCommandError> {
        let data = &*self.data;
        ensure!(
            data.len() <= MAX_SHORT_DATA_LEN,
            DataTooLongSnafu { len: data.len() }
        );

        let mut v = Vec::with_capacity(6 + data.len());
        v.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);
        if !data.is_empty() {
            v.push(data.len() as u8);
            v.extend_from_slice(data);
        }
        if let Some(le) = self.le {
            v.push(le);
        }
        Ok(v)
    }
}

impl APDUCommand<Vec<u8>> {
    /// Parse a short command APDU
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, APDUCommandError> {
        ensure!(bytes.len() >= 4, HeaderTooShortSnafu { len: bytes.len() });
        let (cla, ins, p1, p2) = (bytes[0], bytes[1], bytes[2], bytes[3]);
        let body = &bytes[4..];

        let (data, le) = match body.len() {
            0 => (Vec::new(), None),
            1 => (Vec::new(), Some(body[0])),
            _ => {
                let lc = body[0] as usize;
                let rest = &body[1..];
                if lc == 0 || (rest.len() != lc && rest.len() != lc + 1) {
                    return LengthMismatchSnafu {
                        lc,
                        available: rest.len(),
                    }
                    .fail();
                }
                (rest[..lc].to_vec(), rest.get(lc).copied())
            }
        };

        Ok(APDUCommand {
            cla,
            ins,
            p1,
            p2,
            data,
            le,
        })
    }
}

/// A response APDU: data field followed by the status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct APDUAnswer<B> {
    data: B,
    retcode: u16,
}

impl<B> APDUAnswer<B>
where
    B: Deref<Target = [u8]>,
{
    /// Split a raw answer, which must hold at least the status word
    pub fn from_answer(answer: B) -> Result<Self, APDUAnswerError> {
        ensure!(answer.len() >= 2, TooShortSnafu);
        let retcode = arrayref::array_ref!(answer, answer.len() - 2, 2);
        let retcode = u16::from_be_bytes(*retcode);

        Ok(APDUAnswer {
            data: answer,
            retcode,
        })
    }

    /// Response data field, without the status word
    pub fn data(&self) -> &[u8] {
        &self.data[..self.data.len() - 2]
    }

    /// Full answer as received, status word included
    pub fn apdu_data(&self) -> &[u8] {
        &self.data[..]
    }

    /// Status word
    pub fn status_word(&self) -> StatusWord {
        StatusWord::new(self.retcode)
    }

    /// Raw 16-bit return code
    pub fn retcode(&self) -> u16 {
        self.retcode
    }

    /// Give back the underlying buffer
    pub fn into_inner(self) -> B {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECT_LDS: [u8; 12] = [
        0x00, 0xA4, 0x04, 0x0C, 0x07, 0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01,
    ];

    #[test]
    fn serializes_case3_without_le() {
        let command = APDUCommand {
            cla: 0x00,
            ins: 0xA4,
            p1: 0x04,
            p2: 0x0C,
            data: &[0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01][..],
            le: None,
        };
        assert_eq!(command.case(), APDUCase::Case3);
        assert_eq!(command.serialize().unwrap(), SELECT_LDS.to_vec());
    }

    #[test]
    fn serializes_case1_and_case2() {
        let mut command = APDUCommand {
            cla: 0xFF,
            ins: 0xCA,
            p1: 0x00,
            p2: 0x00,
            data: Vec::new(),
            le: None,
        };
        assert_eq!(command.serialize().unwrap(), [0xFF, 0xCA, 0x00, 0x00].to_vec());

        command.le = Some(0x00);
        assert_eq!(command.case(), APDUCase::Case2);
        assert_eq!(
            command.serialize().unwrap(),
            [0xFF, 0xCA, 0x00, 0x00, 0x00].to_vec()
        );
    }

    #[test]
    fn rejects_oversized_data() {
        let command = APDUCommand {
            cla: 0x00,
            ins: 0xD6,
            p1: 0x00,
            p2: 0x00,
            data: [0u8; 256].to_vec(),
            le: None,
        };
        assert_eq!(
            command.serialize(),
            Err(APDUCommandError::DataTooLong { len: 256 })
        );
    }

    #[test]
    fn parses_select_command() {
        let command = APDUCommand::from_bytes(&SELECT_LDS).unwrap();
        assert_eq!(command.cla, 0x00);
        assert_eq!(command.ins, 0xA4);
        assert_eq!(command.p1, 0x04);
        assert_eq!(command.p2, 0x0C);
        assert_eq!(command.data, [0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01].to_vec());
        assert_eq!(command.le, None);
        assert_eq!(command.serialize().unwrap(), SELECT_LDS.to_vec());
    }

    #[test]
    fn parses_case4_le() {
        let command = APDUCommand::from_bytes(&[0x00, 0xB0, 0x00, 0x00, 0x01, 0xAA, 0x10]).unwrap();
        assert_eq!(command.case(), APDUCase::Case4);
        assert_eq!(command.data, [0xAA].to_vec());
        assert_eq!(command.le, Some(0x10));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(
            APDUCommand::from_bytes(&[0x00, 0xA4]),
            Err(APDUCommandError::HeaderTooShort { len: 2 })
        );
        assert_eq!(
            APDUCommand::from_bytes(&[0x00, 0xA4, 0x04, 0x0C, 0x07, 0xA0]),
            Err(APDUCommandError::LengthMismatch {
                lc: 7,
                available: 1
            })
        );
    }

    #[test]
    fn splits_answer() {
        let answer = APDUAnswer::from_answer([0x01, 0x02, 0x90, 0x00].to_vec()).unwrap();
        assert_eq!(answer.data(), &[0x01, 0x02]);
        assert_eq!(answer.apdu_data(), &[0x01, 0x02, 0x90, 0x00]);
        assert_eq!(answer.status_word(), StatusWord::SUCCESS);
        assert_eq!(answer.retcode(), 0x9000);
    }

    #[test]
    fn answer_needs_status_word() {
        assert_eq!(
            APDUAnswer::from_answer([0x90].to_vec()),
            Err(APDUAnswerError::TooShort)
        );
        let empty: &[u8] = &[];
        assert_eq!(APDUAnswer::from_answer(empty), Err(APDUAnswerError::TooShort));
    }
}
