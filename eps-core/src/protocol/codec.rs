//! Big-endian parameter and response encoding with optional byte reversal.

use heapless::Vec;

/// Largest response the board produces.
pub const MAX_RESPONSE_LEN: usize = 4;

/// Largest command frame accepted from a host.
pub const MAX_FRAME_LEN: usize = 8;

/// Buffered response bytes.
pub type Response = Vec<u8, MAX_RESPONSE_LEN>;

/// Command frame as sent on the wire.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// Byte-order reversal applied to incoming parameters and outgoing responses.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ByteSwap {
    pub input: bool,
    pub output: bool,
}

impl ByteSwap {
    #[must_use]
    pub const fn new(input: bool, output: bool) -> Self {
        Self { input, output }
    }
}

/// Fixed response width of an opcode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResponseWidth {
    Empty,
    Word,
    Long,
}

impl ResponseWidth {
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            ResponseWidth::Empty => 0,
            ResponseWidth::Word => 2,
            ResponseWidth::Long => 4,
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, ResponseWidth::Empty)
    }
}

/// Decodes the parameter that follows the opcode byte.
///
/// At most `width` bytes are used and missing bytes are treated as leading
/// zeros. With `swap` set the bytes are reversed before the big-endian decode.
#[must_use]
pub fn decode_param(bytes: &[u8], width: usize, swap: bool) -> u32 {
    let take = bytes.len().min(width);
    response_value(&bytes[..take], swap)
}

/// Encodes a response value big-endian at the given width, reversed when
/// `swap` is set. Values wider than the field are truncated.
#[must_use]
pub fn encode_response(value: u32, width: ResponseWidth, swap: bool) -> Response {
    let bytes = value.to_be_bytes();
    let mut response = Response::new();
    let start = bytes.len() - width.len();
    // The slice never exceeds MAX_RESPONSE_LEN.
    let _ = response.extend_from_slice(&bytes[start..]);
    if swap {
        response.reverse();
    }
    response
}

/// Builds a command frame: the opcode byte followed by `width` parameter
/// bytes, big-endian and reversed when `swap` is set.
#[must_use]
pub fn encode_frame(opcode: u8, param: u32, width: usize, swap: bool) -> Frame {
    let bytes = param.to_be_bytes();
    let width = width.min(bytes.len());
    let mut frame = Frame::new();
    let _ = frame.push(opcode);
    let _ = frame.extend_from_slice(&bytes[bytes.len() - width..]);
    if swap {
        frame[1..].reverse();
    }
    frame
}

/// Reassembles up to four big-endian bytes into a value, reversing them first
/// when `swap` is set.
#[must_use]
pub fn response_value(bytes: &[u8], swap: bool) -> u32 {
    let take = bytes.len().min(4);
    let mut buffer = [0u8; 4];
    let field = &mut buffer[4 - take..];
    field.copy_from_slice(&bytes[..take]);
    if swap {
        field.reverse();
    }
    u32::from_be_bytes(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_big_endian_parameters() {
        assert_eq!(decode_param(&[0xe1, 0x10], 2, false), 0xe110);
        assert_eq!(decode_param(&[0xe1, 0x10], 2, true), 0x10e1);
        assert_eq!(decode_param(&[0x05], 1, false), 0x05);
    }

    #[test]
    fn pads_short_and_truncates_long_parameters() {
        assert_eq!(decode_param(&[0x07], 2, false), 0x0007);
        assert_eq!(decode_param(&[0x07, 0x08, 0x09], 1, false), 0x07);
        assert_eq!(decode_param(&[], 1, false), 0);
    }

    #[test]
    fn encodes_each_width() {
        assert!(encode_response(0x1234, ResponseWidth::Empty, false).is_empty());
        assert_eq!(
            encode_response(0xabcd, ResponseWidth::Word, false).as_slice(),
            [0xab, 0xcd]
        );
        assert_eq!(
            encode_response(0x0000_ffff, ResponseWidth::Long, false).as_slice(),
            [0x00, 0x00, 0xff, 0xff]
        );
    }

    #[test]
    fn frames_carry_opcode_then_parameter() {
        assert_eq!(encode_frame(0x10, 0xe110, 2, false).as_slice(), [0x10, 0xe1, 0x10]);
        assert_eq!(encode_frame(0x10, 0xe110, 2, true).as_slice(), [0x10, 0x10, 0xe1]);
        assert_eq!(encode_frame(0x21, 0x1234, 1, false).as_slice(), [0x21, 0x34]);
    }

    #[test]
    fn swaps_response_bytes() {
        let response = encode_response(0x0102_0304, ResponseWidth::Long, true);
        assert_eq!(response.as_slice(), [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(response_value(&response, true), 0x0102_0304);
    }
}
