//! Wire format of the MicroFPGA register interface.
//!
//! Each request starts with a command byte:
//!
//! | bit  | meaning                                  |
//! |------|------------------------------------------|
//! | 7    | 1 = write, 0 = read                      |
//! | 6    | auto-increment the address between words |
//! | 5..0 | number of consecutive words minus one    |
//!
//! followed by the 32-bit address, little-endian. A write request then carries
//! the 32-bit value, little-endian; a read request is answered by the board
//! with a single little-endian word. Only single-word transfers are used here.

/// Length of a read request frame.
pub const READ_REQUEST_LEN: usize = 5;

/// Length of a write request frame.
pub const WRITE_REQUEST_LEN: usize = 9;

/// Length of a read answer.
pub const READ_ANSWER_LEN: usize = 4;

const CMD_WRITE: u8 = 0x80;
const CMD_READ: u8 = 0x00;

/// Build the frame requesting the word at `address`.
pub fn encode_read_request(address: u32) -> [u8; READ_REQUEST_LEN] {
    let mut frame = [0u8; READ_REQUEST_LEN];
    frame[0] = CMD_READ;
    frame[1..].copy_from_slice(&address.to_le_bytes());
    frame
}

/// Build the frame writing `value` to `address`.
pub fn encode_write_request(address: u32, value: u32) -> [u8; WRITE_REQUEST_LEN] {
    let mut frame = [0u8; WRITE_REQUEST_LEN];
    frame[0] = CMD_WRITE;
    frame[1..5].copy_from_slice(&address.to_le_bytes());
    frame[5..].copy_from_slice(&value.to_le_bytes());
    frame
}

/// Decode the board's answer to a read request.
pub fn decode_read_answer(answer: [u8; READ_ANSWER_LEN]) -> u32 {
    u32::from_le_bytes(answer)
}

/// A request frame as seen from the board side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Single-word read
    Read { address: u32 },
    /// Single-word write
    Write { address: u32, value: u32 },
}

/// Parse one request from the front of `bytes`.
///
/// Returns the request and the number of bytes it occupied, or `None` when
/// `bytes` does not yet hold a complete frame. Burst requests are not
/// understood and yield `None` as well.
pub fn decode_request(bytes: &[u8]) -> Option<(Request, usize)> {
    let (&cmd, rest) = bytes.split_first()?;
    if cmd & 0x3f != 0 {
        return None;
    }
    let address = u32::from_le_bytes(rest.get(..4)?.try_into().ok()?);
    if cmd & CMD_WRITE == 0 {
        return Some((Request::Read { address }, READ_REQUEST_LEN));
    }
    let value = u32::from_le_bytes(rest.get(4..8)?.try_into().ok()?);
    Some((Request::Write { address, value }, WRITE_REQUEST_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_request_layout() {
        assert_eq!(encode_read_request(101), [0x00, 101, 0, 0, 0]);
    }

    #[test]
    fn write_request_layout() {
        // 35412 = 0x8A54
        assert_eq!(
            encode_write_request(29, 35412),
            [0x80, 29, 0, 0, 0, 0x54, 0x8A, 0, 0]
        );
    }

    #[test]
    fn answer_is_little_endian() {
        assert_eq!(decode_read_answer([0x54, 0x8A, 0, 0]), 35412);
        assert_eq!(decode_read_answer([0, 0, 0, 0x80]), 0x8000_0000);
    }

    #[test]
    fn decode_request_needs_a_full_frame() {
        let frame = encode_write_request(24, 1);
        assert_eq!(decode_request(&frame[..8]), None);
        assert_eq!(
            decode_request(&frame),
            Some((
                Request::Write {
                    address: 24,
                    value: 1
                },
                WRITE_REQUEST_LEN
            ))
        );
        assert_eq!(decode_request(&[]), None);
    }

    #[test]
    fn decode_request_rejects_bursts() {
        let mut frame = encode_read_request(0);
        frame[0] = 0x03;
        assert_eq!(decode_request(&frame), None);
    }
}
