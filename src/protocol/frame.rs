//! Local wire protocol codec.
//!
//! Pure parse/encode, no I/O and no connection state. The request parser is
//! incremental: it is handed the connection's whole accumulation buffer and
//! either yields one complete frame plus its byte length, or asks for more
//! data without consuming anything.
//!
//! The protocol is binary and length-prefixed. `value_len` fields are u64 in
//! HOST byte order: the protocol only ever crosses a local pipe or socket,
//! and the front-end on the other end is always the same machine. Do not
//! change this to network byte order.

/// Protocol version advertised in the greeting.
pub const PROTOCOL_VERSION: u8 = 0x01;
/// Capability id: the GET/PUT/REMOVE/STOP request set.
pub const CAP_GET_PUT_REMOVE_STOP: u8 = 0x00;

pub const STATUS_OK: u8 = 0x00;
pub const STATUS_NOOP: u8 = 0x01;
pub const STATUS_ERR: u8 = 0x02;

const REQ_GET: u8 = 0x00;
const REQ_PUT: u8 = 0x01;
const REQ_REMOVE: u8 = 0x02;
const REQ_STOP: u8 = 0x03;

/// PUT flag bit: replace an existing object instead of checking first.
const PUT_FLAG_OVERWRITE: u8 = 0x01;

/// Error messages longer than this are cut off on the wire (msg_len is u8).
const MAX_ERR_MSG_LEN: usize = 255;

/// One parsed request frame. Keys are raw bytes; hex encoding happens at
/// dispatch, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get { key: Vec<u8> },
    Put { key: Vec<u8>, value: Vec<u8>, overwrite: bool },
    Remove { key: Vec<u8> },
    Stop,
}

/// Outcome of one parse attempt against the accumulation buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// A complete frame and the number of buffer bytes it occupied.
    Frame(Request, usize),
    /// The buffer holds a frame prefix; wait for more data.
    Incomplete,
    /// The leading byte is not a known request type. Unrecoverable.
    Unknown(u8),
}

/// Try to parse one request frame from the front of `buf`.
///
/// Never consumes: the caller drains the reported length only when a full
/// frame comes back, so a partial frame leaves the buffer untouched.
pub fn parse_request(buf: &[u8]) -> Parsed {
    let Some(&request_type) = buf.first() else {
        return Parsed::Incomplete;
    };

    if request_type == REQ_STOP {
        return Parsed::Frame(Request::Stop, 1);
    }
    if !matches!(request_type, REQ_GET | REQ_PUT | REQ_REMOVE) {
        return Parsed::Unknown(request_type);
    }

    let mut offset = 1;
    let Some(&key_len) = buf.get(offset) else {
        return Parsed::Incomplete;
    };
    offset += 1;
    let key_len = key_len as usize;
    if buf.len() < offset + key_len {
        return Parsed::Incomplete;
    }
    let key = buf[offset..offset + key_len].to_vec();
    offset += key_len;

    match request_type {
        REQ_GET => Parsed::Frame(Request::Get { key }, offset),
        REQ_REMOVE => Parsed::Frame(Request::Remove { key }, offset),
        REQ_PUT => {
            let Some(&flags) = buf.get(offset) else {
                return Parsed::Incomplete;
            };
            offset += 1;
            let Some(len_bytes) = buf.get(offset..offset + 8) else {
                return Parsed::Incomplete;
            };
            let value_len = u64::from_ne_bytes(len_bytes.try_into().unwrap()) as usize;
            offset += 8;
            if buf.len() < offset + value_len {
                return Parsed::Incomplete;
            }
            let value = buf[offset..offset + value_len].to_vec();
            offset += value_len;
            let overwrite = flags & PUT_FLAG_OVERWRITE != 0;
            Parsed::Frame(Request::Put { key, value, overwrite }, offset)
        }
        _ => unreachable!(),
    }
}

/// The unsolicited first frame on every connection: version, capability
/// count, capability ids.
pub fn greeting() -> Vec<u8> {
    vec![PROTOCOL_VERSION, 1, CAP_GET_PUT_REMOVE_STOP]
}

/// Single-byte OK response.
pub fn ok() -> Vec<u8> {
    vec![STATUS_OK]
}

/// Single-byte NOOP response.
pub fn noop() -> Vec<u8> {
    vec![STATUS_NOOP]
}

/// ERR response carrying a diagnostic, truncated to 255 bytes.
pub fn error(message: &str) -> Vec<u8> {
    let msg = message.as_bytes();
    let len = msg.len().min(MAX_ERR_MSG_LEN);
    let mut frame = Vec::with_capacity(2 + len);
    frame.push(STATUS_ERR);
    frame.push(len as u8);
    frame.extend_from_slice(&msg[..len]);
    frame
}

/// Header chunk of a GET-OK response: status byte plus the value length in
/// host byte order. The value bytes follow as a separate chunk.
pub fn value_header(value_len: u64) -> Vec<u8> {
    let mut frame = Vec::with_capacity(9);
    frame.push(STATUS_OK);
    frame.extend_from_slice(&value_len.to_ne_bytes());
    frame
}
