//! Binary wire codec for token transfers over the mesh transport
//!
//! The mesh transport carries a [`TokenTransferRecord`] as a compact
//! big-endian payload: a flags byte, fixed-width timestamp and amount,
//! then length-prefixed UTF-8 fields. String fields are silently
//! truncated to their length-prefix capacity on encode (lossy by
//! design); decode bounds-checks every length against the remaining
//! buffer and fails closed rather than read out of bounds.
//!
//! `delivery_status` is not serialized. Receivers materialize the status
//! of a freshly decoded record as `Delivered` from the sender at decode
//! time.

use chrono::{DateTime, TimeZone, Utc};
use satchel_core::{DeliveryStatus, IdentityKey, PeerId, TokenTransferRecord};

mod reader;

use reader::Reader;

/// Flag bit: memo field present
const FLAG_MEMO: u8 = 0x01;
/// Flag bit: token already claimed
const FLAG_CLAIMED: u8 = 0x02;
/// Flag bit: recipient identity present
const FLAG_RECIPIENT: u8 = 0x04;

/// Minimum plausible payload: flags + timestamp + amount + the five
/// mandatory length prefixes, with at least a couple of content bytes
const MIN_PAYLOAD_LEN: usize = 20;

/// Capacity of a u8-length-prefixed field
const MAX_U8_FIELD: usize = u8::MAX as usize;
/// Capacity of the u16-length-prefixed token payload
const MAX_U16_FIELD: usize = u16::MAX as usize;

/// Encoding failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Amount does not fit the signed 32-bit wire field
    #[error("amount {amount} exceeds the wire format's i32 range")]
    AmountOutOfRange {
        /// The offending amount
        amount: u32,
    },
}

/// Decoding failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Buffer is shorter than any valid payload
    #[error("payload too short: {len} bytes")]
    TooShort {
        /// Observed buffer length
        len: usize,
    },
    /// A length field claims more bytes than the buffer holds
    #[error("payload truncated reading {field}")]
    Truncated {
        /// The field being read when the buffer ran out
        field: &'static str,
    },
}

/// Truncate a string to at most `max` bytes on a char boundary
fn truncate_utf8(s: &str, max: usize) -> &[u8] {
    if s.len() <= max {
        return s.as_bytes();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s.as_bytes()[..end]
}

fn put_u8_field(out: &mut Vec<u8>, value: &str) {
    let bytes = truncate_utf8(value, MAX_U8_FIELD);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
}

/// Encode a record into its mesh wire payload
///
/// String fields longer than their capacity are truncated silently;
/// `delivery_status` is not carried.
pub fn encode(record: &TokenTransferRecord) -> Result<Vec<u8>, EncodeError> {
    let amount: i32 = record
        .amount
        .try_into()
        .map_err(|_| EncodeError::AmountOutOfRange {
            amount: record.amount,
        })?;

    let mut out = Vec::with_capacity(64 + record.token_payload.len());

    let mut flags = 0u8;
    if record.memo.is_some() {
        flags |= FLAG_MEMO;
    }
    if record.claimed {
        flags |= FLAG_CLAIMED;
    }
    if record.recipient_identity.is_some() {
        flags |= FLAG_RECIPIENT;
    }
    out.push(flags);

    out.extend_from_slice(&record.created_at.timestamp_millis().to_be_bytes());
    out.extend_from_slice(&amount.to_be_bytes());

    put_u8_field(&mut out, &record.unit);
    put_u8_field(&mut out, &record.id);
    put_u8_field(&mut out, record.sender_identity.as_str());
    put_u8_field(&mut out, record.sender_transport_id.as_str());

    let token = truncate_utf8(&record.token_payload, MAX_U16_FIELD);
    out.extend_from_slice(&(token.len() as u16).to_be_bytes());
    out.extend_from_slice(token);

    put_u8_field(&mut out, &record.issuer_url);

    if let Some(memo) = &record.memo {
        put_u8_field(&mut out, memo);
    }
    if let Some(recipient) = &record.recipient_identity {
        put_u8_field(&mut out, recipient.as_str());
    }

    Ok(out)
}

/// Decode a mesh wire payload into a record
///
/// The returned record's `delivery_status` is materialized as
/// `Delivered` from the sender at the current time; `claimed` and
/// recipient presence are recovered from the flags byte.
pub fn decode(payload: &[u8]) -> Result<TokenTransferRecord, DecodeError> {
    if payload.len() < MIN_PAYLOAD_LEN {
        return Err(DecodeError::TooShort { len: payload.len() });
    }

    let mut r = Reader::new(payload);

    let flags = r.u8("flags")?;
    let has_memo = flags & FLAG_MEMO != 0;
    let claimed = flags & FLAG_CLAIMED != 0;
    let has_recipient = flags & FLAG_RECIPIENT != 0;

    let created_at_ms = r.i64("created_at")?;
    let amount_raw = r.i32("amount")?;
    let amount = amount_raw.max(0) as u32;

    let unit = r.u8_string("unit")?;
    let id = r.u8_string("id")?;
    let sender_identity = r.u8_string("sender_identity")?;
    let sender_transport_id = r.u8_string("sender_transport_id")?;
    let token_payload = r.u16_string("token_payload")?;
    let issuer_url = r.u8_string("issuer_url")?;

    // A flagged optional field may be absent entirely when the sender's
    // buffer ended here; a present length prefix must still be honest.
    let memo = if has_memo && r.has_remaining() {
        Some(r.u8_string("memo")?)
    } else {
        None
    };
    let recipient_identity = if has_recipient && r.has_remaining() {
        Some(IdentityKey::new(r.u8_string("recipient_identity")?))
    } else {
        None
    };

    let created_at = millis_to_datetime(created_at_ms);
    let sender_transport_id = PeerId::new(sender_transport_id);

    Ok(TokenTransferRecord {
        id,
        sender_identity: IdentityKey::new(sender_identity),
        delivery_status: DeliveryStatus::Delivered {
            to: sender_transport_id.as_str().to_string(),
            at: Utc::now(),
        },
        sender_transport_id,
        created_at,
        amount,
        unit,
        token_payload,
        issuer_url,
        memo,
        claimed,
        recipient_identity,
    })
}

/// Millisecond timestamp to UTC instant, clamping out-of-range values to
/// the epoch
fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
