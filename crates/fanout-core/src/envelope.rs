use bytes::{Bytes, BytesMut};

/// Length, in bytes, of the instance tag prepended to every bus publish.
///
/// Resolves the self-echo open question from the design notes: the bridge
/// strips this prefix and discards items whose tag matches its own instance
/// id, so a frame that was already delivered locally (skipping the sender)
/// is not delivered a second time on the instance that originated it.
pub const INSTANCE_TAG_LEN: usize = 16;

/// Prefix `frame_bytes` with `instance_id` for publication on the bus.
pub fn encode_tagged(instance_id: [u8; INSTANCE_TAG_LEN], frame_bytes: &Bytes) -> Bytes {
    let mut buf = BytesMut::with_capacity(INSTANCE_TAG_LEN + frame_bytes.len());
    buf.extend_from_slice(&instance_id);
    buf.extend_from_slice(frame_bytes);
    buf.freeze()
}

/// Split a tagged bus payload back into its originating instance id and the
/// underlying frame bytes. Returns `None` if `payload` is shorter than the
/// tag itself, which should never happen for well-formed publishes but is
/// cheap to guard against since the bytes come over an untrusted transport.
pub fn decode_tagged(payload: &Bytes) -> Option<([u8; INSTANCE_TAG_LEN], Bytes)> {
    if payload.len() < INSTANCE_TAG_LEN {
        return None;
    }
    let mut tag = [0u8; INSTANCE_TAG_LEN];
    tag.copy_from_slice(&payload[..INSTANCE_TAG_LEN]);
    Some((tag, payload.slice(INSTANCE_TAG_LEN..)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let tag = [7u8; INSTANCE_TAG_LEN];
        let frame = Bytes::from_static(b"{\"type\":\"chat\"}");
        let tagged = encode_tagged(tag, &frame);
        let (decoded_tag, decoded_frame) = decode_tagged(&tagged).unwrap();
        assert_eq!(decoded_tag, tag);
        assert_eq!(decoded_frame, frame);
    }

    #[test]
    fn rejects_short_payload() {
        let short = Bytes::from_static(b"short");
        assert!(decode_tagged(&short).is_none());
    }
}
