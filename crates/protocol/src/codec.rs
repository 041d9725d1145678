//! Payload compilation and point parsing.
//!
//! Every outbound event is encoded as `[name, "a:b:c"]`. A payload wraps an
//! ordered list of them as `{"type":"events","data":[...]}`.

use bytes::{BufMut, Bytes, BytesMut};
use glam::Vec2;

use crate::ProtocolError;
use crate::packets::ServerEvent;

const HEADER: &[u8] = br#"{"type":"events","data":["#;
const FOOTER: &[u8] = b"]}";

/// A writer for building one compiled event payload.
#[derive(Debug)]
pub struct PayloadWriter {
    buf: BytesMut,
    count: usize,
}

impl PayloadWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = BytesMut::with_capacity(capacity.max(HEADER.len() + FOOTER.len()));
        buf.put_slice(HEADER);
        Self { buf, count: 0 }
    }

    /// Number of events written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append one event, preserving insertion order.
    pub fn push(&mut self, event: &ServerEvent) -> Result<(), ProtocolError> {
        let entry = (event.name(), event.args().join(":"));
        let encoded = serde_json::to_vec(&entry).map_err(ProtocolError::Encode)?;
        if self.count > 0 {
            self.buf.put_u8(b',');
        }
        self.buf.put_slice(&encoded);
        self.count += 1;
        Ok(())
    }

    /// Consume the writer and return the built payload.
    pub fn finish(mut self) -> Bytes {
        self.buf.put_slice(FOOTER);
        self.buf.freeze()
    }
}

impl Default for PayloadWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a sequence of events into a single payload.
pub fn compile<'a>(events: impl IntoIterator<Item = &'a ServerEvent>) -> Result<Bytes, ProtocolError> {
    let mut writer = PayloadWriter::new();
    for event in events {
        writer.push(event)?;
    }
    Ok(writer.finish())
}

/// Parse an `x:y` point. Both coordinates must be finite numbers.
pub fn parse_point(raw: &str) -> Result<Vec2, ProtocolError> {
    let invalid = || ProtocolError::InvalidPoint(raw.to_string());
    let (x, y) = raw.split_once(':').ok_or_else(invalid)?;
    let x: f32 = x.trim().parse().map_err(|_| invalid())?;
    let y: f32 = y.trim().parse().map_err(|_| invalid())?;
    if !x.is_finite() || !y.is_finite() {
        return Err(ProtocolError::NonFinitePoint(raw.to_string()));
    }
    Ok(Vec2::new(x, y))
}

/// Format a coordinate or scalar with at most two decimals.
pub fn format_num(v: f32) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

/// Format a point as `x:y`.
pub fn format_point(p: Vec2) -> String {
    format!("{}:{}", format_num(p.x), format_num(p.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1.5:-2").unwrap(), Vec2::new(1.5, -2.0));
        assert_eq!(parse_point(" 3 : 4 ").unwrap(), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_parse_point_rejects_garbage() {
        assert!(matches!(parse_point("abc:1"), Err(ProtocolError::InvalidPoint(_))));
        assert!(matches!(parse_point("12"), Err(ProtocolError::InvalidPoint(_))));
        assert!(matches!(parse_point(""), Err(ProtocolError::InvalidPoint(_))));
        assert!(matches!(parse_point("NaN:1"), Err(ProtocolError::NonFinitePoint(_))));
        assert!(matches!(parse_point("1:inf"), Err(ProtocolError::NonFinitePoint(_))));
    }

    #[test]
    fn test_empty_payload() {
        let data = PayloadWriter::new().finish();
        assert_eq!(&data[..], br#"{"type":"events","data":[]}"#);
    }

    #[test]
    fn test_payload_preserves_order() {
        let events = [
            ServerEvent::GameOver { loser: 2, winner: 1 },
            ServerEvent::ClearLeaderboard,
            ServerEvent::Spectate { id: 7 },
        ];
        let data = compile(&events).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(value["type"], "events");
        let list = value["data"].as_array().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0][0], "onGameOver");
        assert_eq!(list[0][1], "2:1");
        assert_eq!(list[1][0], "onClearLeaderboard");
        assert_eq!(list[1][1], "");
        assert_eq!(list[2][1], "7");
    }

    #[test]
    fn test_format_point() {
        assert_eq!(format_point(Vec2::new(1.234, -0.001)), "1.23:0");
        assert_eq!(format_point(Vec2::new(10.0, 5.5)), "10:5.5");
    }
}
