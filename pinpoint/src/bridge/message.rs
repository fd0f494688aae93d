//! Bridge message vocabulary and JSON wire codec.
//!
//! # Wire Format
//!
//! Every message is a flat JSON object. Nested objects and arrays are
//! rejected.
//!
//! ```text
//! {"type":"recenterTo","latitude":19.3,"longitude":73.0}   host → renderer
//! {"type":"recenter"}                                       host → renderer
//! {"type":"markerMoved","latitude":19.31,"longitude":73.02} renderer → host
//! ```
//!
//! Unknown `type` values decode to [`Decoded::Unrecognized`] rather than an
//! error, so newer renderers can add events without breaking older hosts.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::coord::{CoordError, Coordinate};

/// Wire discriminant for [`BridgeMessage::RecenterTo`].
pub const TYPE_RECENTER_TO: &str = "recenterTo";
/// Wire discriminant for [`BridgeMessage::Recenter`].
pub const TYPE_RECENTER: &str = "recenter";
/// Wire discriminant for [`BridgeMessage::MarkerMoved`].
pub const TYPE_MARKER_MOVED: &str = "markerMoved";

/// A message exchanged with the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeMessage {
    /// Move the view and marker to the given coordinate.
    RecenterTo(Coordinate),
    /// Move the view and marker back to the last host-supplied coordinate.
    Recenter,
    /// The user finished dragging the marker.
    MarkerMoved(Coordinate),
}

/// Which side of the channel originates a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HostToRenderer,
    RendererToHost,
}

impl BridgeMessage {
    /// Direction this message travels.
    pub fn direction(&self) -> Direction {
        match self {
            BridgeMessage::RecenterTo(_) | BridgeMessage::Recenter => Direction::HostToRenderer,
            BridgeMessage::MarkerMoved(_) => Direction::RendererToHost,
        }
    }

    /// Wire discriminant.
    pub fn type_name(&self) -> &'static str {
        match self {
            BridgeMessage::RecenterTo(_) => TYPE_RECENTER_TO,
            BridgeMessage::Recenter => TYPE_RECENTER,
            BridgeMessage::MarkerMoved(_) => TYPE_MARKER_MOVED,
        }
    }

    /// Coordinate carried by the message, if any.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            BridgeMessage::RecenterTo(c) | BridgeMessage::MarkerMoved(c) => Some(*c),
            BridgeMessage::Recenter => None,
        }
    }
}

/// Result of decoding a well-formed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A message from the known vocabulary.
    Message(BridgeMessage),
    /// Well-formed, but with a `type` this host does not understand.
    Unrecognized(String),
}

/// Reasons an inbound payload is rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedMessage {
    #[error("payload is not JSON: {0}")]
    NotJson(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no string 'type' field")]
    MissingType,

    #[error("field '{0}' is not a primitive value")]
    NestedValue(String),

    #[error("field '{field}' of '{message_type}' is missing or not a number")]
    InvalidField {
        message_type: &'static str,
        field: &'static str,
    },

    #[error("coordinate out of range: {0}")]
    OutOfRange(#[from] CoordError),

    #[error("'{0}' cannot be sent by the renderer")]
    UnexpectedDirection(&'static str),
}

/// Serialize a message to its wire form.
pub fn encode(message: &BridgeMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Parse an untrusted payload.
///
/// Never panics. Numeric fields are validated before a [`Coordinate`] is
/// built from them.
pub fn decode(raw: &str) -> Result<Decoded, MalformedMessage> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| MalformedMessage::NotJson(e.to_string()))?;

    let Value::Object(map) = value else {
        return Err(MalformedMessage::NotAnObject);
    };

    if let Some((key, _)) = map
        .iter()
        .find(|(_, v)| matches!(v, Value::Object(_) | Value::Array(_)))
    {
        return Err(MalformedMessage::NestedValue(key.clone()));
    }

    let Some(Value::String(message_type)) = map.get("type") else {
        return Err(MalformedMessage::MissingType);
    };

    let message = match message_type.as_str() {
        TYPE_RECENTER_TO => BridgeMessage::RecenterTo(coordinate_fields(&map, TYPE_RECENTER_TO)?),
        TYPE_RECENTER => BridgeMessage::Recenter,
        TYPE_MARKER_MOVED => {
            BridgeMessage::MarkerMoved(coordinate_fields(&map, TYPE_MARKER_MOVED)?)
        }
        other => return Ok(Decoded::Unrecognized(other.to_string())),
    };

    Ok(Decoded::Message(message))
}

fn coordinate_fields(
    map: &Map<String, Value>,
    message_type: &'static str,
) -> Result<Coordinate, MalformedMessage> {
    let latitude = number_field(map, message_type, "latitude")?;
    let longitude = number_field(map, message_type, "longitude")?;
    Ok(Coordinate::new(latitude, longitude)?)
}

fn number_field(
    map: &Map<String, Value>,
    message_type: &'static str,
    field: &'static str,
) -> Result<f64, MalformedMessage> {
    map.get(field)
        .and_then(Value::as_f64)
        .ok_or(MalformedMessage::InvalidField {
            message_type,
            field,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_encode_recenter_to_is_flat() {
        let json = encode(&BridgeMessage::RecenterTo(coord(19.3, 73.0))).unwrap();
        assert_eq!(json, r#"{"type":"recenterTo","latitude":19.3,"longitude":73.0}"#);
    }

    #[test]
    fn test_encode_recenter_has_only_type() {
        let json = encode(&BridgeMessage::Recenter).unwrap();
        assert_eq!(json, r#"{"type":"recenter"}"#);
    }

    #[test]
    fn test_decode_marker_moved() {
        let decoded =
            decode(r#"{"type":"markerMoved","latitude":19.31,"longitude":73.02}"#).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(BridgeMessage::MarkerMoved(coord(19.31, 73.02)))
        );
    }

    #[test]
    fn test_decode_keeps_shortest_form_floats_exact() {
        // Shortest round-trip form, as JSON.stringify emits it.
        let raw = r#"{"type":"markerMoved","latitude":0,"longitude":-94.17990636947043}"#;
        let expected = coord(0.0, -94.179_906_369_470_43);
        assert_eq!(
            decode(raw).unwrap(),
            Decoded::Message(BridgeMessage::MarkerMoved(expected))
        );
    }

    #[test]
    fn test_decode_accepts_integer_numbers() {
        let decoded = decode(r#"{"type":"markerMoved","latitude":19,"longitude":73}"#).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(BridgeMessage::MarkerMoved(coord(19.0, 73.0)))
        );
    }

    #[test]
    fn test_decode_unknown_type_is_not_an_error() {
        let decoded = decode(r#"{"type":"zoomChanged","zoom":15}"#).unwrap();
        assert_eq!(decoded, Decoded::Unrecognized("zoomChanged".to_string()));
    }

    #[test]
    fn test_decode_rejections() {
        assert!(matches!(decode("not json"), Err(MalformedMessage::NotJson(_))));
        assert_eq!(decode("[1,2]"), Err(MalformedMessage::NotAnObject));
        assert_eq!(decode(r#""markerMoved""#), Err(MalformedMessage::NotAnObject));
        assert_eq!(
            decode(r#"{"latitude":1,"longitude":2}"#),
            Err(MalformedMessage::MissingType)
        );
        assert_eq!(
            decode(r#"{"type":7,"latitude":1,"longitude":2}"#),
            Err(MalformedMessage::MissingType)
        );
        assert_eq!(
            decode(r#"{"type":"markerMoved","pos":{"latitude":1,"longitude":2}}"#),
            Err(MalformedMessage::NestedValue("pos".to_string()))
        );
    }

    #[test]
    fn test_decode_validates_numeric_fields() {
        assert_eq!(
            decode(r#"{"type":"markerMoved","latitude":"19.3","longitude":73.0}"#),
            Err(MalformedMessage::InvalidField {
                message_type: TYPE_MARKER_MOVED,
                field: "latitude",
            })
        );
        assert_eq!(
            decode(r#"{"type":"recenterTo","latitude":19.3}"#),
            Err(MalformedMessage::InvalidField {
                message_type: TYPE_RECENTER_TO,
                field: "longitude",
            })
        );
        assert!(matches!(
            decode(r#"{"type":"markerMoved","latitude":95.0,"longitude":73.0}"#),
            Err(MalformedMessage::OutOfRange(CoordError::InvalidLatitude(_)))
        ));
    }

    #[test]
    fn test_direction() {
        assert_eq!(BridgeMessage::Recenter.direction(), Direction::HostToRenderer);
        assert_eq!(
            BridgeMessage::MarkerMoved(coord(0.0, 0.0)).direction(),
            Direction::RendererToHost
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_decode_never_panics(raw in ".*") {
                let _ = decode(&raw);
            }

            #[test]
            fn test_decode_never_panics_on_object_shapes(
                ty in prop_oneof![
                    Just("markerMoved".to_string()),
                    Just("recenterTo".to_string()),
                    "[a-zA-Z]{0,12}",
                ],
                lat in any::<f64>(),
                lon in any::<f64>(),
            ) {
                // Non-finite values serialize as null and must be rejected.
                let raw = format!(
                    r#"{{"type":"{}","latitude":{},"longitude":{}}}"#,
                    ty,
                    serde_json::to_string(&lat).unwrap(),
                    serde_json::to_string(&lon).unwrap(),
                );
                if let Ok(Decoded::Message(msg)) = decode(&raw) {
                    let c = msg.coordinate().unwrap();
                    prop_assert!(c.latitude().is_finite() && c.longitude().is_finite());
                }
            }

            #[test]
            fn test_marker_moved_wire_form_decodes_exactly(
                lat in -90.0..=90.0_f64,
                lon in -180.0..=180.0_f64,
            ) {
                let msg = BridgeMessage::MarkerMoved(coord(lat, lon));
                let decoded = decode(&encode(&msg).unwrap()).unwrap();
                prop_assert_eq!(decoded, Decoded::Message(msg));
            }
        }
    }
}
