//! Decode command - classify a renderer payload the way the bridge does.

use std::io::{self, Read};

use console::style;

use pinpoint::bridge::{decode, Decoded, Direction, MalformedMessage};

use crate::error::CliError;

/// What the bridge would do with a payload arriving from the renderer.
#[derive(Debug, PartialEq)]
pub enum Verdict {
    /// Delivered to event subscribers.
    Delivered(String),
    /// Ignored without error.
    Ignored(String),
}

/// Classify `payload` as an inbound renderer message.
pub fn classify(payload: &str) -> Result<Verdict, MalformedMessage> {
    match decode(payload)? {
        Decoded::Unrecognized(message_type) => Ok(Verdict::Ignored(format!(
            "unrecognized message type '{}'",
            message_type
        ))),
        Decoded::Message(message) if message.direction() != Direction::RendererToHost => {
            Err(MalformedMessage::UnexpectedDirection(message.type_name()))
        }
        Decoded::Message(message) => {
            let detail = match message.coordinate() {
                Some(c) => format!("{} at {}", message.type_name(), c),
                None => message.type_name().to_string(),
            };
            Ok(Verdict::Delivered(detail))
        }
    }
}

/// Run the decode command. `-` reads the payload from stdin.
pub fn run(payload: &str) -> Result<(), CliError> {
    let payload = if payload == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        payload.to_string()
    };

    match classify(payload.trim())? {
        Verdict::Delivered(detail) => println!("{} {}", style("delivered:").green().bold(), detail),
        Verdict::Ignored(reason) => println!("{} {}", style("ignored:").yellow().bold(), reason),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_moved_is_delivered() {
        let verdict =
            classify(r#"{"type":"markerMoved","latitude":19.31,"longitude":73.02}"#).unwrap();
        assert!(matches!(verdict, Verdict::Delivered(d) if d.starts_with("markerMoved at")));
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        assert!(matches!(
            classify(r#"{"type":"zoomChanged"}"#).unwrap(),
            Verdict::Ignored(_)
        ));
    }

    #[test]
    fn test_host_command_from_renderer_is_rejected() {
        assert!(matches!(
            classify(r#"{"type":"recenter"}"#),
            Err(MalformedMessage::UnexpectedDirection("recenter"))
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(classify("{oops"), Err(MalformedMessage::NotJson(_))));
    }
}
