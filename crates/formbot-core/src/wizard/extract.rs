//! Turning a message into a field value.
//!
//! Each field type has one extraction function. Functions are looked up by
//! type after every restore, since behaviour is never persisted.

use formbot_types::event::{Attachment, FileHandle, InboundMessage};
use formbot_types::form::{FieldType, FieldValue, FileRef, FormattedText};

/// Pulls the value of one field type out of a message. `None` means the
/// message does not carry that kind of content.
pub type Extractor = fn(&InboundMessage) -> Option<FieldValue>;

/// The extraction function for `field_type`; `None` for `Auto`, which must
/// be resolved with [`detect_field_type`] first.
pub fn extractor_for(field_type: FieldType) -> Option<Extractor> {
    let f: Extractor = match field_type {
        FieldType::Auto => return None,
        FieldType::Text => text,
        FieldType::Sticker => sticker,
        FieldType::Image => image,
        FieldType::Voice => voice,
        FieldType::Audio => audio,
        FieldType::Video => video,
        FieldType::VideoNote => video_note,
        FieldType::Gif => gif,
        FieldType::Document => document,
        FieldType::Location => location,
    };
    Some(f)
}

/// Guesses the field type from the content of a message.
///
/// Attachments take priority over text; a message with neither is text.
pub fn detect_field_type(msg: &InboundMessage) -> FieldType {
    match &msg.attachment {
        Some(Attachment::Sticker(_)) => FieldType::Sticker,
        Some(Attachment::Image { .. }) => FieldType::Image,
        Some(Attachment::Voice(_)) => FieldType::Voice,
        Some(Attachment::Audio(_)) => FieldType::Audio,
        Some(Attachment::Video(_)) => FieldType::Video,
        Some(Attachment::VideoNote(_)) => FieldType::VideoNote,
        Some(Attachment::Animation(_)) => FieldType::Gif,
        Some(Attachment::Document(_)) => FieldType::Document,
        Some(Attachment::Location(_)) => FieldType::Location,
        None => FieldType::Text,
    }
}

/// Extracts a value of `field_type`, detecting the type first when it is
/// `Auto`. Returns the resolved type together with the value.
pub fn extract(field_type: FieldType, msg: &InboundMessage) -> (FieldType, Option<FieldValue>) {
    let resolved = if field_type.is_auto() {
        detect_field_type(msg)
    } else {
        field_type
    };
    let value = extractor_for(resolved).and_then(|f| f(msg));
    (resolved, value)
}

fn text(msg: &InboundMessage) -> Option<FieldValue> {
    if msg.text.is_empty() {
        return None;
    }
    Some(FieldValue::Text(FormattedText {
        text: msg.text.clone(),
        entities: msg.entities.clone(),
    }))
}

fn file(msg: &InboundMessage, handle: &FileHandle) -> FieldValue {
    FieldValue::File(FileRef {
        id: handle.file_id.clone(),
        unique_id: handle.file_unique_id.clone(),
        caption: msg.caption.clone(),
        caption_entities: msg.caption_entities.clone(),
    })
}

fn image(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        // The last size is the highest resolution.
        Some(Attachment::Image { sizes }) => sizes.last().map(|h| file(msg, h)),
        _ => None,
    }
}

fn sticker(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        Some(Attachment::Sticker(h)) => Some(file(msg, h)),
        _ => None,
    }
}

fn voice(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        Some(Attachment::Voice(h)) => Some(file(msg, h)),
        _ => None,
    }
}

fn audio(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        Some(Attachment::Audio(h)) => Some(file(msg, h)),
        _ => None,
    }
}

fn video(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        Some(Attachment::Video(h)) => Some(file(msg, h)),
        _ => None,
    }
}

fn video_note(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        Some(Attachment::VideoNote(h)) => Some(file(msg, h)),
        _ => None,
    }
}

fn gif(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        Some(Attachment::Animation(h)) => Some(file(msg, h)),
        _ => None,
    }
}

fn document(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        Some(Attachment::Document(h)) => Some(file(msg, h)),
        _ => None,
    }
}

fn location(msg: &InboundMessage) -> Option<FieldValue> {
    match &msg.attachment {
        Some(Attachment::Location(point)) => Some(FieldValue::Location(*point)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::user;
    use formbot_types::event::TextEntity;
    use formbot_types::form::GeoPoint;

    fn handle(id: &str) -> FileHandle {
        FileHandle {
            file_id: id.to_string(),
            file_unique_id: format!("u-{id}"),
        }
    }

    fn with_attachment(attachment: Attachment) -> InboundMessage {
        let mut msg = InboundMessage::text(1, 1, user(1), "");
        msg.attachment = Some(attachment);
        msg
    }

    #[test]
    fn test_text_keeps_entities_and_rejects_empty() {
        let mut msg = InboundMessage::text(1, 1, user(1), "hello");
        msg.entities.push(TextEntity {
            kind: "bold".to_string(),
            offset: 0,
            length: 5,
            url: None,
        });
        let value = extractor_for(FieldType::Text).unwrap()(&msg).unwrap();
        match value {
            FieldValue::Text(t) => {
                assert_eq!(t.text, "hello");
                assert_eq!(t.entities.len(), 1);
            }
            other => panic!("unexpected value {other:?}"),
        }

        let empty = InboundMessage::text(1, 1, user(1), "");
        assert!(extractor_for(FieldType::Text).unwrap()(&empty).is_none());
    }

    #[test]
    fn test_image_takes_largest_size_and_caption() {
        let mut msg = with_attachment(Attachment::Image {
            sizes: vec![handle("small"), handle("large")],
        });
        msg.caption = Some("me".to_string());

        let value = extractor_for(FieldType::Image).unwrap()(&msg).unwrap();
        let file = value.as_file().unwrap();
        assert_eq!(file.id, "large");
        assert_eq!(file.unique_id, "u-large");
        assert_eq!(file.caption.as_deref(), Some("me"));
    }

    #[test]
    fn test_image_without_sizes_yields_nothing() {
        let msg = with_attachment(Attachment::Image { sizes: vec![] });
        assert!(extractor_for(FieldType::Image).unwrap()(&msg).is_none());
    }

    #[test]
    fn test_wrong_kind_yields_nothing() {
        let msg = with_attachment(Attachment::Voice(handle("v")));
        assert!(extractor_for(FieldType::Audio).unwrap()(&msg).is_none());
        assert!(extractor_for(FieldType::Text).unwrap()(&msg).is_none());
        assert!(extractor_for(FieldType::Voice).unwrap()(&msg).is_some());
    }

    #[test]
    fn test_auto_has_no_extractor() {
        assert!(extractor_for(FieldType::Auto).is_none());
    }

    #[test]
    fn test_detect_field_type() {
        let cases = [
            (Attachment::Sticker(handle("s")), FieldType::Sticker),
            (Attachment::Image { sizes: vec![handle("i")] }, FieldType::Image),
            (Attachment::Voice(handle("v")), FieldType::Voice),
            (Attachment::Audio(handle("a")), FieldType::Audio),
            (Attachment::Video(handle("v")), FieldType::Video),
            (Attachment::VideoNote(handle("n")), FieldType::VideoNote),
            (Attachment::Animation(handle("g")), FieldType::Gif),
            (Attachment::Document(handle("d")), FieldType::Document),
            (
                Attachment::Location(GeoPoint { lat: 1.0, lon: 2.0 }),
                FieldType::Location,
            ),
        ];
        for (attachment, expected) in cases {
            assert_eq!(detect_field_type(&with_attachment(attachment)), expected);
        }
        let text = InboundMessage::text(1, 1, user(1), "plain");
        assert_eq!(detect_field_type(&text), FieldType::Text);
    }

    #[test]
    fn test_extract_resolves_auto() {
        let msg = with_attachment(Attachment::Location(GeoPoint { lat: 3.0, lon: 4.0 }));
        let (resolved, value) = extract(FieldType::Auto, &msg);
        assert_eq!(resolved, FieldType::Location);
        assert_eq!(
            value.and_then(|v| v.as_location()),
            Some(GeoPoint { lat: 3.0, lon: 4.0 })
        );
    }
}
