//! Bot API update payloads and their mapping to inbound events.

use serde::Deserialize;

use crate::domain::form::{
    Command, EventPayload, FileRef, GeoPoint, InboundEvent, MediaFile, MediaKind,
};
use crate::domain::foundation::UserId;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub video: Option<Video>,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
}

/// Bot API `File`, as returned by `getFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl Update {
    /// Callback query id to acknowledge, if this update is a button press.
    pub fn callback_id(&self) -> Option<&str> {
        self.callback_query.as_ref().map(|q| q.id.as_str())
    }

    /// Maps the update to an inbound event; `None` for updates without a sender.
    pub fn to_event(&self) -> Option<InboundEvent> {
        if let Some(query) = &self.callback_query {
            let payload = match &query.data {
                Some(data) => EventPayload::Button(data.clone()),
                None => EventPayload::Unsupported,
            };
            return Some(event_for(&query.from, payload));
        }

        let message = self.message.as_ref()?;
        let from = message.from.as_ref()?;
        Some(event_for(from, message_payload(message)))
    }
}

fn event_for(user: &User, payload: EventPayload) -> InboundEvent {
    let user_id = UserId::from(user.id);
    InboundEvent::new(user_id, payload).with_display_name(user.display_name())
}

fn message_payload(message: &Message) -> EventPayload {
    if let Some(text) = &message.text {
        return match Command::parse(text) {
            Some(command) => EventPayload::Command(command),
            None => EventPayload::Text(text.clone()),
        };
    }
    if let Some(location) = &message.location {
        return EventPayload::Location(GeoPoint::new(location.latitude, location.longitude));
    }
    if let Some(sizes) = &message.photo {
        // largest rendition
        if let Some(best) = sizes.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height)) {
            return EventPayload::Media(MediaFile {
                kind: MediaKind::Photo,
                file_ref: FileRef::new(best.file_id.clone()),
            });
        }
    }
    if let Some(video) = &message.video {
        return EventPayload::Media(MediaFile {
            kind: MediaKind::Video,
            file_ref: FileRef::new(video.file_id.clone()),
        });
    }
    EventPayload::Unsupported
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn text_message_becomes_text_event() {
        let update = parse(
            r#"{"update_id":1,"message":{"message_id":5,"from":{"id":42,"first_name":"Ali","last_name":"Valiyev"},"chat":{"id":42},"text":"Samarkand"}}"#,
        );
        let event = update.to_event().unwrap();
        assert_eq!(event.user_id.as_str(), "42");
        assert_eq!(event.display_name.as_deref(), Some("Ali Valiyev"));
        assert_eq!(event.payload, EventPayload::Text("Samarkand".into()));
        assert!(update.callback_id().is_none());
    }

    #[test]
    fn slash_command_becomes_command_event() {
        let update = parse(
            r#"{"update_id":1,"message":{"message_id":5,"from":{"id":42,"first_name":"Ali"},"chat":{"id":42},"text":"/cancel"}}"#,
        );
        assert_eq!(
            update.to_event().unwrap().payload,
            EventPayload::Command(Command::Cancel)
        );
    }

    #[test]
    fn callback_query_becomes_button_event() {
        let update = parse(
            r#"{"update_id":2,"callback_query":{"id":"cb-1","from":{"id":42,"first_name":"Ali"},"data":"transformer_no"}}"#,
        );
        assert_eq!(update.callback_id(), Some("cb-1"));
        assert_eq!(
            update.to_event().unwrap().payload,
            EventPayload::Button("transformer_no".into())
        );
    }

    #[test]
    fn photo_picks_largest_size() {
        let update = parse(
            r#"{"update_id":3,"message":{"message_id":5,"from":{"id":42,"first_name":"Ali"},"chat":{"id":42},
                "photo":[{"file_id":"small","width":90,"height":90},{"file_id":"big","width":1280,"height":960},{"file_id":"mid","width":320,"height":240}]}}"#,
        );
        match update.to_event().unwrap().payload {
            EventPayload::Media(media) => {
                assert_eq!(media.kind, MediaKind::Photo);
                assert_eq!(media.file_ref.as_str(), "big");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn location_and_video_are_mapped() {
        let location = parse(
            r#"{"update_id":4,"message":{"message_id":5,"from":{"id":1,"first_name":"A"},"chat":{"id":1},"location":{"latitude":39.65,"longitude":66.96}}}"#,
        );
        assert_eq!(
            location.to_event().unwrap().payload,
            EventPayload::Location(GeoPoint::new(39.65, 66.96))
        );

        let video = parse(
            r#"{"update_id":5,"message":{"message_id":6,"from":{"id":1,"first_name":"A"},"chat":{"id":1},"video":{"file_id":"v1","duration":3}}}"#,
        );
        assert_eq!(video.to_event().unwrap().payload.kind().to_string(), "video");
    }

    #[test]
    fn sticker_is_unsupported_and_channel_posts_are_skipped() {
        let sticker = parse(
            r#"{"update_id":6,"message":{"message_id":7,"from":{"id":1,"first_name":"A"},"chat":{"id":1},"sticker":{"file_id":"s"}}}"#,
        );
        assert_eq!(sticker.to_event().unwrap().payload, EventPayload::Unsupported);

        let anonymous = parse(r#"{"update_id":7,"message":{"message_id":8,"chat":{"id":-100},"text":"hi"}}"#);
        assert!(anonymous.to_event().is_none());
    }
}
