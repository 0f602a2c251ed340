use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::pagination::PageInfo;

use super::repo::{ConversationRow, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    Offline,
}

impl Presence {
    pub fn of(last_active: OffsetDateTime, now: OffsetDateTime, window_seconds: i64) -> Self {
        if now - last_active <= Duration::seconds(window_seconds) {
            Presence::Online
        } else {
            Presence::Offline
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageItem {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Message> for MessageItem {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender_id,
            receiver_id: m.receiver_id,
            content: m.content,
            is_read: m.is_read,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUser {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub status: Presence,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub user: ConversationUser,
    pub last_message: LastMessage,
    pub unread_count: i64,
}

impl Conversation {
    pub fn from_row(r: ConversationRow, now: OffsetDateTime, window_seconds: i64) -> Self {
        Self {
            id: r.other_user_id,
            user: ConversationUser {
                id: r.other_user_id,
                name: format!("{} {}", r.first_name, r.last_name),
                avatar_url: r.avatar_url,
                status: Presence::of(r.last_active, now, window_seconds),
            },
            last_message: LastMessage {
                text: r.last_message,
                created_at: r.last_message_at,
                is_read: r.unread_count == 0,
            },
            unread_count: r.unread_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Me,
    Them,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Read,
    Delivered,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    pub id: Uuid,
    pub text: String,
    pub sender: Side,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub status: DeliveryStatus,
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub messages: Vec<ThreadMessage>,
    pub pagination: PageInfo,
}

/// Turn a newest-first page into the oldest-first view the client renders.
pub fn thread_view(page: Vec<Message>, viewer: Uuid) -> Vec<ThreadMessage> {
    page.into_iter()
        .rev()
        .map(|m| ThreadMessage {
            id: m.id,
            sender: if m.sender_id == viewer { Side::Me } else { Side::Them },
            status: if m.is_read {
                DeliveryStatus::Read
            } else {
                DeliveryStatus::Delivered
            },
            text: m.content,
            created_at: m.created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: Uuid, receiver: Uuid, secs_ago: i64, is_read: bool) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            content: format!("sent {secs_ago}s ago"),
            is_read,
            created_at: OffsetDateTime::now_utc() - Duration::seconds(secs_ago),
        }
    }

    #[test]
    fn thread_is_oldest_first_with_sides() {
        let me = Uuid::new_v4();
        let them = Uuid::new_v4();
        let page = vec![
            message(them, me, 10, false),
            message(me, them, 20, true),
            message(them, me, 30, true),
        ];
        let view = thread_view(page, me);
        assert_eq!(view[0].text, "sent 30s ago");
        assert_eq!(view[0].sender, Side::Them);
        assert_eq!(view[1].sender, Side::Me);
        assert_eq!(view[2].status, DeliveryStatus::Delivered);
        let json = serde_json::to_value(&view[1]).unwrap();
        assert_eq!(json["sender"], "me");
        assert_eq!(json["status"], "read");
    }

    #[test]
    fn presence_window() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(Presence::of(now - Duration::seconds(60), now, 300), Presence::Online);
        assert_eq!(Presence::of(now - Duration::seconds(301), now, 300), Presence::Offline);
    }

    #[test]
    fn conversation_read_flag_follows_unread_count() {
        let now = OffsetDateTime::now_utc();
        let row = |unread| ConversationRow {
            other_user_id: Uuid::new_v4(),
            first_name: "Mike".into(),
            last_name: "Wilson".into(),
            avatar_url: None,
            last_active: now - Duration::hours(2),
            last_message: "See you Tuesday".into(),
            last_message_at: now,
            unread_count: unread,
        };
        let c = Conversation::from_row(row(0), now, 300);
        assert!(c.last_message.is_read);
        assert_eq!(c.user.status, Presence::Offline);
        let c = Conversation::from_row(row(3), now, 300);
        assert!(!c.last_message.is_read);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["unreadCount"], 3);
        assert_eq!(json["user"]["name"], "Mike Wilson");
    }
}
