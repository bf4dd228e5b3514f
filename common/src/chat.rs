//! AIチャット（書籍の相談）の会話履歴

/// 応答を得られなかった場合の文言
pub const CHAT_FAILURE: &str = "回答を取得できませんでした。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

/// 送信リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTicket {
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    waiting: usize,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// 発言を追加して送信リクエストを返す（空白のみなら無し）
    pub fn send(&mut self, input: &str) -> Option<ChatTicket> {
        if input.trim().is_empty() {
            return None;
        }
        self.messages.push(ChatMessage {
            sender: Sender::User,
            text: input.to_string(),
        });
        self.waiting += 1;
        Some(ChatTicket {
            message: input.to_string(),
        })
    }

    /// 応答を追加（到着順）
    pub fn finish(&mut self, reply: Option<String>) {
        self.waiting = self.waiting.saturating_sub(1);
        self.messages.push(ChatMessage {
            sender: Sender::Bot,
            text: reply.unwrap_or_else(|| CHAT_FAILURE.to_string()),
        });
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting > 0
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_reply() {
        let mut chat = ChatTranscript::new();
        let ticket = chat.send("おすすめのSFは？").unwrap();
        assert_eq!(ticket.message, "おすすめのSFは？");
        assert!(chat.is_waiting());

        chat.finish(Some("Dune".into()));
        assert!(!chat.is_waiting());
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1].sender, Sender::Bot);
    }

    #[test]
    fn test_blank_message_not_sent() {
        let mut chat = ChatTranscript::new();
        assert!(chat.send("  ").is_none());
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn test_failed_reply_uses_placeholder() {
        let mut chat = ChatTranscript::new();
        chat.send("hi").unwrap();
        chat.finish(None);
        assert_eq!(chat.messages()[1].text, CHAT_FAILURE);
    }

    #[test]
    fn test_replies_append_in_arrival_order() {
        let mut chat = ChatTranscript::new();
        chat.send("a").unwrap();
        chat.send("b").unwrap();
        chat.finish(Some("first".into()));
        assert!(chat.is_waiting());
        chat.finish(Some("second".into()));
        assert!(!chat.is_waiting());

        let texts: Vec<&str> = chat.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "first", "second"]);
    }
}
