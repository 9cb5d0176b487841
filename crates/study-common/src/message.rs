use serde::{Deserialize, Serialize};

/// Author of a chat message.
///
/// The agent side is serialized as `"ai"`, which is what the chat log
/// endpoint stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai")]
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
        }
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_role_serializes_as_ai() {
        let json = serde_json::to_string(&Message::agent("hi")).unwrap();
        assert_eq!(json, r#"{"role":"ai","content":"hi"}"#);
    }

    #[test]
    fn user_role_round_trips() {
        let msg: Message = serde_json::from_str(r#"{"role":"user","content":"hey"}"#).unwrap();
        assert_eq!(msg, Message::user("hey"));
        assert!(!msg.is_agent());
    }
}
