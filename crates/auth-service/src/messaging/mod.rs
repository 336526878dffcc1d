//! Broker transport and request/reply RPC client.

pub mod redis;
pub mod rpc;
pub mod transport;

/// Topics owned by the identity store.
pub mod topics {
    pub const USER_FIND_BY_EMAIL: &str = "user.findByEmail";
    pub const USER_FIND_BY_USERNAME: &str = "user.findByUsername";
    pub const USER_FIND_BY_ID: &str = "user.findById";
    pub const USER_CREATE: &str = "user.create";
    pub const USER_UPDATE: &str = "user.update";
    pub const USER_DELETE: &str = "user.delete";

    /// Replies to `topic` arrive on `topic.reply`.
    pub fn reply_topic(topic: &str) -> String {
        format!("{topic}.reply")
    }
}

#[cfg(test)]
mod tests {
    use super::topics;

    #[test]
    fn test_reply_topic_convention() {
        assert_eq!(
            topics::reply_topic(topics::USER_FIND_BY_EMAIL),
            "user.findByEmail.reply"
        );
    }
}
