use rand::Rng;
use serde::{Deserialize, Serialize};

/// Body of a review submission. Sent either as JSON or as a urlencoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub product_id: String,
    pub review: String,
    pub username: String,
}

impl ReviewPayload {
    pub fn bot(index: usize) -> Self {
        Self {
            product_id: format!("prod{:04}", index),
            review: format!("This is review {} from bot simulation", index),
            username: format!("bot_user_{:04}", index),
        }
    }

    pub fn human(user_id: usize, product_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            review: format!(
                "I really like this product! It's exactly what I needed. User {} review.",
                user_id
            ),
            username: format!("User{:03}", user_id),
        }
    }

    pub fn flood(index: usize) -> Self {
        Self {
            product_id: format!("prod{:04}", index),
            review: format!("flood attack {}", index),
            username: "attacker".to_string(),
        }
    }

    /// Review with `payload` appended to the product id and the review text.
    pub fn injection(attempt: usize, payload: &str) -> Self {
        Self {
            product_id: format!("exploit_{}; {}", attempt, payload),
            review: format!("Test comment {}", payload),
            username: format!("user{}", attempt),
        }
    }

    /// Single review whose product id carries a shell command after a tag.
    pub fn command(tag: u32, command: &str) -> Self {
        Self {
            product_id: format!("exploit_{}; {}", tag, command),
            review: "This is a test review".to_string(),
            username: "test_user".to_string(),
        }
    }
}

pub fn random_product_id() -> String {
    format!("prod{:04}", rand::thread_rng().gen_range(1000..=9999))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_payload_is_zero_padded() {
        let payload = ReviewPayload::bot(7);
        assert_eq!(payload.product_id, "prod0007");
        assert_eq!(payload.review, "This is review 7 from bot simulation");
        assert_eq!(payload.username, "bot_user_0007");
    }

    #[test]
    fn test_human_payload() {
        let payload = ReviewPayload::human(2, "prod4321");
        assert_eq!(payload.product_id, "prod4321");
        assert_eq!(payload.username, "User002");
        assert!(payload.review.contains("User 2 review."));
    }

    #[test]
    fn test_flood_payload() {
        let payload = ReviewPayload::flood(12345);
        assert_eq!(payload.product_id, "prod12345");
        assert_eq!(payload.review, "flood attack 12345");
        assert_eq!(payload.username, "attacker");
    }

    #[test]
    fn test_injection_payload_embeds_string() {
        let payload = ReviewPayload::injection(3, "' OR 1=1 --");
        assert_eq!(payload.product_id, "exploit_3; ' OR 1=1 --");
        assert_eq!(payload.review, "Test comment ' OR 1=1 --");
        assert_eq!(payload.username, "user3");
    }

    #[test]
    fn test_command_payload() {
        let payload = ReviewPayload::command(4242, "echo hi");
        assert_eq!(payload.product_id, "exploit_4242; echo hi");
        assert_eq!(payload.review, "This is a test review");
        assert_eq!(payload.username, "test_user");
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(ReviewPayload::bot(1)).unwrap();
        assert_eq!(json["product_id"], "prod0001");
        assert_eq!(json["username"], "bot_user_0001");
    }

    #[test]
    fn test_random_product_id_range() {
        for _ in 0..50 {
            let id = random_product_id();
            let n: u32 = id.trim_start_matches("prod").parse().unwrap();
            assert!((1000..=9999).contains(&n));
        }
    }
}
