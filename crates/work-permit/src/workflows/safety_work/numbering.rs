use chrono::NaiveDateTime;
use rand::Rng;

use super::domain::ApplicationNumber;

/// Source of candidate application numbers. The `applications` table enforces uniqueness; a
/// colliding number is rejected there and the service asks for another one.
pub trait ApplicationNumberSource: Send + Sync {
    fn next_number(&self, phone: &str, submitted_at: NaiveDateTime) -> ApplicationNumber;
}

/// `SW` + submit timestamp + last four phone digits + six random digits.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNumberSource;

impl ApplicationNumberSource for RandomNumberSource {
    fn next_number(&self, phone: &str, submitted_at: NaiveDateTime) -> ApplicationNumber {
        let phone_tail: String = {
            let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
            let start = digits.len().saturating_sub(4);
            digits[start..].iter().collect()
        };
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);

        ApplicationNumber(format!(
            "SW{}{phone_tail:0>4}{suffix:06}",
            submitted_at.format("%Y%m%d%H%M%S")
        ))
    }
}
