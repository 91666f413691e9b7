/// Application name
pub const APP_NAME: &str = "Parley";

/// Messages shown per page of a chatroom
pub const PAGE_SIZE: usize = 20;

/// Number of placeholder messages synthesized per history load
pub const HISTORY_BATCH_SIZE: usize = 20;

/// Spacing between synthesized history timestamps, in seconds
pub const HISTORY_SPACING_SECS: i64 = 60;

/// The only code the mocked OTP check accepts
pub const DEMO_OTP: &str = "123456";

/// Required OTP length
pub const OTP_LENGTH: usize = 6;

/// Accepted phone number length (inclusive)
pub const PHONE_MIN_LEN: usize = 7;
pub const PHONE_MAX_LEN: usize = 15;

/// Simulated OTP delivery and verification latency, in milliseconds
pub const OTP_SEND_DELAY_MS: u64 = 1500;
pub const OTP_VERIFY_DELAY_MS: u64 = 1000;

/// AI reply latency: base plus uniform jitter, in milliseconds
pub const REPLY_BASE_DELAY_MS: u64 = 2000;
pub const REPLY_JITTER_MS: u64 = 2000;

/// Summary text used for a chatroom whose last message carried an image
pub const IMAGE_MARKER: &str = "📷 Image";

/// Persisted snapshot slot names
pub const SESSION_SLOT: &str = "auth-storage";
pub const CONVERSATION_SLOT: &str = "chat-storage";

/// Public country / dial-code list
pub const COUNTRIES_URL: &str = "https://restcountries.com/v3.1/all?fields=name,cca2,idd,flag";

/// Canned replies the simulated assistant picks from
pub const CANNED_REPLIES: [&str; 5] = [
    "That's an interesting point! Let me think about that.",
    "I understand what you're saying. Here's my perspective...",
    "Great question! Based on what you've shared...",
    "I can help you with that. Let me provide some insights.",
    "That's a fascinating topic. Here's what I think...",
];
