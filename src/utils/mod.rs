pub mod markdown;
pub mod slug;
