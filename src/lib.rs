//! Headless news watcher: polls RSS feeds, detects genuinely new stories,
//! and raises keyword alerts with a bounded history and an unread badge.

pub mod config;
pub mod feed;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
pub mod storage;
