// src/services/mod.rs

//! Network and parsing services: portal session, page parser, week crawler.

mod crawler;
mod parser;
mod session;

pub use crawler::{CrawlOutcome, WeekCrawler};
pub use parser::{parse_week_page, ParsedPage};
pub use session::{Role, SessionClient};
