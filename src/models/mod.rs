pub mod batch;
pub mod events;
pub mod scrape;
