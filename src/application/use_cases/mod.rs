pub mod analysis;
pub mod flows;
pub mod ingestion;
pub mod requirement_parser;
pub mod scenario_store;
pub mod test_generation;
pub mod workspace;
