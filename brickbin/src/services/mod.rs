//! Remote catalog clients and the enrichment phases

pub mod brick_architect;
pub mod enrichment;
pub mod rebrickable_client;
