// Solace - Mental health support chat backend
// Library exports

pub mod config;
pub mod crisis; // Keyword risk scoring and helpline resources
pub mod errors;
pub mod generators; // Candidate text generation capability
pub mod pipeline; // Chat turn orchestration
pub mod providers; // Instruction LLM providers
pub mod resources; // Scraped informational content
pub mod server; // HTTP surface
