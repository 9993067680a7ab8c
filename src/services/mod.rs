pub mod distribution;
pub mod llm_service;
pub mod oracle;
pub mod report;
pub mod settings_store;
pub mod warn_writer;

pub use distribution::repair;
pub use llm_service::LlmService;
pub use oracle::{OracleRequest, OracleResponse, ScoreOracle};
pub use report::ReportRenderer;
pub use settings_store::{load_or_init, MemorySettingsStore, SettingsStore, TomlSettingsStore};
pub use warn_writer::WarnWriter;
