mod ask;
mod chat;
mod clear;
mod config;
mod ingest;
mod pipeline;
mod run;
mod status;

pub use ask::AskArgs;
pub use chat::ChatArgs;
pub use clear::ClearArgs;
pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use run::RunArgs;

pub use ask::handle_ask;
pub use chat::handle_chat;
pub use clear::handle_clear;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use run::handle_run;
pub use status::handle_status;
