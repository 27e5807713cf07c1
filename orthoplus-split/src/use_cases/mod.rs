//! Application-facing operations
//!
//! Each use case owns its collaborators (`Arc<dyn SplitRepository>` and
//! `Arc<EventBus>`) and exposes one `execute` method.

mod apply_split;
mod create_split_config;
mod deactivate_split_config;
mod queries;

pub use apply_split::ApplySplitUseCase;
pub use create_split_config::CreateSplitConfigUseCase;
pub use deactivate_split_config::DeactivateSplitConfigUseCase;
pub use queries::{SplitQueries, TransactionPage};
