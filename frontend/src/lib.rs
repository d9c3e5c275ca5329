//! Browser-side state for the income tracker: a typed client for the income
//! API, a reducer-backed store with async actions, and the statistics the
//! dashboard shows.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod models;
pub mod stats;
pub mod store;

pub use api::{HttpClient, IncomeApi};
pub use config::ApiConfig;
pub use context::{use_income_store, IncomeContext, IncomeProvider};
pub use error::{ApiError, ApiResult};
pub use models::{Goal, GoalInput, GoalProgress, Income, IncomeInput, RecordId};
pub use store::{Actions, Dispatch, IncomeState, LocalStore, StoreMsg};
