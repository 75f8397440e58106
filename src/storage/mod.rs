mod history;
mod keywords;
mod schema;
mod state;
mod types;

pub use history::HISTORY_CAP;
pub use schema::Store;
pub use types::{AlertEntry, CycleCommit, StoreError};
