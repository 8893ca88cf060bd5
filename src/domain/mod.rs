mod card;
mod money;
mod page;
mod transaction;
mod user;
pub mod validation;
mod wallet;

use chrono::{DateTime, SubsecRound, Utc};

pub use card::*;
pub use money::*;
pub use page::*;
pub use transaction::*;
pub use user::*;
pub use validation::ValidationError;
pub use wallet::*;

/// Current time at the microsecond precision the store keeps, so that a
/// freshly built record compares equal to its stored copy.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
