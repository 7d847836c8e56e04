pub mod movie;
pub mod genre;
pub mod user;
pub mod rating;
pub mod external_ids;
pub mod outcome;

pub use movie::{EnrichmentItem, Movie};
pub use genre::Genre;
pub use user::User;
pub use rating::Rating;
pub use external_ids::ExternalIdMap;
pub use outcome::{FetchOutcome, OutcomeTally};
