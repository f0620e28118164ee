//! Value objects - immutable identifier types

mod ids;

pub use ids::{IdParseError, MessageId, UserId};
