pub mod extract;
pub mod validation;

pub use extract::{PathParam, QueryParams};
pub use validation::ValidatedJson;
