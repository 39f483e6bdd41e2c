mod search;
pub(crate) mod utils;
