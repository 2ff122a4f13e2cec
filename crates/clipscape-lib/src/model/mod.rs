pub mod candidate;
pub mod record;
pub mod result;
