pub mod prelude;

pub mod contacts;
pub mod users;
