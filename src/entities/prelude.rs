pub use super::contacts::Entity as Contacts;
pub use super::users::Entity as Users;
