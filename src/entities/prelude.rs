pub use super::coupons::Entity as Coupons;
pub use super::episodes::Entity as Episodes;
pub use super::season_passes::Entity as SeasonPasses;
pub use super::series::Entity as Series;
pub use super::users::Entity as Users;
