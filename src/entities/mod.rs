pub mod prelude;

pub mod coupons;
pub mod episodes;
pub mod season_passes;
pub mod series;
pub mod users;
