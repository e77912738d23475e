pub mod coupon;
pub mod season_pass;
pub mod series;
