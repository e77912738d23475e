pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;

pub mod catalog_service;
pub mod catalog_service_impl;
pub use catalog_service::{CatalogError, CatalogService, CouponView, EpisodeView, SeriesView};
pub use catalog_service_impl::SeaOrmCatalogService;

pub mod invoice_service;
pub use invoice_service::{
    DisabledInvoiceGenerator, InvoiceError, InvoiceGenerator, InvoiceRequest, IssuedInvoice,
};

pub mod pricing;

pub mod season_pass_service;
pub mod season_pass_service_impl;
pub use season_pass_service::{
    AccessStatus, CallbackOutcome, CreateOrderRequest, CreatedOrder, InvoiceInfo, PassSummary,
    PriceQuote, SeasonPassError, SeasonPassService,
};
pub use season_pass_service_impl::SeaOrmSeasonPassService;
