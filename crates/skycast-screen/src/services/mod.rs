pub mod forecast_service;

pub use forecast_service::{
    request_forecast, request_location, settle_search, FetchOrigin, ScreenMessage, ScreenSender,
};
