mod url;

pub use url::{CreateUrlRequest, CreateUrlResponse, ErrorResponse, GetUrlResponse, HealthResponse};
