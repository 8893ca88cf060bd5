//! HTTP API over [`LedgerService`].
//!
//! ```text
//! GET    /                                 GET /health
//! POST   /api/v1/users                     GET /api/v1/users?page=&size=
//! GET    /api/v1/users/{id}                PUT|PATCH|DELETE /api/v1/users/{id}
//! POST   /api/v1/wallets                   GET /api/v1/wallets?user_id=&page=&size=
//! GET    /api/v1/wallets/{id}              PUT|PATCH|DELETE /api/v1/wallets/{id}
//! POST   /api/v1/cards                     GET /api/v1/cards?wallet_id=&page=&size=
//! GET    /api/v1/cards/{id}                PUT|PATCH|DELETE /api/v1/cards/{id}
//! POST   /api/v1/transactions              GET /api/v1/transactions?wallet_id=&page=&size=
//! GET    /api/v1/transactions/{id}
//! ```

mod cards;
mod error;
mod transactions;
mod users;
mod wallets;

pub use cards::CreateCardRequest;
pub use error::{ApiResult, ErrorBody};
pub use transactions::TransferRequest;
pub use users::CreateUserRequest;
pub use wallets::CreateWalletRequest;

use actix_web::{HttpResponse, get, web};
use serde_json::json;

use crate::application::AppError;
use crate::domain::PageRequest;

/// Register the API, the health check and the extractor error handlers.
///
/// ```ignore
/// App::new()
///     .app_data(web::Data::new(service))
///     .configure(fintracker::http::configure)
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Malformed(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Malformed(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Malformed(err.to_string()).into()),
    )
    .service(index)
    .service(health)
    .service(
        web::scope("/api/v1")
            .configure(users::configure)
            .configure(wallets::configure)
            .configure(cards::configure)
            .configure(transactions::configure),
    );
}

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "fintracker API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Build a [`PageRequest`] from optional `page`/`size` query values.
fn page_request(page: Option<u32>, size: Option<u32>) -> ApiResult<PageRequest> {
    Ok(PageRequest::from_parts(page, size)?)
}
