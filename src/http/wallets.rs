use actix_web::{HttpResponse, delete, get, post, route, web};
use serde::{Deserialize, Serialize};

use crate::application::LedgerService;
use crate::domain::{Cents, Page, UserId, Wallet, WalletDetails, WalletId, WalletUpdate, cents};

use super::{ApiResult, page_request};

/// Body of `POST /api/v1/wallets`. Currency defaults to BRL; the opening
/// balance is required.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateWalletRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(with = "cents")]
    pub balance: Cents,
}

#[derive(Debug, Deserialize)]
struct WalletQuery {
    user_id: Option<UserId>,
    page: Option<u32>,
    size: Option<u32>,
}

pub(super) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_wallet)
        .service(list_wallets)
        .service(get_wallet)
        .service(update_wallet)
        .service(delete_wallet);
}

#[post("/wallets")]
async fn create_wallet(
    service: web::Data<LedgerService>,
    payload: web::Json<CreateWalletRequest>,
) -> ApiResult<HttpResponse> {
    let request = payload.into_inner();
    let wallet = service
        .create_wallet(request.user_id, request.currency.as_deref(), request.balance)
        .await?;
    Ok(HttpResponse::Created().json(wallet))
}

#[get("/wallets")]
async fn list_wallets(
    service: web::Data<LedgerService>,
    query: web::Query<WalletQuery>,
) -> ApiResult<web::Json<Page<Wallet>>> {
    let page = page_request(query.page, query.size)?;
    Ok(web::Json(service.list_wallets(query.user_id, page).await?))
}

#[get("/wallets/{id}")]
async fn get_wallet(
    service: web::Data<LedgerService>,
    id: web::Path<WalletId>,
) -> ApiResult<web::Json<WalletDetails>> {
    Ok(web::Json(service.get_wallet_details(id.into_inner()).await?))
}

#[route("/wallets/{id}", method = "PUT", method = "PATCH")]
async fn update_wallet(
    service: web::Data<LedgerService>,
    id: web::Path<WalletId>,
    payload: web::Json<WalletUpdate>,
) -> ApiResult<web::Json<Wallet>> {
    let wallet = service
        .update_wallet(id.into_inner(), payload.into_inner())
        .await?;
    Ok(web::Json(wallet))
}

#[delete("/wallets/{id}")]
async fn delete_wallet(
    service: web::Data<LedgerService>,
    id: web::Path<WalletId>,
) -> ApiResult<HttpResponse> {
    service.delete_wallet(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
