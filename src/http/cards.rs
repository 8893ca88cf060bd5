use actix_web::{HttpResponse, delete, get, post, route, web};
use serde::{Deserialize, Serialize};

use crate::application::LedgerService;
use crate::domain::{Card, CardId, CardUpdate, Cents, Page, WalletId, cents};

use super::{ApiResult, page_request};

/// Body of `POST /api/v1/cards`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateCardRequest {
    pub wallet_id: WalletId,
    pub number: String,
    /// `MM/YY`
    pub expiry: String,
    #[serde(with = "cents")]
    pub limit: Cents,
}

#[derive(Debug, Deserialize)]
struct CardQuery {
    wallet_id: Option<WalletId>,
    page: Option<u32>,
    size: Option<u32>,
}

pub(super) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_card)
        .service(list_cards)
        .service(get_card)
        .service(update_card)
        .service(delete_card);
}

#[post("/cards")]
async fn create_card(
    service: web::Data<LedgerService>,
    payload: web::Json<CreateCardRequest>,
) -> ApiResult<HttpResponse> {
    let request = payload.into_inner();
    let card = service
        .create_card(
            request.wallet_id,
            &request.number,
            &request.expiry,
            request.limit,
        )
        .await?;
    Ok(HttpResponse::Created().json(card))
}

#[get("/cards")]
async fn list_cards(
    service: web::Data<LedgerService>,
    query: web::Query<CardQuery>,
) -> ApiResult<web::Json<Page<Card>>> {
    let page = page_request(query.page, query.size)?;
    Ok(web::Json(service.list_cards(query.wallet_id, page).await?))
}

#[get("/cards/{id}")]
async fn get_card(
    service: web::Data<LedgerService>,
    id: web::Path<CardId>,
) -> ApiResult<web::Json<Card>> {
    Ok(web::Json(service.get_card(id.into_inner()).await?))
}

#[route("/cards/{id}", method = "PUT", method = "PATCH")]
async fn update_card(
    service: web::Data<LedgerService>,
    id: web::Path<CardId>,
    payload: web::Json<CardUpdate>,
) -> ApiResult<web::Json<Card>> {
    let card = service
        .update_card(id.into_inner(), payload.into_inner())
        .await?;
    Ok(web::Json(card))
}

#[delete("/cards/{id}")]
async fn delete_card(
    service: web::Data<LedgerService>,
    id: web::Path<CardId>,
) -> ApiResult<HttpResponse> {
    service.delete_card(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
