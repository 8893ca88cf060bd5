use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};

use crate::application::LedgerService;
use crate::domain::{Cents, Page, Transaction, TransactionId, WalletId, cents};

use super::{ApiResult, page_request};

/// Body of `POST /api/v1/transactions`.
///
/// `amount` is a decimal with at most two places, as a string (`"40.00"`)
/// or a JSON number.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferRequest {
    pub source_wallet_id: WalletId,
    pub destination_wallet_id: WalletId,
    #[serde(with = "cents")]
    pub amount: Cents,
}

#[derive(Debug, Deserialize)]
struct TransactionQuery {
    wallet_id: Option<WalletId>,
    page: Option<u32>,
    size: Option<u32>,
}

pub(super) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(transfer)
        .service(list_transactions)
        .service(get_transaction);
}

#[post("/transactions")]
async fn transfer(
    service: web::Data<LedgerService>,
    payload: web::Json<TransferRequest>,
) -> ApiResult<web::Json<Transaction>> {
    let request = payload.into_inner();
    let transaction = service
        .transfer(
            request.source_wallet_id,
            request.destination_wallet_id,
            request.amount,
        )
        .await?;
    Ok(web::Json(transaction))
}

#[get("/transactions")]
async fn list_transactions(
    service: web::Data<LedgerService>,
    query: web::Query<TransactionQuery>,
) -> ApiResult<web::Json<Page<Transaction>>> {
    let page = page_request(query.page, query.size)?;
    Ok(web::Json(
        service.list_transactions(query.wallet_id, page).await?,
    ))
}

#[get("/transactions/{id}")]
async fn get_transaction(
    service: web::Data<LedgerService>,
    id: web::Path<TransactionId>,
) -> ApiResult<web::Json<Transaction>> {
    Ok(web::Json(service.get_transaction(id.into_inner()).await?))
}
