use actix_web::{HttpResponse, delete, get, post, route, web};
use serde::{Deserialize, Serialize};

use crate::application::LedgerService;
use crate::domain::{Page, User, UserDetails, UserId, UserUpdate};

use super::{ApiResult, page_request};

/// Body of `POST /api/v1/users`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub tax_id: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    page: Option<u32>,
    size: Option<u32>,
}

pub(super) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_user)
        .service(list_users)
        .service(get_user)
        .service(update_user)
        .service(delete_user);
}

#[post("/users")]
async fn create_user(
    service: web::Data<LedgerService>,
    payload: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    let request = payload.into_inner();
    let user = service
        .create_user(&request.name, &request.tax_id, &request.email)
        .await?;
    Ok(HttpResponse::Created().json(user))
}

#[get("/users")]
async fn list_users(
    service: web::Data<LedgerService>,
    query: web::Query<UserQuery>,
) -> ApiResult<web::Json<Page<User>>> {
    let page = page_request(query.page, query.size)?;
    Ok(web::Json(service.list_users(page).await?))
}

#[get("/users/{id}")]
async fn get_user(
    service: web::Data<LedgerService>,
    id: web::Path<UserId>,
) -> ApiResult<web::Json<UserDetails>> {
    Ok(web::Json(service.get_user_details(id.into_inner()).await?))
}

#[route("/users/{id}", method = "PUT", method = "PATCH")]
async fn update_user(
    service: web::Data<LedgerService>,
    id: web::Path<UserId>,
    payload: web::Json<UserUpdate>,
) -> ApiResult<web::Json<User>> {
    let user = service
        .update_user(id.into_inner(), payload.into_inner())
        .await?;
    Ok(web::Json(user))
}

#[delete("/users/{id}")]
async fn delete_user(
    service: web::Data<LedgerService>,
    id: web::Path<UserId>,
) -> ApiResult<HttpResponse> {
    service.delete_user(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
