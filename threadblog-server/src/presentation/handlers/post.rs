use crate::application::post_service::PostService;
use crate::data::comment_repository::PostgresCommentRepository;
use crate::data::post_repository::PostgresPostRepository;
use crate::domain::error::DomainError;
use crate::presentation::dto::{
    AddCommentRequest, CreatePostRequest, ListPostsQuery, PostSummary, UpdatePostRequest,
};
use crate::presentation::utils::AuthenticatedUser;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, delete, get, post, put, web};
use tracing::info;
use uuid::Uuid;

type Posts = PostService<PostgresPostRepository, PostgresCommentRepository>;

#[get("/posts")]
async fn list_posts(
    service: web::Data<Posts>,
    query: web::Query<ListPostsQuery>,
) -> Result<HttpResponse, DomainError> {
    let filter = query.q.as_deref().filter(|q| !q.is_empty());
    let page = service.list(filter, query.page.unwrap_or(1)).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Full dump, no filter, no paging. Kept separate from the paginated
/// listing because consumers read it as a whole.
#[get("/posts/all")]
async fn export_posts(service: web::Data<Posts>) -> Result<HttpResponse, DomainError> {
    let posts = service.list_all().await?;
    let summaries: Vec<PostSummary> = posts.into_iter().map(PostSummary::from).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

#[get("/posts/{id}")]
async fn get_post_detail(
    service: web::Data<Posts>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let detail = service.get_detail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[post("/posts")]
async fn create_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<Posts>,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, DomainError> {
    let payload = payload.into_inner();
    let post = service
        .create_post(user.id, payload.title, payload.content)
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = %post.id,
        "post created"
    );

    Ok(HttpResponse::Created().json(post))
}

#[put("/posts/{id}")]
async fn update_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<Posts>,
    payload: web::Json<UpdatePostRequest>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let payload = payload.into_inner();
    let post = service
        .update_post(post_id, user.id, payload.title, payload.content)
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = %post.id,
        "post updated"
    );

    Ok(HttpResponse::Ok().json(post))
}

#[delete("/posts/{id}")]
async fn delete_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<Posts>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    service.delete_post(post_id, user.id).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = %post_id,
        "post deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}

/// Comments are anonymous; no authentication required.
#[post("/posts/{id}/comments")]
async fn add_comment(
    req: HttpRequest,
    service: web::Data<Posts>,
    payload: web::Json<AddCommentRequest>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let payload = payload.into_inner();
    let comment = service
        .add_comment(post_id, payload.text, payload.parent_id)
        .await?;

    info!(
        request_id = %request_id(&req),
        post_id = %post_id,
        comment_id = %comment.id,
        "comment added"
    );

    Ok(HttpResponse::Created().json(comment))
}

fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<crate::presentation::middleware::RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "unknown".into())
}
