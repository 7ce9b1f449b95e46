use crate::catalog::ImageRecord;
use crate::config::AppConfig;
use crate::error::{AppError, QueryError};
use crate::processor;
use crate::query::CatalogHandle;
use actix_files::NamedFile;
use actix_web::http::header::{self, HeaderName, HeaderValue};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Debug)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    content_version: String,
    images: usize,
    categories: usize,
}

#[derive(Deserialize, Debug)]
pub struct RandomParams {
    category: Option<String>,
    #[serde(default)]
    raw: bool,
}

#[derive(Deserialize, Debug)]
pub struct ImageParams {
    #[serde(default)]
    raw: bool,
}

#[derive(Deserialize, Debug)]
pub struct CategoryParams {
    category: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    query: String,
    category: Option<String>,
    limit: Option<usize>,
}

#[derive(Deserialize, Debug)]
pub struct TagSearchParams {
    tags: Option<String>,
    author: Option<String>,
    limit: Option<usize>,
}

async fn info(catalog: web::Data<CatalogHandle>) -> HttpResponse {
    let snapshot = catalog.snapshot();
    HttpResponse::Ok().json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        content_version: snapshot.version.clone(),
        images: snapshot.query.catalog().len(),
        categories: snapshot.query.catalog().categories().len(),
    })
}

/// Streams the original file or its cached WebP preview.
async fn image_response(
    req: &HttpRequest,
    config: &AppConfig,
    record: Arc<ImageRecord>,
    raw: bool,
) -> Result<HttpResponse, AppError> {
    let path = if raw {
        record.storage_path.clone()
    } else {
        let config = config.clone();
        let record = Arc::clone(&record);
        web::block(move || processor::webp_preview(&config, &record))
            .await
            .map_err(|e| AppError::Generic(e.to_string()))??
    };

    log::trace!("Serving image '{}' from {:?}", record.id, path);
    let mut response = NamedFile::open_async(&path).await?.into_response(req);

    let headers = response.headers_mut();
    if let Ok(id) = HeaderValue::from_str(&record.id) {
        headers.insert(HeaderName::from_static("x-image-id"), id);
    }
    if let Ok(cache) = HeaderValue::from_str(&format!("public, max-age={}", config.cache_max_age_secs)) {
        headers.insert(header::CACHE_CONTROL, cache);
    }
    Ok(response)
}

async fn random_image(
    req: HttpRequest,
    catalog: web::Data<CatalogHandle>,
    config: web::Data<AppConfig>,
    params: web::Query<RandomParams>,
) -> Result<HttpResponse, AppError> {
    log::debug!("Received request for random image: {:?}", params);
    let record = catalog.query().get_random(params.category.as_deref())?;
    image_response(&req, &config, record, params.raw).await
}

async fn random_metadata(
    catalog: web::Data<CatalogHandle>,
    params: web::Query<CategoryParams>,
) -> Result<HttpResponse, AppError> {
    let record = catalog.query().get_random(params.category.as_deref())?;
    Ok(HttpResponse::Ok().json(record))
}

async fn get_image(
    req: HttpRequest,
    path: web::Path<String>,
    catalog: web::Data<CatalogHandle>,
    config: web::Data<AppConfig>,
    params: web::Query<ImageParams>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    log::debug!("Received request for image with id: {}", id);
    let record = catalog
        .query()
        .get_by_id(&id)
        .ok_or(QueryError::ImageNotFound(id))?;
    image_response(&req, &config, record, params.raw).await
}

async fn get_metadata(
    path: web::Path<String>,
    catalog: web::Data<CatalogHandle>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record = catalog
        .query()
        .get_by_id(&id)
        .ok_or(QueryError::ImageNotFound(id))?;
    Ok(HttpResponse::Ok().json(record))
}

async fn list_all(
    catalog: web::Data<CatalogHandle>,
    params: web::Query<CategoryParams>,
) -> HttpResponse {
    HttpResponse::Ok().json(catalog.query().list_all(params.category.as_deref()))
}

async fn list_categories(catalog: web::Data<CatalogHandle>) -> HttpResponse {
    HttpResponse::Ok().json(catalog.query().list_categories())
}

async fn search(
    catalog: web::Data<CatalogHandle>,
    config: web::Data<AppConfig>,
    params: web::Query<SearchParams>,
) -> HttpResponse {
    log::debug!("Received name search: {:?}", params);
    let limit = config.search_limit(params.limit);
    let found = catalog
        .query()
        .search_by_name(&params.query, params.category.as_deref(), limit);
    HttpResponse::Ok().json(found)
}

async fn search_tags(
    catalog: web::Data<CatalogHandle>,
    config: web::Data<AppConfig>,
    params: web::Query<TagSearchParams>,
) -> HttpResponse {
    log::debug!("Received tag search: {:?}", params);
    let limit = config.search_limit(params.limit);
    let found = catalog.query().search_by_tags_or_author(
        params.tags.as_deref(),
        params.author.as_deref(),
        limit,
    );
    HttpResponse::Ok().json(found)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(info))
        .route("/random", web::get().to(random_image))
        .route("/random/metadata", web::get().to(random_metadata))
        .route("/get/{id}", web::get().to(get_image))
        .route("/get/{id}/metadata", web::get().to(get_metadata))
        .route("/all", web::get().to(list_all))
        .route("/categories", web::get().to(list_categories))
        .route("/search", web::get().to(search))
        .route("/search/tags", web::get().to(search_tags));
}

pub async fn start_web_server(config: Arc<AppConfig>, catalog: CatalogHandle) -> std::io::Result<()> {
    let address = format!("{}:{}", config.bind_address, config.web_port);
    let config_data = web::Data::from(config);
    let catalog_data = web::Data::new(catalog);

    log::info!("Starting web server on: {}", address);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(catalog_data.clone())
            .configure(configure)
    })
    .bind(address)?
    .run()
    .await
}
