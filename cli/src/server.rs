use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use mise_core::MiseService;
use mise_core::menu::RecommendationMeta;
use mise_core::models::{
    Cookbook, GroceryList, GroceryListItem, ItemStatus, MealPlan, NewCookbook, NewManualItem,
    NewMealSlot, NewRecipe, NutritionSearchResult, Page, Recipe, RecipeNutrition,
    RecipeRecommendation, User,
};

const BODY_LIMIT: usize = 2 * 1024 * 1024; // 2 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<MiseService>>,
}

impl AppState {
    fn svc(&self) -> MutexGuard<'_, MiseService> {
        self.svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// The user resolved from the bearer token.
#[derive(Clone)]
struct CurrentUser(User);

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateGroceryListRequest {
    start_date: String,
    end_date: String,
}

#[derive(Deserialize)]
struct UpdateItemRequest {
    status: String,
}

#[derive(Deserialize)]
struct PageQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
struct RecipeListQuery {
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize)]
struct RangeQuery {
    start_date: String,
    end_date: String,
}

#[derive(Deserialize)]
struct RecommendRequest {
    #[serde(default)]
    ingredients: Vec<String>,
}

#[derive(Serialize)]
struct RecommendResponse {
    data: Vec<RecipeRecommendation>,
    meta: RecommendationMeta,
}

#[derive(Deserialize)]
struct NutritionQuery {
    query: Option<String>,
}

#[derive(Serialize)]
struct NutritionSearchResponse {
    data: Vec<NutritionSearchResult>,
    meta: NutritionSearchMeta,
}

#[derive(Serialize)]
struct NutritionSearchMeta {
    total: usize,
}

#[derive(Deserialize)]
struct SetMealPlanRequest {
    #[serde(default)]
    meals: Vec<NewMealSlot>,
}

#[derive(Serialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Internal(mise_core::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::Internal(err) => {
                error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<mise_core::Error> for ApiError {
    fn from(err: mise_core::Error) -> Self {
        match err {
            mise_core::Error::Validation(msg) => Self::BadRequest(msg),
            mise_core::Error::NotFound(msg) => Self::NotFound(msg),
            mise_core::Error::Forbidden(msg) => Self::Forbidden(msg),
            other => Self::Internal(other),
        }
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let user = match token {
        Some(token) => match state.svc().user_by_token(&token) {
            Ok(user) => user,
            Err(e) => return ApiError::from(e).into_response(),
        },
        None => None,
    };

    let Some(user) = user else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid or missing API token".to_string(),
            }),
        )
            .into_response();
    };

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Grocery lists ---

async fn create_grocery_list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<CreateGroceryListRequest>,
) -> Result<(StatusCode, Json<GroceryList>), ApiError> {
    let list = state
        .svc()
        .create_grocery_list(user.id, &req.start_date, &req.end_date)?;
    Ok((StatusCode::CREATED, Json(list)))
}

async fn list_grocery_lists(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<GroceryList>>, ApiError> {
    let page = state.svc().list_grocery_lists(user.id, q.limit, q.offset)?;
    Ok(Json(page))
}

async fn get_grocery_list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<GroceryList>, ApiError> {
    Ok(Json(state.svc().get_grocery_list(user.id, id)?))
}

async fn delete_grocery_list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_grocery_list(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export_grocery_list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let csv = state.svc().export_grocery_list_csv(user.id, id)?;
    let disposition = format!("attachment; filename=\"grocery-list-{id}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

async fn add_grocery_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<NewManualItem>,
) -> Result<(StatusCode, Json<GroceryListItem>), ApiError> {
    let item = state.svc().add_manual_item(user.id, id, &req)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_grocery_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<GroceryListItem>, ApiError> {
    let status: ItemStatus = req.status.parse()?;
    let item = state
        .svc()
        .update_item_status(user.id, id, item_id, status)?;
    Ok(Json(item))
}

async fn delete_grocery_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_item(user.id, id, item_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Recommendations ---

async fn recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let (data, meta) = state.svc().recommend(&req.ingredients)?;
    Ok(Json(RecommendResponse { data, meta }))
}

// --- Recipes ---

async fn create_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state.svc().create_recipe(user.id, &req)?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn list_recipes(
    State(state): State<AppState>,
    Query(q): Query<RecipeListQuery>,
) -> Result<Json<Page<Recipe>>, ApiError> {
    Ok(Json(state.svc().list_recipes(q.search, q.limit, q.offset)?))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Recipe>, ApiError> {
    Ok(Json(state.svc().get_recipe(id)?))
}

async fn update_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<NewRecipe>,
) -> Result<Json<Recipe>, ApiError> {
    Ok(Json(state.svc().update_recipe(user.id, id, &req)?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_recipe(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_recipe_nutrition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeNutrition>, ApiError> {
    Ok(Json(state.svc().recipe_nutrition(id)?))
}

// --- Nutrition ---

async fn search_nutrition(
    State(state): State<AppState>,
    Query(q): Query<NutritionQuery>,
) -> Result<Json<NutritionSearchResponse>, ApiError> {
    let query = q.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query parameter is required".to_string()));
    }
    let data = state.svc().search_nutrition(&query)?;
    let meta = NutritionSearchMeta { total: data.len() };
    Ok(Json(NutritionSearchResponse { data, meta }))
}

// --- Meal plans ---

async fn get_meal_plans(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<DataResponse<Vec<MealPlan>>>, ApiError> {
    let plans = state.svc().get_meal_plans(&q.start_date, &q.end_date)?;
    Ok(Json(DataResponse { data: plans }))
}

async fn get_meal_plan(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<MealPlan>, ApiError> {
    Ok(Json(state.svc().get_meal_plan(&date)?))
}

async fn set_meal_plan(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<SetMealPlanRequest>,
) -> Result<Json<MealPlan>, ApiError> {
    Ok(Json(state.svc().set_meal_plan(&date, &req.meals)?))
}

// --- Cookbooks ---

async fn create_cookbook(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<NewCookbook>,
) -> Result<(StatusCode, Json<Cookbook>), ApiError> {
    let cookbook = state.svc().create_cookbook(user.id, &req)?;
    Ok((StatusCode::CREATED, Json(cookbook)))
}

async fn list_cookbooks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<Cookbook>>, ApiError> {
    Ok(Json(state.svc().list_cookbooks(user.id, q.limit, q.offset)?))
}

async fn get_cookbook(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<Cookbook>, ApiError> {
    Ok(Json(state.svc().get_cookbook(user.id, id)?))
}

async fn update_cookbook(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<NewCookbook>,
) -> Result<Json<Cookbook>, ApiError> {
    Ok(Json(state.svc().update_cookbook(user.id, id, &req)?))
}

async fn delete_cookbook(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.svc().delete_cookbook(user.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_cookbook_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, recipe_id)): Path<(i64, i64)>,
) -> Result<Json<Cookbook>, ApiError> {
    Ok(Json(
        state.svc().add_recipe_to_cookbook(user.id, id, recipe_id)?,
    ))
}

async fn remove_cookbook_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, recipe_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state
        .svc()
        .remove_recipe_from_cookbook(user.id, id, recipe_id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/grocery-lists",
            post(create_grocery_list).get(list_grocery_lists),
        )
        .route(
            "/api/grocery-lists/{id}",
            get(get_grocery_list).delete(delete_grocery_list),
        )
        .route("/api/grocery-lists/{id}/export", get(export_grocery_list))
        .route("/api/grocery-lists/{id}/items", post(add_grocery_item))
        .route(
            "/api/grocery-lists/{id}/items/{item_id}",
            put(update_grocery_item).delete(delete_grocery_item),
        )
        .route("/api/menu/recommendations", post(recommend))
        .route("/api/recipes", post(create_recipe).get(list_recipes))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/recipes/{id}/nutrition", get(get_recipe_nutrition))
        .route("/api/nutrition/search", get(search_nutrition))
        .route("/api/meal-plans", get(get_meal_plans))
        .route(
            "/api/meal-plans/{date}",
            get(get_meal_plan).put(set_meal_plan),
        )
        .route("/api/cookbooks", post(create_cookbook).get(list_cookbooks))
        .route(
            "/api/cookbooks/{id}",
            get(get_cookbook).put(update_cookbook).delete(delete_cookbook),
        )
        .route(
            "/api/cookbooks/{id}/recipes/{recipe_id}",
            post(add_cookbook_recipe).delete(remove_cookbook_recipe),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(svc: MiseService, port: u16, bind: &str) -> anyhow::Result<()> {
    if svc.list_users()?.is_empty() {
        eprintln!("Warning: no users exist yet. Create one with `mise user add <name>`.");
    }

    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!("listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
