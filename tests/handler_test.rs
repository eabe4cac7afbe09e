mod common;

use axum::{
    Json, Router,
    body::Body,
    extract::Query,
    http::{Request, StatusCode},
    routing::get,
};
use common::{ARTICLES, init_tracing};
use datatable_query::{
    Criteria, CustomOrders, DataTablesError, DataTablesResponse, MemoryQuery, NoOverrides,
    ParamTranslator, RawParameters,
};
use serde_json::{Value, json};
use tower::ServiceExt;

fn rows() -> Vec<Value> {
    ARTICLES
        .iter()
        .map(|(title, status, author, views)| {
            json!({"title": title, "status": status, "author": author, "views": views})
        })
        .collect()
}

async fn list_articles(
    Query(raw): Query<RawParameters>,
) -> Result<Json<DataTablesResponse<Value>>, DataTablesError> {
    let orders = CustomOrders::new().register("byline", || vec!["author".to_string()]);
    let translator = ParamTranslator::new(raw);
    let query = translator.apply(MemoryQuery::new(rows()), &NoOverrides, &orders, Criteria::new())?;
    let page = translator.extract_page(&query).await?;
    Ok(Json(DataTablesResponse::from_page(translator.draw()?, page)))
}

fn app() -> Router {
    init_tracing();
    Router::new().route("/articles", get(list_articles))
}

async fn call(uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

const COLUMNS: &str = "columns%5B0%5D%5Bdata%5D=title&columns%5B0%5D%5Bname%5D=title\
    &columns%5B0%5D%5Bsearchable%5D=true&columns%5B0%5D%5Borderable%5D=true\
    &columns%5B0%5D%5Bsearch%5D%5Bvalue%5D=&columns%5B0%5D%5Bsearch%5D%5Bregex%5D=false\
    &columns%5B1%5D%5Bdata%5D=status&columns%5B1%5D%5Bname%5D=status\
    &columns%5B1%5D%5Bsearchable%5D=true&columns%5B1%5D%5Borderable%5D=true\
    &columns%5B1%5D%5Bsearch%5D%5Bvalue%5D=published&columns%5B1%5D%5Bsearch%5D%5Bregex%5D=false\
    &columns%5B2%5D%5Bdata%5D=author&columns%5B2%5D%5Bname%5D=byline\
    &columns%5B2%5D%5Bsearchable%5D=false&columns%5B2%5D%5Borderable%5D=true\
    &columns%5B2%5D%5Bsearch%5D%5Bvalue%5D=&columns%5B2%5D%5Bsearch%5D%5Bregex%5D=false";

#[tokio::test]
async fn test_server_side_round_trip() {
    let uri = format!(
        "/articles?draw=5&start=0&length=2&search%5Bvalue%5D=&search%5Bregex%5D=false\
         &order%5B0%5D%5Bcolumn%5D=0&order%5B0%5D%5Bdir%5D=desc&{COLUMNS}"
    );
    let (status, body) = call(&uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draw"], "5");
    assert_eq!(body["recordsTotal"], 3);
    assert_eq!(body["recordsFiltered"], 3);
    let titles: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Macro tricks", "Lifetimes 101"]);
}

#[tokio::test]
async fn test_custom_order_through_handler() {
    let uri = format!(
        "/articles?draw=1&start=0&length=10&search%5Bvalue%5D=&search%5Bregex%5D=false\
         &order%5B0%5D%5Bcolumn%5D=2&order%5B0%5D%5Bdir%5D=asc&{COLUMNS}"
    );
    let (status, body) = call(&uri).await;

    assert_eq!(status, StatusCode::OK);
    let authors: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["author"].as_str().unwrap())
        .collect();
    assert_eq!(authors, ["ana", "ana", "bo"]);
}

#[tokio::test]
async fn test_missing_length_is_bad_request() {
    let uri = format!("/articles?draw=1&start=0&search%5Bvalue%5D=&search%5Bregex%5D=false&{COLUMNS}");
    let (status, body) = call(&uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameter 'length'");
}

#[tokio::test]
async fn test_order_past_last_column_is_bad_request() {
    let uri = format!(
        "/articles?draw=1&start=0&length=10&search%5Bvalue%5D=&search%5Bregex%5D=false\
         &order%5B0%5D%5Bcolumn%5D=9&order%5B0%5D%5Bdir%5D=asc&{COLUMNS}"
    );
    let (status, body) = call(&uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("column 9"));
}

#[test]
fn test_query_string_matches_extractor() {
    let raw = RawParameters::from_query(&format!("draw=1&{COLUMNS}"));
    assert_eq!(raw.get("columns[2][name]"), Some("byline"));
    assert_eq!(raw.get("columns[1][search][value]"), Some("published"));
}
