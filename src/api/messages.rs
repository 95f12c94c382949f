use super::ApiError;
use crate::db::{Page, PageRequest, Sort};
use crate::model::LoggedMessage;
use crate::services::{ChannelStats, LoggerService};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_SORT: &str = "timestamp,desc";

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default = "default_sort")]
    pub sort: String,
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_sort() -> String {
    DEFAULT_SORT.to_string()
}

impl PageParams {
    fn to_request(&self) -> Result<PageRequest, ApiError> {
        if self.size == 0 {
            return Err(ApiError::BadRequest("size must be at least 1".to_string()));
        }
        let sort = Sort::parse(&self.sort).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(PageRequest::of(self.page, self.size, sort))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: NaiveDateTime,
}

type PageResult = Result<Json<Page<LoggedMessage>>, ApiError>;

/// Query string extraction whose failures use the JSON error body.
type QueryParams<T> = Result<Query<T>, QueryRejection>;

pub async fn by_channel(
    State(logger): State<LoggerService>,
    Path(channel_id): Path<String>,
    params: QueryParams<PageParams>,
) -> PageResult {
    let Query(params) = params?;
    let page = params.to_request()?;
    Ok(Json(logger.messages_by_channel(&channel_id, page).await?))
}

pub async fn by_author(
    State(logger): State<LoggerService>,
    Path(author_id): Path<String>,
    params: QueryParams<PageParams>,
) -> PageResult {
    let Query(params) = params?;
    let page = params.to_request()?;
    Ok(Json(logger.messages_by_author(&author_id, page).await?))
}

pub async fn search(
    State(logger): State<LoggerService>,
    search: QueryParams<SearchParams>,
    params: QueryParams<PageParams>,
) -> PageResult {
    let (Query(search), Query(params)) = (search?, params?);
    let query = search
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("query parameter is required".to_string()))?;
    let page = params.to_request()?;
    Ok(Json(logger.search_messages(&query, page).await?))
}

pub async fn recent(
    State(logger): State<LoggerService>,
    recent: QueryParams<RecentParams>,
    params: QueryParams<PageParams>,
) -> PageResult {
    let (Query(recent), Query(params)) = (recent?, params?);
    let raw = recent
        .since
        .ok_or_else(|| ApiError::BadRequest("since parameter is required".to_string()))?;
    let since = parse_since(&raw).ok_or_else(|| {
        ApiError::BadRequest(format!("since must be an ISO-8601 date-time, got '{}'", raw))
    })?;
    let page = params.to_request()?;
    Ok(Json(logger.recent_messages(since, page).await?))
}

pub async fn channel_stats(
    State(logger): State<LoggerService>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelStats>, ApiError> {
    Ok(Json(logger.channel_stats(&channel_id).await?))
}

pub async fn by_id(
    State(logger): State<LoggerService>,
    Path(message_id): Path<String>,
) -> Result<Json<LoggedMessage>, ApiError> {
    logger
        .message_by_id(&message_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("message {} not found", message_id)))
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "UP",
        timestamp: Local::now().naive_local(),
    })
}

/// Accepts a local date-time (`2024-05-01T12:00:00`) or an RFC 3339
/// timestamp with offset, which is converted to local time.
fn parse_since(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Local).naive_local());
    }
    raw.parse::<NaiveDateTime>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::db::tests::test_db;
    use crate::events::tests::incoming;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn seeded_logger() -> LoggerService {
        let logger = LoggerService::new(Arc::new(test_db()));
        let base = incoming("x", "").created_at;
        let seed = [
            ("1", "Hello World", "u1", 0),
            ("2", "banana bread", "u1", 1),
            ("3", "apple pie", "u2", 2),
        ];
        for (id, content, author, hours) in seed {
            let mut msg = incoming(id, content);
            msg.author_id = author.to_string();
            msg.created_at = base + chrono::Duration::hours(hours);
            logger.log_message(&msg).await.unwrap();
        }
        logger
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn contents(body: &Value) -> Vec<&str> {
        body["content"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_channel_listing_defaults_to_newest_first() {
        let app = router(seeded_logger().await);
        let (status, body) = get_json(app, "/api/messages/channel/c1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(contents(&body), vec!["apple pie", "banana bread", "Hello World"]);
        assert_eq!(body["totalElements"], 3);
        assert_eq!(body["size"], 20);
        assert_eq!(body["page"], 0);
    }

    #[tokio::test]
    async fn test_sort_and_paging_params() {
        let logger = seeded_logger().await;

        let (_, body) = get_json(
            router(logger.clone()),
            "/api/messages/channel/c1?sort=content,asc",
        )
        .await;
        assert_eq!(contents(&body), vec!["Hello World", "apple pie", "banana bread"]);

        let (_, body) = get_json(
            router(logger.clone()),
            "/api/messages/channel/c1?sort=content,foo&page=1&size=2",
        )
        .await;
        assert_eq!(contents(&body), vec!["banana bread"]);
        assert_eq!(body["totalPages"], 2);

        let (status, body) = get_json(
            router(logger.clone()),
            "/api/messages/channel/c1?sort=secret,desc",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad Request");

        let (status, _) = get_json(router(logger), "/api/messages/channel/c1?size=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_paging_uses_json_error_body() {
        let logger = seeded_logger().await;
        for uri in [
            "/api/messages/channel/c1?page=abc",
            "/api/messages/author/u1?size=-1",
            "/api/messages/search?query=hello&page=-2",
            "/api/messages/recent?since=2024-05-01T12:00:00&size=lots",
        ] {
            let (status, body) = get_json(router(logger.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"], "Bad Request", "{}", uri);
            assert!(body["message"].is_string(), "{}", uri);
            assert!(body["timestamp"].is_string(), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_page_far_past_the_end_is_empty() {
        let app = router(seeded_logger().await);
        let (status, body) = get_json(
            app,
            "/api/messages/channel/c1?page=4294967295&size=4294967295",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["content"].as_array().unwrap().is_empty());
        assert_eq!(body["totalElements"], 3);
    }

    #[tokio::test]
    async fn test_author_listing() {
        let app = router(seeded_logger().await);
        let (status, body) = get_json(app, "/api/messages/author/u2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(contents(&body), vec!["apple pie"]);
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let logger = seeded_logger().await;
        let (status, body) =
            get_json(router(logger.clone()), "/api/messages/search?query=hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(contents(&body), vec!["Hello World"]);

        let (status, body) = get_json(router(logger), "/api/messages/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "query parameter is required");
    }

    #[tokio::test]
    async fn test_recent_endpoint() {
        let logger = seeded_logger().await;
        let since = crate::services::logger::to_local(incoming("x", "").created_at)
            + chrono::Duration::hours(1);
        let uri = format!(
            "/api/messages/recent?since={}",
            since.format("%Y-%m-%dT%H:%M:%S")
        );

        let (status, body) = get_json(router(logger.clone()), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalElements"], 2);

        let (status, _) = get_json(router(logger.clone()), "/api/messages/recent").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            get_json(router(logger), "/api/messages/recent?since=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let logger = seeded_logger().await;
        let (status, body) =
            get_json(router(logger.clone()), "/api/messages/stats/channel/c1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["channelId"], "c1");
        assert_eq!(body["totalMessages"], 3);

        let (_, body) = get_json(router(logger), "/api/messages/stats/channel/empty").await;
        assert_eq!(body["totalMessages"], 0);
    }

    #[tokio::test]
    async fn test_lookup_by_message_id() {
        let logger = seeded_logger().await;
        let (status, body) = get_json(router(logger.clone()), "/api/messages/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messageId"], "2");
        assert_eq!(body["content"], "banana bread");

        let (status, body) = get_json(router(logger), "/api/messages/404404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_health_is_not_a_message_lookup() {
        let app = router(LoggerService::new(Arc::new(test_db())));
        let (status, body) = get_json(app, "/api/messages/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn test_parse_since() {
        let naive = parse_since("2024-05-01T12:00:00").unwrap();
        assert_eq!(naive.format("%Y-%m-%d %H:%M").to_string(), "2024-05-01 12:00");
        assert!(parse_since("2024-05-01T12:00:00.250").is_some());
        assert!(parse_since("2024-05-01T12:00:00Z").is_some());
        assert!(parse_since("2024-05-01").is_none());
        assert!(parse_since("not a date").is_none());
    }
}
