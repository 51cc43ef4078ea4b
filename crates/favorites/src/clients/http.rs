use foundation::PointId;
use ingest::BoxFuture;
use reqwest::{RequestBuilder, Response};
use tracing::debug;

use crate::error::RemoteError;
use crate::remote::{FavoriteRecord, FavoriteRow, RemoteSyncClient};
use crate::user::UserId;

const TABLE: &str = "Favorites";

/// `RemoteSyncClient` over a PostgREST-style REST endpoint.
///
/// `base_url` is the REST root, e.g. `https://project.example.co/rest/v1`; the
/// table is addressed as `{base_url}/Favorites`. When an API key is set it is
/// sent both as `apikey` and as a bearer token.
#[derive(Debug, Clone)]
pub struct HttpSyncClient {
    table_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpSyncClient {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            table_url: format!("{}/{TABLE}", base_url.as_ref().trim_end_matches('/')),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("apikey", key).bearer_auth(key),
            None => req,
        }
    }

    fn select_request(&self, user_id: &UserId) -> RequestBuilder {
        let req = self
            .client
            .get(&self.table_url)
            .query(&[("user_id", eq(user_id.as_str())), ("select", "location_id".into())]);
        self.authorize(req)
    }

    fn insert_request(&self, record: &FavoriteRecord) -> RequestBuilder {
        let req = self
            .client
            .post(&self.table_url)
            .header("Prefer", "return=minimal")
            .json(std::slice::from_ref(record));
        self.authorize(req)
    }

    fn delete_request(&self, user_id: &UserId, location_id: &PointId) -> RequestBuilder {
        let req = self.client.delete(&self.table_url).query(&[
            ("user_id", eq(user_id.as_str())),
            ("location_id", eq(location_id.as_str())),
        ]);
        self.authorize(req)
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

async fn check(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

impl RemoteSyncClient for HttpSyncClient {
    fn select_favorites<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<FavoriteRow>, RemoteError>> {
        Box::pin(async move {
            let resp = check(self.select_request(user_id).send().await?).await?;
            let rows: Vec<FavoriteRow> = resp.json().await?;
            debug!(%user_id, rows = rows.len(), "selected favorites");
            Ok(rows)
        })
    }

    fn insert_favorite<'a>(
        &'a self,
        record: &'a FavoriteRecord,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async move {
            check(self.insert_request(record).send().await?).await?;
            debug!(user_id = %record.user_id, point_id = %record.location_id, "inserted favorite");
            Ok(())
        })
    }

    fn delete_favorite<'a>(
        &'a self,
        user_id: &'a UserId,
        location_id: &'a PointId,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async move {
            check(self.delete_request(user_id, location_id).send().await?).await?;
            debug!(%user_id, point_id = %location_id, "deleted favorite");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpSyncClient, eq};
    use crate::remote::FavoriteRecord;
    use crate::user::UserId;
    use foundation::PointId;
    use pretty_assertions::assert_eq;
    use reqwest::{Method, Request};
    use serde_json::json;

    fn client() -> HttpSyncClient {
        HttpSyncClient::new("https://db.example.org/rest/v1").with_api_key("anon-key")
    }

    fn header<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
        req.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn table_url_ignores_trailing_slash() {
        let a = HttpSyncClient::new("https://db.example.org/rest/v1/");
        let b = HttpSyncClient::new("https://db.example.org/rest/v1");
        assert_eq!(a.table_url(), "https://db.example.org/rest/v1/Favorites");
        assert_eq!(a.table_url(), b.table_url());
    }

    #[test]
    fn filters_use_postgrest_equality() {
        assert_eq!(eq("P123"), "eq.P123");
    }

    #[test]
    fn select_asks_for_location_ids_of_one_user() {
        let req = client().select_request(&UserId::new("u1")).build().unwrap();
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.url().path(), "/rest/v1/Favorites");
        assert_eq!(req.url().query(), Some("user_id=eq.u1&select=location_id"));
        assert_eq!(header(&req, "apikey"), Some("anon-key"));
        assert_eq!(header(&req, "authorization"), Some("Bearer anon-key"));
    }

    #[test]
    fn insert_posts_one_row_with_table_columns() {
        let record = FavoriteRecord {
            user_id: UserId::new("u1"),
            username: "ana".to_string(),
            location_id: PointId::new("P123"),
            location_address: "SW 5th Ave".to_string(),
            x_coord: -122.6765,
            y_coord: 45.5231,
        };
        let req = client().insert_request(&record).build().unwrap();
        assert_eq!(req.method(), &Method::POST);
        assert_eq!(req.url().query(), None);
        assert_eq!(header(&req, "content-type"), Some("application/json"));
        assert_eq!(header(&req, "prefer"), Some("return=minimal"));
        assert_eq!(header(&req, "authorization"), Some("Bearer anon-key"));

        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            body,
            json!([{
                "user_id": "u1",
                "username": "ana",
                "location_id": "P123",
                "location_address": "SW 5th Ave",
                "x_coord": -122.6765,
                "y_coord": 45.5231,
            }])
        );
    }

    #[test]
    fn delete_filters_on_user_and_location() {
        let req = client()
            .delete_request(&UserId::new("u1"), &PointId::new("P123"))
            .build()
            .unwrap();
        assert_eq!(req.method(), &Method::DELETE);
        assert_eq!(req.url().query(), Some("user_id=eq.u1&location_id=eq.P123"));
        assert_eq!(header(&req, "apikey"), Some("anon-key"));
    }

    #[test]
    fn no_key_sends_no_credentials() {
        let req = HttpSyncClient::new("https://db.example.org/rest/v1")
            .select_request(&UserId::new("u1"))
            .build()
            .unwrap();
        assert!(req.headers().get("apikey").is_none());
        assert!(req.headers().get("authorization").is_none());
    }
}
