//! Shared helpers for driving the router in-process.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use reminote::i18n::Translations;
use reminote::web::{AppState, app};
use reminote::{CloudConfig, Config, Database};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: Arc<Database>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(None))
    }

    /// App whose cloud endpoints all point at `base_url`.
    pub fn with_cloud(base_url: &str) -> Self {
        let cloud = CloudConfig {
            redirect_uri: "http://localhost/cloud/callback".into(),
            authorize_url: format!("{base_url}/oauth2/authorize"),
            api_url: base_url.to_string(),
            content_url: base_url.to_string(),
            ..CloudConfig::new("app-key", "app-secret")
        };
        Self::with_config(test_config(Some(cloud)))
    }

    pub fn with_config(config: Config) -> Self {
        let db = Arc::new(Database::in_memory().expect("in-memory database"));
        let translations =
            Translations::embedded(&config.default_lang).expect("embedded translations");
        let state = AppState::new(config, db.clone(), translations).expect("app state");
        Self {
            router: app(state.clone()),
            state,
            db,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(request("GET", uri, cookie).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(
            request("POST", uri, cookie)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        json: serde_json::Value,
        cookie: Option<&str>,
    ) -> Response<Body> {
        self.send(
            request("POST", uri, cookie)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Registers `username` and logs in, returning the `Cookie` header value.
    pub async fn login_as(&self, username: &str) -> String {
        let form = format!("username={username}&password=secret");
        let response = self.post_form("/register", &form, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = self.post_form("/login", &form, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response).expect("login sets a session cookie")
    }
}

pub fn test_config(cloud: Option<CloudConfig>) -> Config {
    Config {
        notify_interval: Duration::from_millis(50),
        cloud,
        ..Config::default()
    }
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match cookie {
        Some(cookie) => builder.header(COOKIE, cookie),
        None => builder,
    }
}

/// `name=value` of the session cookie set by the response, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("reminote_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn set_cookie_header(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response.headers().get(LOCATION).and_then(|v| v.to_str().ok())
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}
