use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
}

#[derive(Deserialize)]
pub struct Signup {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub connection: Option<String>,
}

#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: Uuid,
    pub email: String,
}

/// What `/echo` saw: method, headers (lowercased names) and the JSON body,
/// `null` when the body was empty or not JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<String, (User, String)>,
    tokens: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Store>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/dbconnections/signup", post(signup))
        .route("/oauth/ro", post(login))
        .route("/userinfo", get(userinfo))
        .route("/echo", any(echo))
        .route("/blob/{size}", get(blob))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn reject(status: StatusCode, code: &str, description: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"code": code, "description": description})))
}

async fn signup(State(db): State<Db>, Json(input): Json<Signup>) -> ApiResult<User> {
    if input.password.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "invalid_password", "password is required"));
    }
    let mut store = db.write().await;
    if store.users.contains_key(&input.email) {
        tracing::info!(email = %input.email, "signup rejected, user exists");
        return Err(reject(StatusCode::BAD_REQUEST, "user_exists", "the user already exists"));
    }
    let user = User {
        id: Uuid::new_v4(),
        email: input.email.clone(),
    };
    tracing::info!(email = %user.email, connection = ?input.connection, "user signed up");
    store
        .users
        .insert(input.email, (user.clone(), input.password));
    Ok(Json(user))
}

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> ApiResult<Credentials> {
    let mut store = db.write().await;
    let valid = matches!(
        store.users.get(&input.username),
        Some((_, password)) if *password == input.password
    );
    if !valid {
        tracing::info!(username = %input.username, "login rejected");
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            "invalid_user_password",
            "wrong email or password",
        ));
    }
    let token = Uuid::new_v4().simple().to_string();
    store.tokens.insert(token.clone(), input.username);
    Ok(Json(Credentials {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

async fn userinfo(State(db): State<Db>, headers: HeaderMap) -> ApiResult<UserInfo> {
    let unauthorized = || reject(StatusCode::UNAUTHORIZED, "unauthorized", "missing or invalid token");
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;
    let store = db.read().await;
    let email = store.tokens.get(token).ok_or_else(unauthorized)?;
    let (user, _) = store.users.get(email).ok_or_else(unauthorized)?;
    Ok(Json(UserInfo {
        sub: user.id,
        email: user.email.clone(),
    }))
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    tracing::debug!(%method, "echo");
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
    Json(Echo {
        method: method.to_string(),
        headers,
        body,
    })
}

/// `size` bytes of filler, for exercising large response bodies.
async fn blob(Path(size): Path<usize>) -> Vec<u8> {
    tracing::debug!(size, "blob");
    vec![b'x'; size]
}
