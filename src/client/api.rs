use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{feed::FeedBackend, ClientConfig, ClientError, Session};
use crate::app::API_KEY_HEADER;
use crate::auth::dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::likes::dto::{LikeChange, LikeStatus};
use crate::posts::dto::{CreatePostRequest, PostView};
use crate::profiles::repo_types::Profile;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        let mut rb = self
            .http
            .request(method, format!("{}/api/v1{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            rb = rb.header(API_KEY_HEADER, key);
        }
        if let Some(s) = session {
            rb = rb.bearer_auth(&s.access_token);
        }
        rb
    }

    async fn send<T: DeserializeOwned>(rb: RequestBuilder) -> Result<T, ClientError> {
        let res = rb.send().await?;
        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            debug!(%status, %message, "api error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(res.json::<T>().await?)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn sign_up(&self, req: &RegisterRequest) -> Result<Session, ClientError> {
        let res: AuthResponse =
            Self::send(self.request(Method::POST, "/auth/register", None).json(req)).await?;
        Ok(res.into())
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let res: AuthResponse =
            Self::send(self.request(Method::POST, "/auth/login", None).json(&body)).await?;
        Ok(res.into())
    }

    pub async fn refresh(&self, session: &Session) -> Result<Session, ClientError> {
        let body = RefreshRequest {
            refresh_token: session.refresh_token.clone(),
        };
        let res: AuthResponse =
            Self::send(self.request(Method::POST, "/auth/refresh", None).json(&body)).await?;
        Ok(res.into())
    }

    pub async fn me(&self, session: &Session) -> Result<Profile, ClientError> {
        Self::send(self.request(Method::GET, "/me", Some(session))).await
    }

    pub async fn network(
        &self,
        session: &Session,
        limit: i64,
    ) -> Result<Vec<Profile>, ClientError> {
        Self::send(
            self.request(Method::GET, "/profiles", Some(session))
                .query(&[("limit", limit)]),
        )
        .await
    }
}

#[async_trait]
impl FeedBackend for ApiClient {
    async fn list_posts(
        &self,
        session: &Session,
        author: Option<Uuid>,
    ) -> Result<Vec<PostView>, ClientError> {
        let mut rb = self.request(Method::GET, "/posts", Some(session));
        if let Some(a) = author {
            rb = rb.query(&[("author", a)]);
        }
        Self::send(rb).await
    }

    async fn create_post(&self, session: &Session, content: &str) -> Result<PostView, ClientError> {
        let body = CreatePostRequest {
            content: content.to_string(),
        };
        Self::send(self.request(Method::POST, "/posts", Some(session)).json(&body)).await
    }

    async fn toggle_like(
        &self,
        session: &Session,
        post_id: Uuid,
    ) -> Result<LikeChange, ClientError> {
        let path = format!("/posts/{}/like/toggle", post_id);
        Self::send(self.request(Method::POST, &path, Some(session))).await
    }

    async fn like_status(
        &self,
        session: &Session,
        post_id: Uuid,
    ) -> Result<LikeStatus, ClientError> {
        let path = format!("/posts/{}/likes", post_id);
        Self::send(self.request(Method::GET, &path, Some(session))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Feed;
    use crate::likes::dto::LikeTally;
    use crate::state::AppState;

    async fn spawn_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::app::build_app(AppState::fake());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn sign_up_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "long-enough".into(),
            name: "Grace Hopper".into(),
            bio: Some("Compilers".into()),
        }
    }

    #[tokio::test]
    async fn feed_against_live_server() {
        let base_url = spawn_server().await;
        let api = ApiClient::new(&ClientConfig {
            base_url: format!("{}/", base_url),
            api_key: None,
        });

        let session = api.sign_up(&sign_up_request("grace@example.com")).await.unwrap();
        assert_eq!(session.profile.bio.as_deref(), Some("Compilers"));
        assert_eq!(api.me(&session).await.unwrap().id, session.user_id());

        let mut feed = Feed::new(api.clone(), None);
        feed.refresh(&session).await.unwrap();
        assert!(feed.posts().is_empty());

        let post = feed.create_post(&session, "First post").await.unwrap();
        assert_eq!(feed.posts()[0].id, post.id);

        feed.toggle_like(&session, post.id).await.unwrap();
        assert_eq!(feed.posts()[0].likes, LikeTally::Known { count: 1, liked: true });
        let tally = feed.like_tally(&session, post.id).await;
        assert_eq!(tally.count(), 1);

        feed.toggle_like(&session, post.id).await.unwrap();
        assert!(!feed.posts()[0].likes.liked());
    }

    #[tokio::test]
    async fn server_messages_surface_as_api_errors() {
        let base_url = spawn_server().await;
        let api = ApiClient::new(&ClientConfig {
            base_url,
            api_key: None,
        });

        api.sign_up(&sign_up_request("grace@example.com")).await.unwrap();
        let err = api.sign_up(&sign_up_request("grace@example.com")).await.unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Email already registered");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = api.sign_in("grace@example.com", "wrong-password").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 401, .. }));

        let session = api.sign_in("grace@example.com", "long-enough").await.unwrap();
        let renewed = api.refresh(&session).await.unwrap();
        assert_eq!(renewed.user, session.user);
        assert!(api.network(&renewed, 10).await.unwrap().is_empty());
    }
}
