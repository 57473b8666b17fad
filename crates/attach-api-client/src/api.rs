//! Attachment handler calls on the form server.

use async_trait::async_trait;
use attach_core::models::{DescriptionMap, PurgeResponse};
use attach_core::{AttachError, AttachmentServer};

use crate::ApiClient;

/// Handler paths, relative to the client's base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    /// `{step}` is replaced with the step name.
    pub render: String,
    pub purge: String,
    pub save_descriptions: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            render: "/handler/render_{step}".to_string(),
            purge: "/handler/remove_all_uploaded_files".to_string(),
            save_descriptions: "/handler/save_files_descriptions".to_string(),
        }
    }
}

impl Endpoints {
    pub fn render_path(&self, step: &str) -> String {
        self.render.replace("{step}", step)
    }
}

#[async_trait]
impl AttachmentServer for ApiClient {
    async fn render(&self, step: &str) -> Result<String, AttachError> {
        let path = self.endpoints().render_path(step);
        self.get_text(&path, &[])
            .await
            .map_err(|e| AttachError::RenderLoadFailure(format!("{:#}", e)))
    }

    async fn purge_previous_uploads(&self, usage_id: &str) -> Result<PurgeResponse, AttachError> {
        let response: PurgeResponse = self
            .post_empty(&self.endpoints().purge, &[("usage_id", usage_id)])
            .await
            .map_err(|e| AttachError::Remote(format!("{:#}", e)))?;

        tracing::debug!(
            usage_id = %usage_id,
            success = response.success,
            msg = ?response.msg,
            "Purge response"
        );
        Ok(response)
    }

    async fn save_descriptions(
        &self,
        usage_id: &str,
        descriptions: &DescriptionMap,
    ) -> Result<(), AttachError> {
        self.post_json(
            &self.endpoints().save_descriptions,
            &[("usage_id", usage_id)],
            descriptions,
        )
        .await
        .map_err(|e| AttachError::Remote(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Auth;
    use attach_core::models::DescriptionKey;
    use mockito::Matcher;
    use std::time::Duration;

    fn client(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(
            server.url(),
            Auth::Bearer("token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn render_fetches_step_markup() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/handler/render_submission")
            .match_header("authorization", "Bearer token")
            .with_body("<div class=\"step--submission\"></div>")
            .create_async()
            .await;

        let markup = client(&server).render("submission").await.unwrap();

        assert_eq!(markup, "<div class=\"step--submission\"></div>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn render_error_is_a_load_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/handler/render_submission")
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server).render("submission").await.unwrap_err();
        assert!(matches!(err, AttachError::RenderLoadFailure(_)));
    }

    #[tokio::test]
    async fn purge_posts_without_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/handler/remove_all_uploaded_files")
            .match_query(Matcher::UrlEncoded("usage_id".into(), "block-1".into()))
            .match_body("")
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "msg": "locked"}"#)
            .create_async()
            .await;

        let response = client(&server)
            .purge_previous_uploads("block-1")
            .await
            .unwrap();

        assert_eq!(response, PurgeResponse::failed("locked"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn purge_http_error_is_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/handler/remove_all_uploaded_files")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = client(&server)
            .purge_previous_uploads("block-1")
            .await
            .unwrap_err();

        match err {
            AttachError::Remote(message) => assert!(message.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn descriptions_are_posted_as_json_object() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/handler/save_files_descriptions")
            .match_query(Matcher::UrlEncoded("usage_id".into(), "block-1".into()))
            .match_body(Matcher::Json(serde_json::json!({"1": "front", "2": "back"})))
            .with_body("{}")
            .create_async()
            .await;

        let mut descriptions = DescriptionMap::new();
        descriptions.insert(DescriptionKey::Index(1), "front").unwrap();
        descriptions.insert(DescriptionKey::Index(2), "back").unwrap();

        client(&server)
            .save_descriptions("block-1", &descriptions)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn render_path_substitutes_step() {
        let endpoints = Endpoints {
            render: "/xblock/{step}/render".to_string(),
            ..Endpoints::default()
        };
        assert_eq!(endpoints.render_path("submission"), "/xblock/submission/render");
    }
}
