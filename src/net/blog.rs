//! Typed blog endpoints: posts, comments, taxonomy, contact, analytics.
//!
//! Thin wrappers over [`ApiClient`]; auth, refresh, and error mapping all
//! happen there. List endpoints tolerate both bare arrays and paginated
//! envelopes.

#[cfg(test)]
#[path = "blog_test.rs"]
mod blog_test;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::api::ApiClient;
use super::error::HttpError;
use super::request::Method;
use super::types::{
    AnalyticsOverview, Category, Comment, ContactMessage, Health, LikeState, ListEnvelope, NewComment, PendingComment,
    Post, PostDetail, Tag, ViewCount,
};

/// Which canned post listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostFeed {
    /// All published posts, newest first.
    #[default]
    Published,
    /// Up to five featured posts.
    Featured,
    /// Up to ten most-viewed posts.
    Trending,
    /// Up to ten newest posts.
    Recent,
}

impl PostFeed {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Published => "posts/published/",
            Self::Featured => "posts/featured/",
            Self::Trending => "posts/trending/",
            Self::Recent => "posts/recent/",
        }
    }
}

#[derive(Clone)]
pub struct BlogApi {
    client: Arc<ApiClient>,
}

impl BlogApi {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<T>, HttpError> {
        let envelope: ListEnvelope<T> = self.client.get_json(path, params).await?;
        Ok(envelope.into_vec())
    }

    // -------------------------------------------------------------------------
    // posts
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn posts(&self, feed: PostFeed) -> Result<Vec<Post>, HttpError> {
        self.list(feed.path(), &[]).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn published_posts(&self) -> Result<Vec<Post>, HttpError> {
        self.posts(PostFeed::Published).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn featured_posts(&self) -> Result<Vec<Post>, HttpError> {
        self.posts(PostFeed::Featured).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn trending_posts(&self) -> Result<Vec<Post>, HttpError> {
        self.posts(PostFeed::Trending).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn recent_posts(&self) -> Result<Vec<Post>, HttpError> {
        self.posts(PostFeed::Recent).await
    }

    /// Fetch one post with its approved comments.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn post(&self, id: i64) -> Result<PostDetail, HttpError> {
        self.client.get_json(&format!("posts/{id}/"), &[]).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn related_posts(&self, id: i64) -> Result<Vec<Post>, HttpError> {
        self.list(&format!("posts/{id}/related/"), &[]).await
    }

    /// Count a view. Open to anonymous readers.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn increment_views(&self, id: i64) -> Result<ViewCount, HttpError> {
        self.client
            .request(Method::Post, &format!("posts/{id}/increment_views/"), None, &[])
            .await?
            .json()
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn like_post(&self, id: i64) -> Result<LikeState, HttpError> {
        self.client
            .request(Method::Post, &format!("posts/{id}/like/"), None, &[])
            .await?
            .json()
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn unlike_post(&self, id: i64) -> Result<LikeState, HttpError> {
        self.client.delete_json(&format!("posts/{id}/like/")).await
    }

    // -------------------------------------------------------------------------
    // taxonomy
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn categories(&self) -> Result<Vec<Category>, HttpError> {
        self.list("categories/", &[]).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn tags(&self) -> Result<Vec<Tag>, HttpError> {
        self.list("tags/", &[]).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn popular_tags(&self) -> Result<Vec<Tag>, HttpError> {
        self.list("tags/popular/", &[]).await
    }

    // -------------------------------------------------------------------------
    // comments & contact
    // -------------------------------------------------------------------------

    /// Approved comments for a post, top-level with nested replies.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn comments(&self, post_id: i64) -> Result<Vec<Comment>, HttpError> {
        let post = post_id.to_string();
        self.list("comments/", &[("post", post.as_str()), ("approved", "true")]).await
    }

    /// Submit a comment. New comments await moderation before they are listed.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`]; validation failures carry field errors.
    pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment, HttpError> {
        self.client.post_json("comments/", comment).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`]; validation failures carry field errors.
    pub async fn submit_contact(&self, message: &ContactMessage) -> Result<(), HttpError> {
        let body = serde_json::to_value(message).map_err(|e| HttpError::Encode(e.to_string()))?;
        self.client
            .request(Method::Post, "contacts/", Some(body), &[])
            .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // admin
    // -------------------------------------------------------------------------

    /// Dashboard counters. Requires an admin or staff session.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn analytics_overview(&self) -> Result<AnalyticsOverview, HttpError> {
        self.client.get_json("analytics/overview/", &[]).await
    }

    /// Comments awaiting moderation, newest first.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] if the request or decoding fails.
    pub async fn pending_comments(&self) -> Result<Vec<PendingComment>, HttpError> {
        self.list("analytics/comments_pending/", &[]).await
    }

    /// # Errors
    ///
    /// Returns an [`HttpError`] if the API is unreachable or unhealthy.
    pub async fn health(&self) -> Result<Health, HttpError> {
        self.client.get_json("health/", &[]).await
    }
}
