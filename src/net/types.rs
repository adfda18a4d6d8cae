//! Wire DTOs for the CMS REST API.
//!
//! DESIGN
//! ======
//! Field names mirror the server's JSON exactly so serde needs no renames
//! beyond the odd aggregate key. Optional server fields use `#[serde(default)]`
//! so older or trimmed responses still decode.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

// =============================================================================
// AUTH
// =============================================================================

/// Role assigned to a CMS account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Contributor,
    #[default]
    Subscriber,
    /// Any role this client does not know about.
    #[serde(other)]
    Unknown,
}

/// The signed-in principal as returned by `GET users/me/`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Server-relative media path; resolve with `ClientConfig::media_url`.
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub posts_count: Option<i64>,
    #[serde(default)]
    pub comments_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_owned()
    }

    /// Admins and staff may open the analytics dashboard.
    #[must_use]
    pub fn can_access_dashboard(&self) -> bool {
        self.role == Role::Admin || self.is_staff
    }
}

/// Access (short-lived) and refresh (long-lived) bearer tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of `POST register/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// `POST login/` response. Both tokens are required for a usable login.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// `POST register/` response. Tokens are present only when the server
/// auto-signs-in the new account.
#[derive(Debug, Deserialize)]
pub(crate) struct RegisterResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// `POST token/refresh/` response; `refresh` is set when the server rotates it.
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Combine optional halves into a pair only when both are present.
pub(crate) fn token_pair(access: Option<String>, refresh: Option<String>) -> Option<TokenPair> {
    match (access, refresh) {
        (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
            Some(TokenPair { access, refresh })
        }
        _ => None,
    }
}

// =============================================================================
// CONTENT
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    #[default]
    Published,
    Scheduled,
    Archived,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub posts_count: i64,
}

/// A post as returned by list endpoints (`posts/published/`, etc.).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub content: String,
    /// Server-relative media path; resolve with `ClientConfig::media_url`.
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A single post (`posts/{id}/`) with SEO fields and approved top-level comments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default)]
    pub seo_keywords: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub user_liked: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post: i64,
    #[serde(default)]
    pub author: Option<i64>,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_image: Option<String>,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub message: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub is_spam: bool,
    #[serde(default)]
    pub likes: i64,
    /// Approved, non-spam replies nested one level per comment.
    #[serde(default)]
    pub replies: Vec<Comment>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST comments/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<i64>,
}

/// Body of `POST contacts/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// `posts/{id}/like/` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}

/// `posts/{id}/increment_views/` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCount {
    pub views: i64,
}

// =============================================================================
// ADMIN
// =============================================================================

/// `analytics/overview/` dashboard counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsOverview {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub scheduled_posts: i64,
    pub total_users: i64,
    pub total_comments: i64,
    pub approved_comments: i64,
    pub pending_comments: i64,
    pub spam_comments: i64,
    pub newsletter_subscribers: i64,
    pub total_views: i64,
}

/// A comment awaiting moderation (`analytics/comments_pending/`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingComment {
    pub id: i64,
    #[serde(rename = "post__title", default)]
    pub post_title: Option<String>,
    #[serde(default)]
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `health/` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user: Option<String>,
}

// =============================================================================
// LISTS
// =============================================================================

/// List endpoints answer with a bare array or a paginated `{results: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Paged { results: items } => items,
        }
    }
}
