//! Interaction service implementation.

use std::cmp::Ordering;
use std::sync::Arc;

use inhamissa_shared::{OwnerId, PostId};
use tracing::{debug, info};

use super::error::InteractionError;
use super::types::{
    Author, Comment, LikeState, LikeUpdate, MAX_COMMENT_LEN, NewComment, Post,
};

/// Document database operations the interaction service needs.
///
/// Implemented by the application's database adapter.
pub trait DocumentStore: Send + Sync {
    /// Fetch a post by ID.
    fn get_post(
        &self,
        id: &PostId,
    ) -> impl std::future::Future<Output = Result<Option<Post>, InteractionError>> + Send;

    /// Apply a like change: add `delta` to the counter (floored at 0) and replace `liked_by`.
    fn update_likes(
        &self,
        id: &PostId,
        update: LikeUpdate,
    ) -> impl std::future::Future<Output = Result<(), InteractionError>> + Send;

    /// Store a comment, assigning its ID and server timestamp.
    fn add_comment(
        &self,
        comment: NewComment,
    ) -> impl std::future::Future<Output = Result<Comment, InteractionError>> + Send;

    /// Add `delta` to a post's comment counter.
    fn increment_comments(
        &self,
        id: &PostId,
        delta: i64,
    ) -> impl std::future::Future<Output = Result<(), InteractionError>> + Send;

    /// All comments whose `post_id` equals `id`, in store order.
    fn comments_for_post(
        &self,
        id: &PostId,
    ) -> impl std::future::Future<Output = Result<Vec<Comment>, InteractionError>> + Send;
}

/// Likes and comments on posts.
pub struct InteractionService<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> InteractionService<S> {
    /// Create a new interaction service.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Like the post if `user` has not liked it yet, otherwise remove the like.
    ///
    /// # Errors
    ///
    /// Returns `PostNotFound` if the post does not exist, or the store error.
    pub async fn toggle_like(
        &self,
        post_id: &PostId,
        user: &OwnerId,
    ) -> Result<LikeState, InteractionError> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| InteractionError::post_not_found(post_id))?;

        let (state, update) = if post.is_liked_by(user) {
            let liked_by = post.liked_by.into_iter().filter(|id| id != user).collect();
            (
                LikeState {
                    liked: false,
                    likes: post.likes.saturating_sub(1),
                },
                LikeUpdate { delta: -1, liked_by },
            )
        } else {
            let mut liked_by = post.liked_by;
            liked_by.push(user.clone());
            (
                LikeState {
                    liked: true,
                    likes: post.likes.saturating_add(1),
                },
                LikeUpdate { delta: 1, liked_by },
            )
        };

        self.store.update_likes(post_id, update).await?;
        debug!(post_id = %post_id, user = %user, liked = state.liked, likes = state.likes, "Like toggled");
        Ok(state)
    }

    /// Whether `user` has liked `post`.
    #[must_use]
    pub fn is_liked_by(post: &Post, user: &OwnerId) -> bool {
        post.is_liked_by(user)
    }

    /// Add a comment to a post and bump its comment counter.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The trimmed content is empty or longer than 500 characters
    /// - The post does not exist
    /// - The store fails
    pub async fn add_comment(
        &self,
        post_id: &PostId,
        author: &Author,
        content: &str,
    ) -> Result<Comment, InteractionError> {
        let content = validate_comment(content)?;

        if self.store.get_post(post_id).await?.is_none() {
            return Err(InteractionError::post_not_found(post_id));
        }

        let comment = self
            .store
            .add_comment(NewComment {
                post_id: post_id.clone(),
                content: content.to_string(),
                author_id: author.id.clone(),
                author_name: author.display_name().to_string(),
                author_photo_url: author.photo_url.clone(),
            })
            .await?;
        self.store.increment_comments(post_id, 1).await?;

        info!(post_id = %post_id, comment_id = %comment.id, author = %author.id, "Comment added");
        Ok(comment)
    }

    /// Comments on a post, newest first.
    ///
    /// Comments still waiting for a server timestamp come first, in store order.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn load_comments(&self, post_id: &PostId) -> Result<Vec<Comment>, InteractionError> {
        let mut comments = self.store.comments_for_post(post_id).await?;
        comments.sort_by(newest_first);
        Ok(comments)
    }
}

/// Trim and check comment content.
fn validate_comment(content: &str) -> Result<&str, InteractionError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(InteractionError::EmptyComment);
    }
    let len = content.chars().count();
    if len > MAX_COMMENT_LEN {
        return Err(InteractionError::CommentTooLong {
            len,
            max: MAX_COMMENT_LEN,
        });
    }
    Ok(content)
}

fn newest_first(a: &Comment, b: &Comment) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use inhamissa_shared::CommentId;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock document store for testing.
    #[derive(Default)]
    struct MockDocumentStore {
        posts: Mutex<HashMap<PostId, Post>>,
        comments: Mutex<Vec<Comment>>,
    }

    impl MockDocumentStore {
        fn with_post(post: Post) -> Self {
            let store = Self::default();
            store.posts.lock().unwrap().insert(post.id.clone(), post);
            store
        }

        fn post(&self, id: &PostId) -> Post {
            self.posts.lock().unwrap()[id].clone()
        }

        fn push_comment(&self, id: &str, post: &PostId, created_at: Option<chrono::DateTime<Utc>>) {
            self.comments.lock().unwrap().push(Comment {
                id: CommentId::parse(id).unwrap(),
                post_id: post.clone(),
                content: format!("comment {id}"),
                author_id: OwnerId::parse("someone").unwrap(),
                author_name: "Someone".to_string(),
                author_photo_url: None,
                created_at,
            });
        }
    }

    impl DocumentStore for MockDocumentStore {
        async fn get_post(&self, id: &PostId) -> Result<Option<Post>, InteractionError> {
            Ok(self.posts.lock().unwrap().get(id).cloned())
        }

        async fn update_likes(&self, id: &PostId, update: LikeUpdate) -> Result<(), InteractionError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .get_mut(id)
                .ok_or_else(|| InteractionError::post_not_found(id))?;
            post.likes = post.likes.saturating_add_signed(update.delta);
            post.liked_by = update.liked_by;
            Ok(())
        }

        async fn add_comment(&self, comment: NewComment) -> Result<Comment, InteractionError> {
            let mut comments = self.comments.lock().unwrap();
            let stored = Comment {
                id: CommentId::parse(format!("c{}", comments.len() + 1)).unwrap(),
                post_id: comment.post_id,
                content: comment.content,
                author_id: comment.author_id,
                author_name: comment.author_name,
                author_photo_url: comment.author_photo_url,
                created_at: Some(Utc::now()),
            };
            comments.push(stored.clone());
            Ok(stored)
        }

        async fn increment_comments(&self, id: &PostId, delta: i64) -> Result<(), InteractionError> {
            let mut posts = self.posts.lock().unwrap();
            let post = posts
                .get_mut(id)
                .ok_or_else(|| InteractionError::post_not_found(id))?;
            post.comments = post.comments.saturating_add_signed(delta);
            Ok(())
        }

        async fn comments_for_post(&self, id: &PostId) -> Result<Vec<Comment>, InteractionError> {
            Ok(self
                .comments
                .lock()
                .unwrap()
                .iter()
                .filter(|c| &c.post_id == id)
                .cloned()
                .collect())
        }
    }

    fn post_id() -> PostId {
        PostId::parse("post-1").unwrap()
    }

    fn user(id: &str) -> OwnerId {
        OwnerId::parse(id).unwrap()
    }

    fn service(store: MockDocumentStore) -> (InteractionService<MockDocumentStore>, Arc<MockDocumentStore>) {
        let store = Arc::new(store);
        (InteractionService::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_toggle_like_adds_then_removes() {
        let (service, store) = service(MockDocumentStore::with_post(Post::new(post_id())));
        let alice = user("alice");

        let liked = service.toggle_like(&post_id(), &alice).await.unwrap();
        assert_eq!(liked, LikeState { liked: true, likes: 1 });
        assert!(store.post(&post_id()).is_liked_by(&alice));

        let unliked = service.toggle_like(&post_id(), &alice).await.unwrap();
        assert_eq!(unliked, LikeState { liked: false, likes: 0 });
        let post = store.post(&post_id());
        assert!(!post.is_liked_by(&alice));
        assert_eq!(post.likes, 0);
    }

    #[tokio::test]
    async fn test_unlike_never_goes_negative() {
        let mut post = Post::new(post_id());
        post.liked_by.push(user("bob"));
        let (service, store) = service(MockDocumentStore::with_post(post));

        let state = service.toggle_like(&post_id(), &user("bob")).await.unwrap();

        assert_eq!(state, LikeState { liked: false, likes: 0 });
        assert_eq!(store.post(&post_id()).likes, 0);
    }

    #[tokio::test]
    async fn test_toggle_like_keeps_other_likers() {
        let mut post = Post::new(post_id());
        post.likes = 2;
        post.liked_by = vec![user("a"), user("b")];
        let (service, store) = service(MockDocumentStore::with_post(post));

        service.toggle_like(&post_id(), &user("a")).await.unwrap();

        assert_eq!(store.post(&post_id()).liked_by, vec![user("b")]);
    }

    #[tokio::test]
    async fn test_toggle_like_missing_post() {
        let (service, _) = service(MockDocumentStore::default());
        let err = service.toggle_like(&post_id(), &user("a")).await.unwrap_err();
        assert_eq!(err, InteractionError::PostNotFound(post_id()));
    }

    #[tokio::test]
    async fn test_add_comment_trims_and_counts() {
        let (service, store) = service(MockDocumentStore::with_post(Post::new(post_id())));
        let author = Author::new(user("carla")).with_photo_url("https://img.test/c.png");

        let comment = service
            .add_comment(&post_id(), &author, "  Boa pergunta!  ")
            .await
            .unwrap();

        assert_eq!(comment.content, "Boa pergunta!");
        assert_eq!(comment.author_name, "Usuário");
        assert_eq!(comment.author_photo_url.as_deref(), Some("https://img.test/c.png"));
        assert_eq!(store.post(&post_id()).comments, 1);
    }

    #[tokio::test]
    async fn test_add_comment_rejects_bad_content() {
        let (service, store) = service(MockDocumentStore::with_post(Post::new(post_id())));
        let author = Author::new(user("d")).with_name("Dário");

        let empty = service.add_comment(&post_id(), &author, "   ").await;
        assert_eq!(empty.unwrap_err(), InteractionError::EmptyComment);

        let long = "é".repeat(501);
        let too_long = service.add_comment(&post_id(), &author, &long).await;
        assert_eq!(
            too_long.unwrap_err(),
            InteractionError::CommentTooLong { len: 501, max: 500 }
        );

        let at_limit = "é".repeat(500);
        assert!(service.add_comment(&post_id(), &author, &at_limit).await.is_ok());
        assert_eq!(store.post(&post_id()).comments, 1);
    }

    #[tokio::test]
    async fn test_add_comment_missing_post() {
        let (service, store) = service(MockDocumentStore::default());
        let err = service
            .add_comment(&post_id(), &Author::new(user("e")), "olá")
            .await
            .unwrap_err();
        assert!(matches!(err, InteractionError::PostNotFound(_)));
        assert!(store.comments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_comments_newest_first() {
        let store = MockDocumentStore::with_post(Post::new(post_id()));
        let other = PostId::parse("post-2").unwrap();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.push_comment("old", &post_id(), Some(base));
        store.push_comment("pending-a", &post_id(), None);
        store.push_comment("new", &post_id(), Some(base + Duration::minutes(5)));
        store.push_comment("elsewhere", &other, Some(base + Duration::hours(1)));
        store.push_comment("pending-b", &post_id(), None);
        let (service, _) = service(store);

        let ids: Vec<String> = service
            .load_comments(&post_id())
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id.to_string())
            .collect();

        assert_eq!(ids, vec!["pending-a", "pending-b", "new", "old"]);
    }

    #[test]
    fn test_is_liked_by() {
        let mut post = Post::new(post_id());
        post.liked_by.push(user("f"));
        assert!(InteractionService::<MockDocumentStore>::is_liked_by(&post, &user("f")));
        assert!(!InteractionService::<MockDocumentStore>::is_liked_by(&post, &user("g")));
    }
}
