//! Store — the remote comment store the board talks to.
//!
//! DESIGN
//! ======
//! `CommentStore` is the seam between the controller and the network. The
//! production implementation is `HttpCommentStore`; tests swap in scripted
//! mocks. Replies are decoded into small typed payloads, except the comment
//! listing, which the store may answer with arbitrary JSON.

pub mod http;
pub mod types;

pub use http::HttpCommentStore;
pub use types::{
    BucketEntry, CommentFields, CommentStore, CreateBucketReply, CreateCommentReply, DeleteCommentReply, NewComment,
    StoreError, StoreRejection, StoredComment, parse_comment_listing,
};
