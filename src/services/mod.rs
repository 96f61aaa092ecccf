//! Services layer - Business logic
//!
//! Services implement the board's rules on top of the repositories:
//! - access and account moderation (`user`)
//! - post moderation (`post`)
//! - notification fan-out (`notification`)
//! - comments and direct messages
//!
//! Every operation acting on somebody's behalf takes the actor as an
//! explicit `&UserProfile`.

pub mod comment;
pub mod error;
pub mod image;
pub mod mention;
pub mod message;
pub mod notification;
pub mod password;
pub mod post;
pub mod session;
pub mod user;

pub use comment::CommentService;
pub use error::{ServiceError, ServiceResult};
pub use image::ImagePolicy;
pub use mention::extract_mentions;
pub use message::MessageService;
pub use notification::NotificationService;
pub use password::{hash_password, verify_password, CredentialPolicy};
pub use post::{CreatePostInput, PostService, PostSubmission};
pub use session::{SessionSigner, SessionToken};
pub use user::{DeletionOutcome, RegisterInput, Registration, UserService};
