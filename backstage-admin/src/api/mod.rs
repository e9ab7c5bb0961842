//! HTTP API handlers for backstage-admin

pub mod attachments;
pub mod buildinfo;
pub mod contact;
pub mod error;
pub mod health;
pub mod messages;
pub mod sse;

pub use attachments::attachment_routes;
pub use buildinfo::buildinfo_routes;
pub use contact::contact_routes;
pub use error::ApiError;
pub use health::health_routes;
pub use messages::message_routes;
pub use sse::event_routes;
