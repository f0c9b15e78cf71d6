//! Embedded-editor half of the email builder bridge.
//!
//! [`MessagingClient`] answers host commands using a [`TemplateCache`] filled
//! from a [`TemplateApi`], and writes documents into an [`EditorStore`].

pub mod api;
pub mod cache;
pub mod client;
pub mod editor;
pub mod http;
pub mod images;
pub mod transform;

pub use api::{ImageApi, TemplateApi};
pub use cache::{CacheFill, TemplateCache};
pub use client::{ClientState, MessagingClient, SaveStatus, TransformFn};
pub use editor::{EditorDocument, EditorStore};
pub use http::HttpTemplateApi;
pub use images::ImageLibrary;
pub use transform::transform_api_template;
