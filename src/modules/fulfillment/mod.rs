pub mod email;
pub mod render;
pub mod upload;
pub mod workers;

pub use email::{EmailFailureKind, EmailTransport, LettreEmailTransport};
pub use upload::{ArtifactStore, CloudinaryArtifactStore};
pub use workers::{mark_completed, spawn_email_workers, spawn_render_workers, spawn_upload_workers};
