// Evidentiary attachments of CV sub-records: staged replace/remove per slot,
// committed together with the owning record.

pub mod draft;
pub mod handlers;
pub mod manager;
pub mod preview;

pub use draft::{AttachmentDraft, StagedChange};
pub use manager::{
    AttachmentError, AttachmentManager, CommitReport, DeleteFailure, DeletePolicy, UploadPolicy,
};
pub use preview::{PreviewMode, ResolvedFile, RetrievalEndpoint};
