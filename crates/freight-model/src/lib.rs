pub mod mapping;
pub mod record;
pub mod submission;
pub mod validation;

pub use mapping::{ApiCredential, FieldMapping, MappingConfiguration};
pub use record::{UploadRecord, UploadTable};
pub use submission::{BatchReport, RecordStatus, SubmissionOutcome, UploadSummary};
pub use validation::{FieldError, InvalidReason, ValidationResult};
