pub mod capabilities;
pub mod event;
pub mod result;
pub mod step;

pub use capabilities::ServerCapabilities;
pub use event::{EventEnvelope, ProvisionEvent, StepErrorContext};
pub use result::{
    AccessKind, AccessMethod, Credentials, DnsInstructions, DnsRecord, InstallationResult, SiteInfo,
};
pub use step::{PipelineStatus, StepRecord, StepStatus, TransitionError, completed_ids};
