pub mod anamnesis;
pub mod backend;
pub mod clients;
pub mod courses;
pub mod identity;
pub mod knowledge;
pub mod metadata_store;
pub mod navigation;
pub mod object_store;
pub mod photos;
pub mod session_manager;

pub use anamnesis::AnamnesisService;
pub use backend::BackendClient;
pub use clients::ClientService;
pub use courses::CourseService;
pub use identity::{HostedIdentity, IdentityProvider};
pub use knowledge::KnowledgeService;
pub use metadata_store::{HostedMetadataStore, MetadataStore, Query};
pub use navigation::{decide, GuardDecision, Navigator, RouteGuard};
pub use object_store::{HostedObjectStore, ObjectStore};
pub use photos::PhotoService;
pub use session_manager::SessionManager;
