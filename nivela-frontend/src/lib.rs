pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use services::{
    AnamnesisService, ClientService, CourseService, IdentityProvider, KnowledgeService,
    MetadataStore, ObjectStore, PhotoService, SessionManager,
};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clients: ClientService,
    pub anamnesis: AnamnesisService,
    pub photos: PhotoService,
    pub knowledge: KnowledgeService,
    pub courses: CourseService,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionManager>,
        identity: Arc<dyn IdentityProvider>,
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            sessions,
            identity,
            clients: ClientService::new(metadata.clone()),
            anamnesis: AnamnesisService::new(metadata.clone()),
            knowledge: KnowledgeService::new(metadata.clone()),
            courses: CourseService::new(metadata.clone()),
            photos: PhotoService::new(objects, metadata),
        }
    }
}
