use crate::HeronServerConfig;

use heron_core::prelude::*;
use heron_jobs::prelude::*;
use std::sync::Arc;

/// Built once in [`HeronServer::build`](crate::HeronServer::build) and shared by all handlers.
#[derive(Clone)]
pub struct AppState<S: HeronServices> {
    pub services: S,
    pub submitter: Arc<Submitter<S::Storage, S::Compute, S::Registry>>,
    pub fetcher: Arc<ResultFetcher<S::Compute>>,
    pub config: Arc<HeronServerConfig>,
}

impl<S> HeronServices for AppState<S>
where
    S: HeronServices,
{
    type Storage = S::Storage;
    type Compute = S::Compute;
    type Registry = S::Registry;
    type Auth = S::Auth;

    fn storage(&self) -> &Self::Storage {
        self.services.storage()
    }
    fn compute(&self) -> &Self::Compute {
        self.services.compute()
    }
    fn registry(&self) -> &Self::Registry {
        self.services.registry()
    }
    fn auth(&self) -> &Self::Auth {
        self.services.auth()
    }
}
