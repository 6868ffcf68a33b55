use heron_core::prelude::*;

#[derive(Clone)]
pub struct CoreServices<S, C, R, A> {
    pub storage: S,
    pub compute: C,
    pub registry: R,
    pub auth: A,
}

impl<S, C, R, A> HeronServices for CoreServices<S, C, R, A>
where
    S: StorageBackend,
    C: ComputeBackend,
    R: ModelRegistry,
    A: AuthProvider,
{
    type Storage = S;
    type Compute = C;
    type Registry = R;
    type Auth = A;

    fn storage(&self) -> &S {
        &self.storage
    }
    fn compute(&self) -> &C {
        &self.compute
    }
    fn registry(&self) -> &R {
        &self.registry
    }
    fn auth(&self) -> &A {
        &self.auth
    }
}
