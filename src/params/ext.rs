//! Access to the parameter store from a routed request.

use axum::http::Request;

use crate::params::store::ParameterStore;

/// Parameter accessors for requests that passed through the dispatcher.
pub trait RequestParamsExt {
    /// The merged store, if the request was dispatched.
    fn params(&self) -> Option<&ParameterStore>;

    /// Path value first, then the first query value.
    fn param(&self, name: &str) -> Option<&str> {
        self.params().and_then(|store| store.lookup(name))
    }

    fn param_all(&self, name: &str) -> Option<Vec<&str>> {
        self.params().and_then(|store| store.lookup_all(name))
    }
}

impl<B> RequestParamsExt for Request<B> {
    fn params(&self) -> Option<&ParameterStore> {
        self.extensions().get::<ParameterStore>()
    }
}
