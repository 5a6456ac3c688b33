//! Operations composed with their cache directive

use super::{CacheInterceptor, Codec, JsonCodec};
use crate::context::CallContext;
use crate::directive::CacheDirective;
use crate::error::{InvokeError, KeyExpansionError};
use crate::key::CallArguments;
use crate::store::CacheStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// An async function bound to a directive and an interceptor.
///
/// Built once, called many times; every call goes through
/// [`CacheInterceptor::invoke`].
pub struct Cached<S, F, C = JsonCodec> {
    interceptor: Arc<CacheInterceptor<S, C>>,
    directive: CacheDirective,
    function: F,
}

impl<S, F, C> Cached<S, F, C>
where
    S: CacheStore,
    C: Codec,
{
    pub fn new(
        interceptor: Arc<CacheInterceptor<S, C>>,
        directive: CacheDirective,
        function: F,
    ) -> Self {
        Self {
            interceptor,
            directive,
            function,
        }
    }

    pub fn directive(&self) -> &CacheDirective {
        &self.directive
    }

    pub fn interceptor(&self) -> &Arc<CacheInterceptor<S, C>> {
        &self.interceptor
    }

    /// Call the function behind the cache
    pub async fn call<T, E, Fut>(
        &self,
        ctx: &CallContext,
        args: &CallArguments,
    ) -> Result<Option<T>, InvokeError<E>>
    where
        F: Fn(CallArguments) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        T: Serialize + DeserializeOwned,
    {
        self.interceptor
            .invoke(ctx, &self.directive, args, || (self.function)(args.clone()))
            .await
    }

    /// Drop the cached entry for `args`
    pub async fn evict(&self, args: &CallArguments) -> Result<bool, KeyExpansionError> {
        self.interceptor.evict(&self.directive, args).await
    }
}
