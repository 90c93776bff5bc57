//! Transport handle resolution.
//!
//! A multiplexer is built either from a transport handle or from a factory
//! producing one. The factory is invoked on every resolution; callers that
//! want a single connection must memoize it themselves.

use crate::traits::{Transport, TransportError};
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type Factory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn Transport>, TransportError>> + Send + Sync>;

/// Where a multiplexer gets its transport from.
#[derive(Clone)]
pub enum TransportSource {
    /// A handle reused as-is for every operation.
    Direct(Arc<dyn Transport>),
    /// A factory invoked once per operation.
    Factory(Factory),
}

impl TransportSource {
    /// Use the given transport for every operation.
    #[must_use]
    pub fn direct(transport: Arc<dyn Transport>) -> Self {
        Self::Direct(transport)
    }

    /// Resolve the transport through a factory on every operation.
    #[must_use]
    pub fn factory<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn Transport>, TransportError>> + Send + 'static,
    {
        Self::Factory(Arc::new(move || Box::pin(factory())))
    }

    /// Resolve the transport handle for one operation.
    ///
    /// # Errors
    ///
    /// Returns whatever error the factory produced.
    pub async fn resolve(&self) -> Result<Arc<dyn Transport>, TransportError> {
        match self {
            Self::Direct(transport) => Ok(Arc::clone(transport)),
            Self::Factory(factory) => factory().await,
        }
    }
}

impl fmt::Debug for TransportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(transport) => f.debug_tuple("Direct").field(&transport.name()).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

impl<T: Transport + 'static> From<Arc<T>> for TransportSource {
    fn from(transport: Arc<T>) -> Self {
        Self::Direct(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_direct_reuses_handle() {
        let transport = Arc::new(MemoryTransport::new());
        let source = TransportSource::from(Arc::clone(&transport));

        let a = source.resolve().await.unwrap();
        let b = source.resolve().await.unwrap();
        assert_eq!(a.name(), "memory");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_factory_invoked_per_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = TransportSource::factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Arc::new(MemoryTransport::new()) as Arc<dyn Transport>) }
        });

        source.resolve().await.unwrap();
        source.resolve().await.unwrap();
        source.resolve().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_factory_error_propagates() {
        let source = TransportSource::factory(|| async {
            Err(TransportError::Unavailable("no client yet".into()))
        });

        assert!(matches!(
            source.resolve().await,
            Err(TransportError::Unavailable(_))
        ));
    }
}
