use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::debug;

type LoadFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;
type LoadFn<T, E> = dyn Fn() -> LoadFuture<T, E> + Send + Sync;

/// Lazily-initialised, memoized asynchronous capability.
///
/// The first [`SharedLoader::get`] runs the load; concurrent callers wait on
/// that same in-flight load. A failed load leaves the cell empty so the next
/// caller retries. Clones share the cell, so one loader owned by a session
/// serves every pass in that session and is torn down with it.
pub struct SharedLoader<T, E> {
    cell: Arc<OnceCell<T>>,
    load: Arc<LoadFn<T, E>>,
}

impl<T, E> Clone for SharedLoader<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            load: self.load.clone(),
        }
    }
}

impl<T, E> std::fmt::Debug for SharedLoader<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLoader")
            .field("loaded", &self.cell.initialized())
            .finish()
    }
}

impl<T, E> SharedLoader<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut>(load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            load: Arc::new(move || -> LoadFuture<T, E> { Box::pin(load()) }),
        }
    }

    /// A loader that is already initialised with `value`.
    pub fn ready(value: T) -> Self {
        let loaded = value.clone();
        let cell = OnceCell::new_with(Some(value));
        Self {
            cell: Arc::new(cell),
            load: Arc::new(move || -> LoadFuture<T, E> {
                let v = loaded.clone();
                Box::pin(async move { Ok(v) })
            }),
        }
    }

    pub async fn get(&self) -> Result<T, E> {
        self.cell
            .get_or_try_init(|| {
                debug!("loading shared capability");
                (self.load)()
            })
            .await
            .cloned()
    }

    /// The loaded value, without triggering a load.
    pub fn loaded(&self) -> Option<T> {
        self.cell.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}
