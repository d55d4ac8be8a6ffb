//! Per-execution state shared by the stages of one rack run.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Unique identifier of one rack execution (UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Generates a new time-ordered identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Context handed to every stage of a single execution.
///
/// Stages use the typed extension map to pass data down (or back up) the
/// chain without touching the request.
///
/// ```
/// use kinvey_rack::RackContext;
///
/// #[derive(Debug, PartialEq)]
/// struct CacheHit(bool);
///
/// let mut ctx = RackContext::new();
/// ctx.set_extension(CacheHit(true));
/// assert_eq!(ctx.get_extension::<CacheHit>(), Some(&CacheHit(true)));
/// ```
#[derive(Debug)]
pub struct RackContext {
    execution_id: ExecutionId,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RackContext {
    /// Creates a context with a fresh execution id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_execution_id(ExecutionId::new())
    }

    /// Creates a context with the given execution id.
    #[must_use]
    pub fn with_execution_id(execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// The execution id.
    #[must_use]
    pub const fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    /// When the execution started.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time since the execution started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a value, replacing any previous value of the same type.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns the stored value of type `T`.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns the stored value of type `T`.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Returns `true` if a value of type `T` is stored.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for RackContext {
    fn default() -> Self {
        Self::new()
    }
}
