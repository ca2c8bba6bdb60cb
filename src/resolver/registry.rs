//! Publisher-keyed resolver registry.
//!
//! The [`ResolverRegistry`] holds one resolver per publisher and answers
//! lookups from both the search flow (to decide whether a link is worth
//! queueing and at which stage it resolves) and the download workers (to
//! drive the actual resolution).

use tracing::{debug, warn};

use crate::classify::Publisher;

use super::{ResolveStage, SiteResolver};

/// A publisher-keyed collection of resolvers.
///
/// Lookups return the first resolver registered for a publisher;
/// duplicate registrations are kept but shadowed, with a warning.
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn SiteResolver>>,
}

impl ResolverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Registers a resolver for its publisher.
    #[tracing::instrument(skip(self, resolver), fields(publisher))]
    pub fn register(&mut self, resolver: Box<dyn SiteResolver>) {
        tracing::Span::current().record("publisher", resolver.publisher().slug());
        if self.for_publisher(resolver.publisher()).is_some() {
            warn!(
                publisher = %resolver.publisher(),
                "resolver already registered for publisher; new registration is shadowed"
            );
        }
        debug!(
            publisher = %resolver.publisher(),
            stage = ?resolver.stage(),
            "Registering resolver"
        );
        self.resolvers.push(resolver);
    }

    /// Returns the number of registered resolvers.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns true if no resolvers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Looks up the resolver for a publisher.
    #[must_use]
    pub fn for_publisher(&self, publisher: Publisher) -> Option<&dyn SiteResolver> {
        self.resolvers
            .iter()
            .find(|r| r.publisher() == publisher)
            .map(AsRef::as_ref)
    }

    /// Returns the stage at which a publisher resolves, when registered.
    #[must_use]
    pub fn stage_of(&self, publisher: Publisher) -> Option<ResolveStage> {
        self.for_publisher(publisher).map(SiteResolver::stage)
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("resolver_count", &self.resolver_count())
            .finish_non_exhaustive()
    }
}
