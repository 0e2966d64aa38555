//! Resolved constructor dependencies.

use std::collections::VecDeque;
use std::sync::Arc;

use tna_logger::Logger;

use crate::component::Component;
use crate::error::DiError;

/// The resolved dependencies of an instance under construction.
///
/// Dependencies are handed out in `consumes` order; every `take` removes the
/// next one.
pub struct Dependencies {
    provides: String,
    resolved: VecDeque<(String, Arc<dyn Component>)>,
}

impl Dependencies {
    pub(crate) fn new(
        provides: impl Into<String>,
        resolved: Vec<(String, Arc<dyn Component>)>,
    ) -> Self {
        Self {
            provides: provides.into(),
            resolved: resolved.into(),
        }
    }

    /// Provider name of the instance being constructed.
    #[must_use]
    pub fn provides(&self) -> &str {
        &self.provides
    }

    /// Number of dependencies not taken yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.resolved.len()
    }

    /// Takes the next dependency as `D`.
    pub fn take<D: Component>(&mut self) -> Result<Arc<D>, DiError> {
        let (dependency, instance) =
            self.resolved
                .pop_front()
                .ok_or_else(|| DiError::MissingDependency {
                    provides: self.provides.clone(),
                    expected: core::any::type_name::<D>(),
                })?;

        instance
            .downcast_arc::<D>()
            .map_err(|_| DiError::DependencyType {
                provides: self.provides.clone(),
                dependency,
                expected: core::any::type_name::<D>(),
            })
    }

    /// Takes the next dependency as an owned [`Logger`].
    pub fn take_logger(&mut self) -> Result<Logger, DiError> {
        self.take::<Logger>().map(Arc::unwrap_or_clone)
    }

    /// Takes the next dependency without a type check.
    pub fn take_erased(&mut self) -> Option<(String, Arc<dyn Component>)> {
        self.resolved.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use tna_getopt::GetOpt;

    use super::*;

    fn deps() -> Dependencies {
        Dependencies::new(
            "App",
            vec![
                ("Logger".to_string(), Arc::new(Logger::default()) as Arc<dyn Component>),
                ("GetOpt".to_string(), Arc::new(GetOpt::default()) as Arc<dyn Component>),
            ],
        )
    }

    #[test]
    fn takes_in_order() {
        let mut deps = deps();
        assert_eq!(deps.remaining(), 2);
        assert!(deps.take_logger().is_ok());
        assert!(deps.take::<GetOpt>().is_ok());
        assert!(matches!(
            deps.take::<GetOpt>(),
            Err(DiError::MissingDependency { .. })
        ));
    }

    #[test]
    fn wrong_type_names_the_dependency() {
        let mut deps = deps();
        let err = deps.take::<GetOpt>().unwrap_err();
        assert!(matches!(
            err,
            DiError::DependencyType { ref dependency, .. } if dependency == "Logger"
        ));
    }
}
