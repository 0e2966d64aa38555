//! The template registry: provider name to constructible descriptor.

use std::sync::Arc;

use tna_logger::Logger;

use crate::configuration::ConfigurationStore;
use crate::error::DiError;
use crate::metadata::ProviderDescriptor;

/// A registered, constructible provider.
#[derive(Debug, Clone)]
pub struct Template {
    /// The descriptor the template was registered from.
    pub descriptor: Arc<ProviderDescriptor>,
    /// Lookup name.
    pub provides: String,
    /// Constructor dependency names, in order.
    pub constructor_args: Vec<String>,
    /// Name of whoever registered the template.
    pub declared_by: String,
}

/// At most one template per provider name; the last registration wins.
#[derive(Debug, Default)]
pub(crate) struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    /// Registers `descriptor` and, recursively, everything it declares.
    ///
    /// Configurations carried by each descriptor are registered into
    /// `configurations` before its template is stored, so a conflicting
    /// configuration leaves the previous template in place. A provider
    /// declared from several places ends up declared by the last of them;
    /// a provider declaring one of its own declarers is not walked again.
    pub(crate) fn register(
        &mut self,
        descriptor: Arc<ProviderDescriptor>,
        registrar: &str,
        configurations: &mut ConfigurationStore,
        logger: &Logger,
    ) -> Result<(), DiError> {
        let mut path = Vec::new();
        self.register_declared(descriptor, registrar, configurations, logger, &mut path)
    }

    fn register_declared(
        &mut self,
        descriptor: Arc<ProviderDescriptor>,
        registrar: &str,
        configurations: &mut ConfigurationStore,
        logger: &Logger,
        path: &mut Vec<String>,
    ) -> Result<(), DiError> {
        let provides = descriptor.provides().to_string();

        if !descriptor.registrable() {
            return Err(DiError::NotInjectable(provides));
        }
        if path.contains(&provides) {
            return Ok(());
        }

        let previous = self.templates.iter().position(|t| t.provides == provides);
        // The same descriptor again already brought its configurations.
        let repeated = previous
            .is_some_and(|index| Arc::ptr_eq(&self.templates[index].descriptor, &descriptor));
        if !repeated {
            configurations.register(descriptor.configs().iter().cloned())?;
        }

        let template = Template {
            descriptor: Arc::clone(&descriptor),
            provides: provides.clone(),
            constructor_args: descriptor.consumes().to_vec(),
            declared_by: registrar.to_string(),
        };
        match previous {
            Some(index) => {
                logger.info(format_args!(
                    "Replacing current declaration of {provides} because of update by {registrar}"
                ));
                self.templates[index] = template;
            }
            None => {
                logger.spam(format_args!("Registering {provides} as declared by {registrar}"));
                self.templates.push(template);
            }
        }

        let declarations = descriptor.declarations();
        if !declarations.is_empty() {
            logger.spam(format_args!("Evaluating declarations of {provides}"));
            path.push(provides.clone());
            for declaration in declarations {
                self.register_declared(declaration, &provides, configurations, logger, path)?;
            }
            path.pop();
        }

        Ok(())
    }

    pub(crate) fn find(&self, provides: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.provides == provides)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.provides.clone()).collect()
    }
}
