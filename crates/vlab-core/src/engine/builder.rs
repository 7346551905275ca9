//! Builder para `SimulationEngine`.
//!
//! Sólo el backend es obligatorio; catálogo, política, léxico y
//! configuración toman valores por defecto de laboratorio.

use std::sync::Arc;

use vlab_domain::MaterialLexicon;
use vlab_policies::{ContainerCatalog, ContainerSelectionPolicy, InMemoryCatalog, TightestFitPolicy};

use crate::backend::ReasoningBackend;
use crate::config::EngineConfig;
use crate::engine::SimulationEngine;
use crate::errors::EngineBuildError;

#[derive(Default)]
pub struct SimulationEngineBuilder {
    backend: Option<Arc<dyn ReasoningBackend>>,
    catalog: Option<Arc<dyn ContainerCatalog>>,
    policy: Option<Arc<dyn ContainerSelectionPolicy>>,
    lexicon: Option<Arc<MaterialLexicon>>,
    config: Option<EngineConfig>,
}

impl SimulationEngineBuilder {
    pub fn backend<B: ReasoningBackend + 'static>(self, backend: B) -> Self {
        self.shared_backend(Arc::new(backend))
    }

    pub fn shared_backend(mut self, backend: Arc<dyn ReasoningBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn catalog<C: ContainerCatalog + 'static>(mut self, catalog: C) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn policy<P: ContainerSelectionPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn lexicon(mut self, lexicon: MaterialLexicon) -> Self {
        self.lexicon = Some(Arc::new(lexicon));
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<SimulationEngine, EngineBuildError> {
        let backend = self.backend.ok_or(EngineBuildError::MissingBackend)?;
        let catalog: Arc<dyn ContainerCatalog> = match self.catalog {
            Some(c) => c,
            None => Arc::new(InMemoryCatalog::laboratory_default()?),
        };
        Ok(SimulationEngine { backend,
                              catalog,
                              policy: self.policy.unwrap_or_else(|| Arc::new(TightestFitPolicy::new())),
                              lexicon: self.lexicon
                                           .unwrap_or_else(|| Arc::new(MaterialLexicon::laboratory_default())),
                              config: self.config.unwrap_or_default() })
    }
}
