//! Catalog Loading - All or Nothing
//!
//! The catalog, URL mapping and description catalog are read concurrently.
//! If any one of them fails, nothing is loaded.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::thread::{self, ScopedJoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::description::DescriptionCatalog;
use crate::engine::{Action, ConfigState, ConfigView, Configurator, EngineError, EngineSettings};
use crate::url_codec::UrlMapping;

pub const CATALOG_FILE: &str = "layers-config.json";
pub const MAPPING_FILE: &str = "url-mapping.json";
pub const DESCRIPTIONS_FILE: &str = "layer-descriptions.json";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {resource}: {source}")]
    Read {
        resource: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {resource}: {source}")]
    Parse {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Loader for {0} panicked")]
    Panicked(&'static str),
}

/// The three catalogs an engine needs, always loaded together.
#[derive(Debug, Clone, Default)]
pub struct CatalogBundle {
    pub catalog: Catalog,
    pub mapping: UrlMapping,
    pub descriptions: DescriptionCatalog,
}

impl CatalogBundle {
    pub fn load_from_dir(dir: &Path) -> Result<Self, LoadError> {
        let bundle = thread::scope(|s| {
            let catalog = s.spawn(|| read_json::<Catalog>(dir, CATALOG_FILE));
            let mapping = s.spawn(|| read_json::<UrlMapping>(dir, MAPPING_FILE));
            let descriptions = s.spawn(|| read_json::<DescriptionCatalog>(dir, DESCRIPTIONS_FILE));

            Ok::<_, LoadError>(Self {
                catalog: join(catalog, CATALOG_FILE)?,
                mapping: join(mapping, MAPPING_FILE)?,
                descriptions: join(descriptions, DESCRIPTIONS_FILE)?,
            })
        })?;

        info!(
            dir = %dir.display(),
            layers = bundle.catalog.layers.len(),
            covers = bundle.catalog.covers.len(),
            "catalog loaded"
        );
        Ok(bundle)
    }
}

/// Settings are optional: a missing file means defaults.
pub fn load_settings(dir: &Path) -> Result<EngineSettings, LoadError> {
    if !dir.join(SETTINGS_FILE).exists() {
        debug!(dir = %dir.display(), "no settings file, using defaults");
        return Ok(EngineSettings::default());
    }
    read_json(dir, SETTINGS_FILE)
}

fn read_json<T: DeserializeOwned>(dir: &Path, resource: &'static str) -> Result<T, LoadError> {
    let content = fs::read_to_string(dir.join(resource))
        .map_err(|source| LoadError::Read { resource, source })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Parse { resource, source })
}

fn join<T>(
    handle: ScopedJoinHandle<'_, Result<T, LoadError>>,
    resource: &'static str,
) -> Result<T, LoadError> {
    handle.join().map_err(|_| LoadError::Panicked(resource))?
}

// --- Session ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
    Closed,
}

/// Handed out by [`Session::begin_load`]; only the newest ticket counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// One consumer's view of the engine: loading, ready, failed or torn down.
pub struct Session {
    settings: EngineSettings,
    generation: u64,
    status: SessionStatus,
    engine: Option<Configurator>,
    state: Option<ConfigState>,
}

impl Session {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            generation: 0,
            status: SessionStatus::Idle,
            engine: None,
            state: None,
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        if self.status != SessionStatus::Closed {
            self.status = SessionStatus::Loading;
        }
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Apply a finished load. Results arriving after teardown or after a
    /// newer load started are dropped; returns whether it was applied.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<CatalogBundle, LoadError>,
        path: Option<&str>,
    ) -> bool {
        if self.status == SessionStatus::Closed || ticket.generation != self.generation {
            debug!(ticket = ticket.generation, current = self.generation, "ignoring stale load");
            return false;
        }

        match result {
            Ok(bundle) => {
                let engine = Configurator::new(bundle, self.settings.clone());
                let state = match path {
                    Some(path) => engine.restore(path),
                    None => engine.default_state(),
                };
                self.engine = Some(engine);
                self.state = Some(state);
                self.status = SessionStatus::Ready;
            }
            Err(e) => {
                warn!(error = %e, "catalog load failed");
                self.engine = None;
                self.state = None;
                self.status = SessionStatus::Failed(e.to_string());
            }
        }
        true
    }

    pub fn teardown(&mut self) {
        self.status = SessionStatus::Closed;
        self.engine = None;
        self.state = None;
    }

    pub fn engine(&self) -> Option<&Configurator> {
        self.engine.as_ref()
    }

    pub fn state(&self) -> Option<&ConfigState> {
        self.state.as_ref()
    }

    pub fn dispatch(&mut self, action: Action) -> Result<&ConfigState, EngineError> {
        let (Some(engine), Some(state)) = (self.engine.as_ref(), self.state.as_mut()) else {
            return Err(EngineError::NotReady);
        };
        *state = engine.apply(state, action)?;
        Ok(state)
    }

    pub fn view(&self) -> Option<ConfigView> {
        Some(self.engine.as_ref()?.view(self.state.as_ref()?))
    }
}
