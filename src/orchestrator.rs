//! Install and configure cycles
//!
//! [`CinderVolume`] sequences one cycle: load and validate the options, build
//! the backend collection, create directories, render every declared file and
//! finally ask the supervisor to restart the services whose files changed.
//! Progress is tracked with a [`CycleContext`] so a failure is reported with
//! the stage it happened in.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::backend::{BackendCollection, CINDER_BACKENDS_NAMESPACE, CINDER_CONF_D};
use crate::config::{self, ConfigSource, Configuration};
use crate::context::{self, ConfigContext, ContextProvider, Namespace, PathContext};
use crate::error::{CinderError, Result};
use crate::lifecycle::{CycleContext, CycleKind, LifecycleStage};
use crate::paths::PathProvider;
use crate::render::{self, ChangedFiles, Renderer, TemplateSearch};
use crate::services::{self, ServiceDescriptor};
use crate::supervisor::ServiceSupervisor;
use crate::template::{Directory, Template};

pub const ETC_CINDER: &str = "etc/cinder";
pub const STATE_DIR: &str = "lib/cinder";
pub const LOCK_DIR: &str = "lib/cinder/lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    Started,
    Restarted,
    /// The supervisor does not know the service
    Skipped,
}

impl fmt::Display for ServiceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Restarted => write!(f, "restarted"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAction {
    pub service: String,
    pub outcome: ServiceOutcome,
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub stage: LifecycleStage,
    pub changed: ChangedFiles,
    pub actions: Vec<ServiceAction>,
}

/// Lifecycle manager of the packaged cinder-volume service.
pub struct CinderVolume<'a> {
    paths: &'a dyn PathProvider,
    supervisor: &'a dyn ServiceSupervisor,
    renderer: Renderer,
    services: Vec<ServiceDescriptor>,
}

impl<'a> CinderVolume<'a> {
    pub fn new(paths: &'a dyn PathProvider, supervisor: &'a dyn ServiceSupervisor) -> Self {
        Self {
            paths,
            supervisor,
            renderer: Renderer::new(TemplateSearch::for_paths(paths)),
            services: services::services(),
        }
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceDescriptor>) -> Self {
        self.services = services;
        self
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// Directories every installation needs
    pub fn directories(&self) -> Vec<Directory> {
        vec![
            Directory::common(ETC_CINDER),
            Directory::common(CINDER_CONF_D),
            Directory::common(STATE_DIR),
            Directory::common(LOCK_DIR),
        ]
    }

    /// Files shared by every backend
    pub fn template_files(&self) -> Vec<Template> {
        vec![
            Template::common("cinder.conf", ETC_CINDER),
            Template::common("rootwrap.conf", ETC_CINDER),
        ]
    }

    /// Fetch the option sections from `source` and validate them.
    pub fn load_configuration(&self, source: &dyn ConfigSource) -> Result<Configuration> {
        let raw = source.options(Configuration::SECTIONS)?;
        Ok(config::validate(&raw)?)
    }

    /// Create the core directories, and those of `backends`, with their modes.
    pub fn setup_dirs(&self, backends: Option<&BackendCollection>) -> Result<()> {
        let mut directories = self.directories();
        if let Some(backends) = backends {
            directories.extend(backends.directories());
        }

        let mut seen = BTreeSet::new();
        for directory in directories {
            let path = self.paths.location(directory.location).join(&directory.path);
            if !seen.insert(path.clone()) {
                continue;
            }
            debug!("Creating directory {}", path.display());
            fs::create_dir_all(&path)?;
            fs::set_permissions(&path, fs::Permissions::from_mode(directory.mode))?;
        }
        Ok(())
    }

    /// Namespace shared by every template of a render pass.
    pub fn render_namespace(
        &self,
        config: &Configuration,
        backends: &BackendCollection,
    ) -> Result<Namespace> {
        let path_context = PathContext::new(self.paths);
        let config_contexts = ConfigContext::from_configuration(config)?;

        let mut providers: Vec<&dyn ContextProvider> = vec![&path_context];
        providers.extend(config_contexts.iter().map(|c| c as &dyn ContextProvider));
        let mut namespace = context::assemble(&providers)?;

        // backend values may refer to snap_paths
        let scope = render::tera_context(&namespace)?;
        let view = render::render_embedded(backends.context(), &scope)
            .map_err(|e| CinderError::render_context(format!("{} context failed: {}", CINDER_BACKENDS_NAMESPACE, e)))?;
        namespace.insert(CINDER_BACKENDS_NAMESPACE.to_string(), view);
        Ok(namespace)
    }

    /// Render every declared file and return the paths that changed.
    ///
    /// A namespace that cannot be assembled renders nothing.
    pub fn template(
        &self,
        config: &Configuration,
        backends: &BackendCollection,
    ) -> Result<ChangedFiles> {
        let namespace = match self.render_namespace(config, backends) {
            Ok(namespace) => namespace,
            Err(e @ CinderError::RenderContext(_)) => {
                error!("Not rendering templates: {}", e);
                return Ok(ChangedFiles::new());
            }
            Err(e) => return Err(e),
        };

        let changed = self
            .renderer
            .render(self.paths, &namespace, &self.template_files(), backends)?;
        info!("Rendered templates, {} file(s) changed", changed.len());
        Ok(changed)
    }

    /// Restart services whose files changed and start the others.
    pub fn reconcile(
        &self,
        changed: &ChangedFiles,
        backends: &BackendCollection,
    ) -> Result<Vec<ServiceAction>> {
        let backend_files: BTreeSet<PathBuf> = backends
            .template_files()
            .iter()
            .map(Template::rel_path)
            .collect();
        let handles = self.supervisor.list()?;

        let mut actions = Vec::with_capacity(self.services.len());
        for service in &self.services {
            let outcome = match handles.get(service.name) {
                None => {
                    warn!("Service {} is not known to the supervisor, skipping", service.name);
                    ServiceOutcome::Skipped
                }
                Some(handle) => {
                    let affected = changed
                        .iter()
                        .any(|path| service.watches(path) || backend_files.contains(path));
                    if affected {
                        info!("Restarting {}", service.name);
                        handle.restart()?;
                        ServiceOutcome::Restarted
                    } else {
                        info!("Starting {}", service.name);
                        handle.start()?;
                        ServiceOutcome::Started
                    }
                }
            };
            actions.push(ServiceAction {
                service: service.name.to_string(),
                outcome,
            });
        }
        Ok(actions)
    }

    /// Prepare the directories and render what the options allow; never
    /// touches services.
    pub fn install(&self, source: &dyn ConfigSource) -> Result<CycleReport> {
        let mut cycle = CycleContext::new(CycleKind::Install);
        let result = self.install_cycle(source, &mut cycle);
        finish(&mut cycle, result)
    }

    fn install_cycle(
        &self,
        source: &dyn ConfigSource,
        cycle: &mut CycleContext,
    ) -> Result<CycleReport> {
        self.setup_dirs(None)?;
        cycle.transition_to(LifecycleStage::DirectoriesReady)?;

        let loaded = self
            .load_configuration(source)
            .and_then(|config| BackendCollection::build(&config).map(|backends| (config, backends)));
        let changed = match loaded {
            Ok((config, backends)) => {
                self.setup_dirs(Some(&backends))?;
                self.template(&config, &backends)?
            }
            Err(e) if e.is_configuration_error() => {
                warn!("Configuration not complete, nothing rendered: {}", e);
                ChangedFiles::new()
            }
            Err(e) => return Err(e),
        };
        cycle.transition_to(LifecycleStage::TemplatesRendered)?;

        Ok(CycleReport {
            stage: cycle.current_stage(),
            changed,
            actions: Vec::new(),
        })
    }

    /// Full cycle: validate, prepare, render, reconcile.
    pub fn configure(&self, source: &dyn ConfigSource) -> Result<CycleReport> {
        let mut cycle = CycleContext::new(CycleKind::Configure);
        let result = self.configure_cycle(source, &mut cycle);
        finish(&mut cycle, result)
    }

    fn configure_cycle(
        &self,
        source: &dyn ConfigSource,
        cycle: &mut CycleContext,
    ) -> Result<CycleReport> {
        let config = self.load_configuration(source)?;
        let backends = BackendCollection::build(&config)?;
        info!(
            "Configuring backends: {}",
            backends.enabled_backends().join(", ")
        );

        self.setup_dirs(Some(&backends))?;
        cycle.transition_to(LifecycleStage::DirectoriesReady)?;

        backends.setup(self.paths)?;
        let changed = self.template(&config, &backends)?;
        cycle.transition_to(LifecycleStage::TemplatesRendered)?;

        let actions = self.reconcile(&changed, &backends)?;
        cycle.transition_to(LifecycleStage::ServicesReconciled)?;

        Ok(CycleReport {
            stage: cycle.current_stage(),
            changed,
            actions,
        })
    }

    pub fn install_hook(&self, source: &dyn ConfigSource) -> Result<()> {
        self.install(source).map(|_| ())
    }

    /// Configure hook: an incomplete configuration is not a hook failure.
    pub fn configure_hook(&self, source: &dyn ConfigSource) -> Result<()> {
        match self.configure(source) {
            Ok(report) => {
                debug!("Configure cycle reached {}", report.stage);
                Ok(())
            }
            Err(e) if e.is_configuration_error() => {
                warn!("Configuration not complete: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn finish(cycle: &mut CycleContext, result: Result<CycleReport>) -> Result<CycleReport> {
    if let Err(e) = &result {
        if cycle.fail().is_ok() {
            if let Some(stage) = cycle.failed_at() {
                error!("{} cycle failed after {}: {}", cycle.kind(), stage, e);
            }
        }
    }
    result
}
