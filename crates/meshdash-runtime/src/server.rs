//! Dashboard server
//!
//! Wires the dashboard together: replication mode detection, plugin loading,
//! platform event handling and the HTTP listener.

use crate::shutdown::ShutdownSignal;
use crate::RuntimeState;
use meshdash_admin::{
    AppState, DashboardRouter, DiskTemplateLocator, JsonFileDataSource, LayoutEngine,
    PageDataSource, PageRenderer, TemplateLocator, ViewEngine,
};
use meshdash_config::Config;
use meshdash_core::{DashboardHandle, Error, Platform, PlatformEvent, Result};
use meshdash_plugins::bus::drain;
use meshdash_plugins::{
    relay, ManifestDiscovery, PluginDiscovery, PluginHost, PluginLoader, PluginModule,
    PluginRegistry, RegistryBus, RegistryCommand, RouteTable, StatusPlugin,
};
use meshdash_replication::{CouchReplicationSource, ModeDetector, ReplicationSource};
use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// How long `start` waits for plugin connects by default
pub const DEFAULT_PLUGIN_GRACE: Duration = Duration::from_secs(5);

/// Dashboard server
pub struct Server {
    config: Config,
    dashboard: DashboardHandle,
    platform: Platform,
    registry: PluginRegistry,
    routes: RouteTable,
    loader: PluginLoader,
    detector: ModeDetector,
    renderer: PageRenderer,
    builtins: Vec<PluginModule>,
    plugin_grace: Duration,
    bus_rx: Mutex<Option<UnboundedReceiver<RegistryCommand>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    state: Arc<RwLock<RuntimeState>>,
    shutdown: ShutdownSignal,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("state", &*self.state.read())
            .field("builtins", &self.builtins.len())
            .finish()
    }
}

impl Server {
    /// Create a new server builder
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Get the current state
    pub fn state(&self) -> RuntimeState {
        *self.state.read()
    }

    /// Get listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.config.dashboard.listen_addr()
    }

    /// Dashboard lifecycle state
    pub fn dashboard(&self) -> &DashboardHandle {
        &self.dashboard
    }

    /// Platform event bus
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Plugin registry
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Plugin loader
    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// Page renderer
    pub fn renderer(&self) -> &PageRenderer {
        &self.renderer
    }

    /// Get shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// HTTP router for the dashboard
    pub fn router(&self) -> Result<axum::Router> {
        let state = AppState::new(
            self.renderer.clone(),
            self.routes.clone(),
            self.dashboard.clone(),
        );

        DashboardRouter::build(
            state,
            &self.config.dashboard.static_dir,
            self.config.dashboard.max_age,
        )
    }

    /// Run the startup sequence without binding a listener.
    ///
    /// Starts following platform events, detects the replication mode, then
    /// connects the built-in plugins and the core plugin directory. Connects
    /// that finish within the plugin grace period are applied before this
    /// returns; slower ones reach the registry later through the relay.
    /// Finally the configured applications are replayed as `app.load` events.
    pub async fn start(&self) -> Result<()> {
        let mut bus_rx = self
            .bus_rx
            .lock()
            .take()
            .ok_or_else(|| Error::Runtime("server already started".to_string()))?;

        let events_task = self.follow_platform();
        self.tasks.lock().push(events_task);

        self.detect_mode().await;

        let mut pending = self.loader.spawn_all(self.builtins.clone());
        pending.extend(self.loader.find(&self.config.dashboard.plugin_dir).await);
        self.settle(pending).await;

        // Everything queued so far is applied before the first request.
        drain(&mut bus_rx, &self.registry);

        let relay_task = tokio::spawn(relay(bus_rx, self.registry.clone()));
        self.tasks.lock().push(relay_task);

        for app in &self.config.apps {
            self.platform.emit_app_load(app.clone());
        }

        *self.state.write() = RuntimeState::Running;
        info!(
            mode = %self.dashboard.mode(),
            plugins = ?self.registry.plugins(),
            "Dashboard started"
        );

        Ok(())
    }

    /// Wait for plugin connects until the grace period runs out. Tasks still
    /// connecting keep running on their own.
    async fn settle(&self, handles: Vec<JoinHandle<Result<()>>>) {
        let deadline = Instant::now() + self.plugin_grace;
        let mut unsettled = 0usize;

        for handle in handles {
            match timeout_at(deadline, handle).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(error = %e, "Plugin task failed"),
                Err(_) => unsettled += 1,
            }
        }

        if unsettled > 0 {
            warn!(
                unsettled,
                grace = ?self.plugin_grace,
                "Plugins still connecting, their registrations will arrive later"
            );
        }
    }

    async fn detect_mode(&self) {
        match self.config.replication_url() {
            Some(url) => {
                self.detector.detect(url, &self.config.dbname).await;
            }
            None => warn!("No replication url configured, skipping mode detection"),
        }
    }

    fn follow_platform(&self) -> JoinHandle<()> {
        // Subscribed before the task is spawned so no event is missed.
        let mut events = self.platform.subscribe();
        let dashboard = self.dashboard.clone();
        let loader = self.loader.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PlatformEvent::Status(status)) => {
                        debug!(status = %status, "Platform status changed");
                        dashboard.apply_status(status);
                    }
                    Ok(PlatformEvent::AppLoad(app)) => {
                        dashboard.register_app(&app);
                        if let Some(dir) = app.plugin_dir() {
                            debug!(app = ?app.id, dir = %dir.display(), "Loading application plugins");
                            loader.find(dir).await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Dashboard lagged behind platform events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Start, bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        self.start().await?;

        let listener = TcpListener::bind(self.listen_addr()).await.map_err(|e| {
            Error::Runtime(format!("Failed to bind to {}: {}", self.listen_addr(), e))
        })?;

        self.serve(listener).await
    }

    /// Serve HTTP on `listener` until the shutdown signal fires
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let router = self.router()?;
        let shutdown = self.shutdown.clone();

        let addr = listener.local_addr()?;
        info!(listen = %addr, "Dashboard listening");

        self.dashboard.set_server_up(true);
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await;
        self.dashboard.set_server_up(false);

        *self.state.write() = RuntimeState::ShuttingDown;
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        *self.state.write() = RuntimeState::Stopped;

        info!("Dashboard stopped");
        served.map_err(|e| Error::Runtime(format!("Server error: {e}")))
    }
}

/// Server builder
pub struct ServerBuilder {
    config: Option<Config>,
    replication_source: Option<Arc<dyn ReplicationSource>>,
    discovery: Option<Arc<dyn PluginDiscovery>>,
    data_source: Option<Arc<dyn PageDataSource>>,
    locator: Option<Arc<dyn TemplateLocator>>,
    engine: Option<Arc<dyn ViewEngine>>,
    plugins: Vec<PluginModule>,
    status_plugin: bool,
    plugin_grace: Duration,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("plugins", &self.plugins.len())
            .field("status_plugin", &self.status_plugin)
            .field("plugin_grace", &self.plugin_grace)
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: None,
            replication_source: None,
            discovery: None,
            data_source: None,
            locator: None,
            engine: None,
            plugins: Vec::new(),
            status_plugin: true,
            plugin_grace: DEFAULT_PLUGIN_GRACE,
        }
    }

    /// Set configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Read replication rules from `source` instead of CouchDB
    pub fn replication_source(mut self, source: Arc<dyn ReplicationSource>) -> Self {
        self.replication_source = Some(source);
        self
    }

    /// Discover plugin modules with `discovery` instead of manifests
    pub fn discovery(mut self, discovery: Arc<dyn PluginDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Read static page data from `source`
    pub fn data_source(mut self, source: Arc<dyn PageDataSource>) -> Self {
        self.data_source = Some(source);
        self
    }

    /// Locate page templates with `locator`
    pub fn template_locator(mut self, locator: Arc<dyn TemplateLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Render pages with `engine`
    pub fn view_engine(mut self, engine: Arc<dyn ViewEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Add a compiled-in plugin
    pub fn plugin(mut self, plugin: PluginModule) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Enable/disable the built-in `/status` plugin
    pub fn enable_status_plugin(mut self, enable: bool) -> Self {
        self.status_plugin = enable;
        self
    }

    /// How long `start` waits for plugin connects before serving without them
    pub fn plugin_grace(mut self, grace: Duration) -> Self {
        self.plugin_grace = grace;
        self
    }

    /// Build the server
    pub fn build(self) -> Result<Server> {
        let config = self
            .config
            .ok_or_else(|| Error::Config("config is required".to_string()))?;
        let dash = &config.dashboard;

        let dashboard = DashboardHandle::new(dash.title.clone());
        let platform = Platform::new();
        let registry = PluginRegistry::new();
        let routes = RouteTable::new();
        let (bus, bus_rx) = RegistryBus::channel();

        let host = PluginHost::new(routes.clone(), platform.clone(), dashboard.clone(), bus);
        let discovery = self
            .discovery
            .unwrap_or_else(|| Arc::new(ManifestDiscovery::new()));
        let loader = PluginLoader::new(discovery, host);

        let source: Arc<dyn ReplicationSource> = match self.replication_source {
            Some(source) => source,
            None => Arc::new(CouchReplicationSource::with_timeout(
                config.replication.timeout,
            )?),
        };
        let detector = ModeDetector::new(source, dashboard.clone());

        let data_source = self
            .data_source
            .unwrap_or_else(|| Arc::new(JsonFileDataSource::new(&dash.pagedata_dir)));
        let locator = self.locator.unwrap_or_else(|| {
            Arc::new(DiskTemplateLocator::new(
                &dash.views_dir,
                dash.template_extension.clone(),
            ))
        });
        let engine: Arc<dyn ViewEngine> = match self.engine {
            Some(engine) => engine,
            None => Arc::new(LayoutEngine::new(
                &dash.views_dir,
                dash.template_extension.clone(),
            )?),
        };
        let renderer = PageRenderer::new(
            dashboard.clone(),
            registry.clone(),
            data_source,
            locator,
            engine,
        );

        let mut builtins: Vec<PluginModule> = Vec::new();
        if self.status_plugin {
            builtins.push(Arc::new(StatusPlugin::new()));
        }
        builtins.extend(self.plugins);

        Ok(Server {
            config,
            dashboard,
            platform,
            registry,
            routes,
            loader,
            detector,
            renderer,
            builtins,
            plugin_grace: self.plugin_grace,
            bus_rx: Mutex::new(Some(bus_rx)),
            tasks: Mutex::new(Vec::new()),
            state: Arc::new(RwLock::new(RuntimeState::Initializing)),
            shutdown: ShutdownSignal::new(),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
