//! Per-request scopes: one root container for the process, one child
//! scope per inbound request, disposed when the request finishes.
//!
//! Run with `RUST_LOG=hearth=trace` to see every resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use hearth::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

// === Application services ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        info!(target: "app", "{msg}");
    }
}

struct Config {
    database_url: String,
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
    opened: AtomicU32,
}

impl Database {
    fn session(&self, request: u32) -> DbSession {
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.logger.log(&format!("opening session #{n} on {} for request {request}", self.url));
        DbSession { request, logger: self.logger.clone() }
    }
}

impl Dispose for Database {
    fn dispose(&self) -> std::result::Result<(), BoxError> {
        self.logger.log("closing connection pool");
        Ok(())
    }
}

struct DbSession {
    request: u32,
    logger: Arc<dyn Logger>,
}

impl Dispose for DbSession {
    fn dispose(&self) -> std::result::Result<(), BoxError> {
        self.logger.log(&format!("committing session for request {}", self.request));
        Ok(())
    }
}

struct RequestId(u32);

#[derive(Injectable)]
struct UserRepository {
    session: Arc<DbSession>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        format!("user {id} (request {})", self.session.request)
    }
}

#[derive(Injectable)]
struct UserHandler {
    repo: Arc<UserRepository>,
    logger: Arc<dyn Logger>,
}

struct DataProvider;

impl Provider for DataProvider {
    fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()> {
        registry.add(
            ServiceDescriptor::new(|r| {
                let config = r.resolve::<Config>()?;
                Ok(Database {
                    url: config.database_url.clone(),
                    logger: r.resolve()?,
                    opened: AtomicU32::new(0),
                })
            })
            .depends_on(ServiceKey::of::<Config>())
            .depends_on(ServiceKey::of::<dyn Logger>())
            .disposable(),
        )
    }
}

fn handle(root: &Container, request: u32) -> Result<String> {
    let scope = root.create_scope()?;
    scope.register_instance(RequestId(request))?;
    scope.add(
        ServiceDescriptor::new(|r| {
            let id = r.resolve::<RequestId>()?;
            Ok(r.resolve::<Database>()?.session(id.0))
        })
        .disposable(),
    )?;
    scope.autowire::<UserRepository>(ReuseScope::ContainerSingleton)?;
    scope.autowire::<UserHandler>(ReuseScope::Transient)?;
    scope.validate()?;

    let handler = scope.resolve::<UserHandler>()?;
    handler.logger.log(&format!("handling request {request}"));
    let response = handler.repo.find_user(u64::from(request) * 10);

    scope.finish()?;
    Ok(response)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hearth=debug,app=info")))
        .init();

    let root = Container::builder()
        .label("app")
        .instance(Config {
            database_url: "postgres://localhost/app".to_string(),
        })
        .add(ServiceDescriptor::<dyn Logger>::shared(|_| Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>)))
        .add_provider(&DataProvider)
        .build()?;

    info!(target: "app", "container ready: {root:?}");

    for request in 1..=3 {
        let response = handle(&root, request)?;
        info!(target: "app", %response, "request done");
    }

    root.dispose()
}
