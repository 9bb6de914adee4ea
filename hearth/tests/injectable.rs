use std::sync::Arc;

use hearth::prelude::*;

struct Logger;

struct Pool {
    url: &'static str,
}

struct Metrics;

#[derive(Injectable)]
struct Repository {
    logger: Arc<Logger>,
    #[inject(name = "primary")]
    pool: Arc<Pool>,
    metrics: Option<Arc<Metrics>>,
    #[inject(default)]
    retries: u32,
}

#[derive(Injectable)]
struct Clock;

#[derive(Injectable)]
struct Service {
    repo: Arc<Repository>,
    #[inject(name = "replica")]
    replica: Option<Arc<Pool>>,
}

fn root() -> Container {
    let root = Container::new();
    root.register(|_| Ok(Logger)).unwrap();
    root.register_instance_named("primary", Pool { url: "postgres://primary" }).unwrap();
    root
}

#[test]
fn derived_dependencies_list_required_fields_only() {
    assert_eq!(
        Repository::dependencies(),
        vec![ServiceKey::of::<Logger>(), ServiceKey::named::<Pool>("primary")]
    );
    assert!(Clock::dependencies().is_empty());
    assert_eq!(Service::dependencies(), vec![ServiceKey::of::<Repository>()]);
}

#[test]
fn autowire_resolves_fields() {
    let root = root();
    root.autowire::<Repository>(ReuseScope::ContainerSingleton).unwrap();

    let repo = root.resolve::<Repository>().unwrap();
    assert_eq!(repo.pool.url, "postgres://primary");
    assert!(repo.metrics.is_none());
    assert_eq!(repo.retries, 0);
    assert!(Arc::ptr_eq(&repo.logger, &root.resolve::<Logger>().unwrap()));
}

#[test]
fn optional_fields_pick_up_registrations() {
    let root = root();
    root.register(|_| Ok(Metrics)).unwrap();
    root.register_instance_named("replica", Pool { url: "postgres://replica" }).unwrap();
    root.autowire::<Repository>(ReuseScope::HierarchicalSingleton).unwrap();
    root.autowire::<Service>(ReuseScope::Transient).unwrap();

    let service = root.resolve::<Service>().unwrap();
    assert!(service.repo.metrics.is_some());
    assert_eq!(service.replica.as_ref().map(|p| p.url), Some("postgres://replica"));
}

#[test]
fn autowired_graph_validates_in_builder() {
    let missing = Container::builder().autowire::<Repository>(ReuseScope::ContainerSingleton).build();
    match missing {
        Err(HearthError::UnregisteredService(err)) => {
            assert_eq!(err.required_by, Some(ServiceKey::of::<Repository>()));
        }
        other => panic!("Expected UnregisteredService, got: {other:?}"),
    }

    let built = Container::builder()
        .singleton(|_| Ok(Logger))
        .add(ServiceDescriptor::instance(Pool { url: "postgres://primary" }).named("primary"))
        .autowire::<Repository>(ReuseScope::ContainerSingleton)
        .autowire::<Clock>(ReuseScope::Transient)
        .build()
        .unwrap();
    assert!(built.resolve::<Clock>().is_ok());
    assert!(built.resolve::<Repository>().is_ok());
}

#[test]
fn autowire_named_registers_under_name() {
    let root = root();
    root.autowire_named::<Clock>("utc", ReuseScope::Transient).unwrap();
    assert!(root.resolve_named::<Clock>("utc").is_ok());
    assert!(root.try_resolve::<Clock>().unwrap().is_none());
}

#[test]
fn captive_transient_rejected_by_validation() {
    let root = root();
    root.autowire::<Repository>(ReuseScope::Transient).unwrap();
    root.autowire::<Service>(ReuseScope::ContainerSingleton).unwrap();

    assert!(matches!(root.validate(), Err(HearthError::ScopeMismatch(_))));
}
