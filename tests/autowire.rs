/// Autowiring and callable invocation tests
///
/// Covers object and scalar parameters, parameter store lookups, defaults,
/// nullable and union parameters, and overrides passed to `Container::call`.

use ferrous_kernel::{
    Argument, Arguments, Callable, Container, DiError, DiResult, Error, Injectable, Key, Overrides, Parameter,
    Resolver,
};
use serde_json::json;
use std::sync::Arc;

struct Settings {
    dsn: String,
    pool: u32,
    replica: Option<String>,
}

impl Injectable for Settings {
    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::scalar("dsn"),
            Parameter::scalar("pool").default(4),
            Parameter::scalar("replica").nullable(),
        ]
    }

    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(Settings {
            dsn: args.value("dsn")?,
            pool: args.value("pool")?,
            replica: args.optional("replica")?,
        })
    }
}

struct Repository {
    settings: Arc<Settings>,
}

impl Injectable for Repository {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::of::<Settings>("settings")]
    }

    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(Repository {
            settings: args.object("settings")?,
        })
    }
}

struct Cache;

impl Injectable for Cache {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::union("backend", vec![Key::from("redis"), Key::from("memcached")])]
    }

    fn construct(_: &Arguments) -> DiResult<Self> {
        Ok(Cache)
    }
}

#[test]
fn test_scalars_come_from_the_parameter_store() {
    let container = Container::new();
    container.set_param("dsn", "postgres://bare");

    let settings = container.resolve::<Settings>().unwrap();
    assert_eq!(settings.dsn, "postgres://bare");
    assert_eq!(settings.pool, 4);
    assert_eq!(settings.replica, None);
}

#[test]
fn test_scoped_parameter_wins_over_bare_name() {
    let container = Container::new();
    container.set_param("dsn", "postgres://bare");
    container.set_param(format!("{}:dsn", Key::of::<Settings>()), "postgres://scoped");
    container.set_param("pool", 16);
    container.set_param("replica", "postgres://replica");

    let settings = container.resolve::<Settings>().unwrap();
    assert_eq!(settings.dsn, "postgres://scoped");
    assert_eq!(settings.pool, 16);
    assert_eq!(settings.replica.as_deref(), Some("postgres://replica"));
}

#[test]
fn test_unresolvable_scalar_names_type_and_parameter() {
    let container = Container::new();
    let error = container.resolve::<Repository>().err().unwrap();

    match &error {
        DiError::Autowire { target, parameter, .. } => {
            assert_eq!(target, Key::of::<Settings>().as_str());
            assert_eq!(parameter, "dsn");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let message = error.to_string();
    assert!(message.contains("Settings"));
    assert!(message.contains("dsn"));
}

#[test]
fn test_object_parameters_use_registered_bindings() {
    let container = Container::new();
    container.singleton(Key::of::<Settings>(), |_| {
        Ok(Settings {
            dsn: "sqlite::memory:".to_string(),
            pool: 1,
            replica: None,
        })
    });

    let repository = container.resolve::<Repository>().unwrap();
    assert_eq!(repository.settings.dsn, "sqlite::memory:");
    assert!(Arc::ptr_eq(&repository.settings, &container.resolve::<Settings>().unwrap()));
}

#[test]
fn test_union_parameters_are_rejected() {
    let container = Container::new();
    container.instance("redis", 1u8);

    match container.resolve::<Cache>().err().unwrap() {
        DiError::Autowire { parameter, reason, .. } => {
            assert_eq!(parameter, "backend");
            assert!(reason.contains("union"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_call_resolves_services_and_scalars() {
    let container = Container::new();
    container.set_param("dsn", "postgres://db");
    container.set_param("report:title", "Weekly");

    let report = Callable::new("report", |args| {
        let repository = args.object::<Repository>("repository")?;
        let title: String = args.value("title")?;
        Ok(format!("{title} from {}", repository.settings.dsn))
    })
    .param(Parameter::of::<Repository>("repository"))
    .param(Parameter::scalar("title"));

    let out = container.call(&report, &Overrides::new()).unwrap();
    assert_eq!(out, "Weekly from postgres://db");
}

#[test]
fn test_call_overrides_win_over_container() {
    let container = Container::new();
    container.instance("greeting", String::from("from container"));

    let echo = Callable::new("echo", |args| {
        let greeting = args.object::<String>("greeting")?;
        let count: u32 = args.value("count")?;
        Ok(format!("{greeting} x{count}"))
    })
    .param(Parameter::service("greeting", "greeting"))
    .param(Parameter::scalar("count"));

    let by_name = Overrides::new()
        .with_object("greeting", Arc::new(String::from("by name")))
        .with_value("count", 2);
    assert_eq!(container.call(&echo, &by_name).unwrap(), "by name x2");

    let mut raw = Overrides::new();
    raw.insert("greeting", Argument::Object(Arc::new(String::from("raw"))));
    raw.insert("count", Argument::Value(json!("3")));
    assert_eq!(container.call(&echo, &raw).unwrap(), "raw x3");

    let only_count = Overrides::new().with_value("count", 1);
    assert_eq!(container.call(&echo, &only_count).unwrap(), "from container x1");
}

#[test]
fn test_call_matches_overrides_by_type_key() {
    struct Clock(u64);

    let container = Container::new();
    let now = Callable::new("now", |args| Ok(args.object::<Clock>("clock")?.0))
        .param(Parameter::object::<Clock>("clock"));

    let overrides = Overrides::new().with_object(Key::of::<Clock>().as_str(), Arc::new(Clock(42)));
    assert_eq!(container.call(&now, &overrides).unwrap(), 42);

    assert!(matches!(
        container.call(&now, &Overrides::new()),
        Err(Error::Di(DiError::NotFound(_)))
    ));
}

#[test]
fn test_numeric_strings_feed_numeric_arguments() {
    let container = Container::new();
    let double = Callable::new("double", |args| Ok(args.value::<u64>("n")? * 2)).param(Parameter::scalar("n"));

    assert_eq!(container.call(&double, &Overrides::new().with_value("n", "21")).unwrap(), 42);

    let error = container
        .call(&double, &Overrides::new().with_value("n", "twenty"))
        .unwrap_err();
    assert!(matches!(error, Error::Di(DiError::Autowire { .. })));
}

#[test]
fn test_callable_errors_pass_through() {
    let container = Container::new();
    let failing: Callable<()> = Callable::new("failing", |_| Err(Error::handler("boom")));

    let error = container.call(&failing, &Overrides::new()).unwrap_err();
    assert_eq!(error.to_string(), "Handler error: boom");
}

#[test]
fn test_callables_describe_their_parameters() {
    let callable: Callable<()> = Callable::new("noop", |_| Ok(()))
        .param(Parameter::scalar("a"))
        .param(Parameter::of::<Settings>("settings"));

    assert_eq!(callable.name(), "noop");
    let names: Vec<&str> = callable.parameters().iter().map(|p| p.name).collect();
    assert_eq!(names, ["a", "settings"]);
    assert_eq!(callable.parameters()[1].type_key(), Some(&Key::of::<Settings>()));
    assert_eq!(callable.parameters()[0].type_key(), None);
}
