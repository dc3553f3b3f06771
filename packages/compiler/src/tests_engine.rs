use crate::components::{Component, ComponentDefinition, ComponentSource, PropSpec};
use crate::config::EngineConfig;
use crate::directives::{DirectiveError, DirectiveKind};
use crate::engine::{Engine, TemplateSource};
use crate::error::ViewError;
use serde_json::{json, Value};
use std::sync::Arc;
use stencil_common::MockFileSystem;
use stencil_runtime::{Data, EvalError};
use tempfile::TempDir;

fn config(temp_dir: &TempDir) -> EngineConfig {
    EngineConfig::new("views", temp_dir.path().join("cache"))
}

fn engine(fs: MockFileSystem) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::with_file_system(config(&temp_dir), Arc::new(fs)).unwrap();
    (temp_dir, engine)
}

fn data(value: Value) -> Data {
    match value {
        Value::Object(map) => map,
        _ => Data::new(),
    }
}

#[test]
fn test_interpolation_escapes_unless_raw() {
    let (_temp_dir, engine) = engine(MockFileSystem::new());
    let context = data(json!({ "name": "<b>World</b>" }));

    assert_eq!(
        engine.render_inline("Hello {{ name }}", &context).unwrap(),
        "Hello &lt;b&gt;World&lt;/b&gt;"
    );
    assert_eq!(
        engine.render_inline("Hello {!! name !!}", &context).unwrap(),
        "Hello <b>World</b>"
    );
}

#[test]
fn test_plain_markup_is_an_identity() {
    let (_temp_dir, engine) = engine(MockFileSystem::new());
    let markup = "<p class=\"a\">plain &amp; simple, mail me@example.com</p>";
    assert_eq!(engine.render_inline(markup, &Data::new()).unwrap(), markup);
}

#[test]
fn test_layout_blocks_fill_yields() {
    let fs = MockFileSystem::new()
        .with_file("views/layout.html", "<title><!-- yield title --></title><!-- yield missing -->")
        .with_file(
            "views/home.html",
            "<!-- extend layout --><!-- block title -->Hi {{ name }}<!-- endblock -->",
        );
    let (_temp_dir, engine) = engine(fs);

    let html = engine.make("home", &data(json!({ "name": "Ann" }))).unwrap();
    assert_eq!(html, "<title>Hi Ann</title>");
}

#[test]
fn test_directives_compile_to_statements() {
    let (_temp_dir, engine) = engine(MockFileSystem::new());

    let list = engine
        .render_inline(
            "@foreach(items as item) <li>{{ item }}</li> @endforeach",
            &data(json!({ "items": [1, 2] })),
        )
        .unwrap();
    assert_eq!(list, " <li>1</li>  <li>2</li> ");

    let branch = "@if(admin) yes @else no @endif";
    assert_eq!(engine.render_inline(branch, &data(json!({ "admin": true }))).unwrap(), " yes ");
    assert_eq!(engine.render_inline(branch, &data(json!({ "admin": false }))).unwrap(), " no ");
}

#[test]
fn test_custom_directive() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_directive("shout", DirectiveKind::SingleLine, |expression, _| {
            let expression = expression.ok_or_else(|| DirectiveError::new("nothing to shout"))?;
            Ok(format!("<%= upper({}) %>", expression))
        })
        .unwrap();

    let html = engine.render_inline("@shout(name)", &data(json!({ "name": "bo" }))).unwrap();
    assert_eq!(html, "BO");

    let err = engine
        .register_directive("if", DirectiveKind::Block, |_, _| Ok(String::new()))
        .unwrap_err();
    assert!(matches!(err, ViewError::DirectiveAlreadyRegistered { .. }));
}

#[test]
fn test_inline_component_with_slot() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component(
            "card",
            ComponentDefinition::Inline(
                r#"<div class="card"><h2>{{ title }}</h2><slot></slot></div>"#.to_string(),
            ),
        )
        .unwrap();

    let html = engine
        .render_inline(
            r#"<app-card title="Team"><p>{{ user }}</p></app-card>"#,
            &data(json!({ "user": "Ann" })),
        )
        .unwrap();
    assert_eq!(html, r#"<div class="card" title="Team"><h2>Team</h2><p>Ann</p></div>"#);
}

#[test]
fn test_malformed_markup_beside_component_degrades_to_text() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component("badge", ComponentDefinition::Inline("<b>new</b>".to_string()))
        .unwrap();

    let html = engine
        .render_inline("<app-badge></app-badge> <!-- todo", &Data::new())
        .unwrap();
    assert_eq!(html, "<b>new</b> <!-- todo");
}

#[test]
fn test_escaped_host_expression_in_attribute_fails_to_render() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component("tag", ComponentDefinition::Inline("<span>{{ label }}</span>".to_string()))
        .unwrap();

    let err = engine
        .render_inline(
            r#"<app-tag label="{{ a > b }}"></app-tag>"#,
            &data(json!({ "a": 2, "b": 1 })),
        )
        .unwrap_err();
    assert!(matches!(err, ViewError::Render(_)));
}

#[test]
fn test_empty_interpolation_markers_stay_text() {
    let (_temp_dir, engine) = engine(MockFileSystem::new());
    assert_eq!(
        engine.render_inline("a {{ }} b {!! !!} c", &Data::new()).unwrap(),
        "a {{ }} b {!! !!} c"
    );
}

#[test]
fn test_hidden_props_stay_off_the_root() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component_with_props(
            "card",
            ComponentDefinition::Inline("<div><h2>{{ title }}</h2></div>".to_string()),
            vec![PropSpec::hidden("title", "Untitled")],
        )
        .unwrap();

    let named = engine
        .render_inline(r#"<app-card title="Team"></app-card>"#, &Data::new())
        .unwrap();
    assert_eq!(named, "<div><h2>Team</h2></div>");

    let defaulted = engine.render_inline("<app-card></app-card>", &Data::new()).unwrap();
    assert_eq!(defaulted, "<div><h2>Untitled</h2></div>");
}

struct Greeting;

impl Component for Greeting {
    fn template(&self) -> ComponentSource {
        ComponentSource::Inline("<p>{{ greeting }}, {{ name }}</p>".to_string())
    }

    fn props(&self) -> Vec<PropSpec> {
        vec![PropSpec::hidden("name", "stranger")]
    }

    fn data(&self, props: &Data) -> Data {
        let name = props.get("name").and_then(Value::as_str).unwrap_or_default();
        let greeting = if name == "stranger" { "Hi" } else { "Hello" };
        data(json!({ "greeting": greeting }))
    }
}

#[test]
fn test_factory_component() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component("greeting", ComponentDefinition::factory(Greeting))
        .unwrap();

    assert_eq!(
        engine.render_inline("<app-greeting></app-greeting>", &Data::new()).unwrap(),
        "<p>Hi, stranger</p>"
    );
    assert_eq!(
        engine
            .render_inline(r#"<app-greeting name="Bo"></app-greeting>"#, &Data::new())
            .unwrap(),
        "<p>Hello, Bo</p>"
    );
}

#[test]
fn test_kebab_attributes_are_also_snake_case() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component("tag", ComponentDefinition::Inline("<i>{{ user_name }}</i>".to_string()))
        .unwrap();

    let html = engine
        .render_inline(r#"<app-tag user-name="Zed"></app-tag>"#, &Data::new())
        .unwrap();
    assert_eq!(html, r#"<i user-name="Zed">Zed</i>"#);
}

#[test]
fn test_view_and_autoloaded_components() {
    let fs = MockFileSystem::new()
        .with_file("views/components/alert.html", "<div class=\"alert\">{{ text }}</div>")
        .with_file("widgets/UserCard.html", "<b>{{ name }}</b>");
    let (_temp_dir, mut engine) = engine(fs);
    engine
        .register_component("alert", ComponentDefinition::View("alert".to_string()))
        .unwrap();
    engine.autoload_components_from("widgets");

    let html = engine
        .render_inline(
            r#"<app-alert text="Saved"></app-alert><app-user-card name="X"></app-user-card>"#,
            &Data::new(),
        )
        .unwrap();
    assert_eq!(
        html,
        r#"<div class="alert" text="Saved">Saved</div><b name="X">X</b>"#
    );
}

#[test]
fn test_unknown_component_suggests_registered_tag() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component("card", ComponentDefinition::Inline("<div></div>".to_string()))
        .unwrap();

    let err = engine.render_inline("<app-crad></app-crad>", &Data::new()).unwrap_err();
    assert!(matches!(err, ViewError::ComponentNotFound { ref tag, .. } if tag == "crad"));
    assert!(err.suggestions()[0].contains("`card`"));
}

#[test]
fn test_recursive_component_reports_call_stack() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component(
            "tree",
            ComponentDefinition::Inline("<ul><app-tree></app-tree></ul>".to_string()),
        )
        .unwrap();

    let err = engine.render_inline("<app-tree></app-tree>", &Data::new()).unwrap_err();
    match err {
        ViewError::RecursiveComponent {
            component,
            call_stack,
        } => {
            assert_eq!(component, "tree");
            assert_eq!(call_stack, vec!["tree".to_string(), "tree".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_view_and_fallback() {
    let temp_dir = TempDir::new().unwrap();
    let fs = MockFileSystem::new()
        .with_file("views/errors/404.html", "Not found: {{ path }}")
        .with_file("views/broken.html", "<app-nope></app-nope>");
    let context = data(json!({ "path": "/x" }));

    let strict = Engine::with_file_system(config(&temp_dir), Arc::new(fs.clone())).unwrap();
    assert!(matches!(
        strict.make("missing", &context),
        Err(ViewError::ViewNotFound { ref view }) if view == "missing"
    ));

    let mut lenient_config = config(&temp_dir);
    lenient_config.throw_not_found = false;
    lenient_config.fallback_view = Some("errors/404".to_string());
    let lenient = Engine::with_file_system(lenient_config, Arc::new(fs)).unwrap();

    assert_eq!(lenient.make("missing", &context).unwrap(), "Not found: /x");
    assert!(matches!(
        lenient.make("broken", &context),
        Err(ViewError::ComponentNotFound { .. })
    ));
}

#[test]
fn test_fallback_view_must_exist() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    assert!(matches!(
        engine.set_fallback_view("errors/404"),
        Err(ViewError::ViewNotFound { .. })
    ));
    assert!(engine.fallback_view().is_none());
}

#[test]
fn test_cached_artifacts_are_reused() {
    let temp_dir = TempDir::new().unwrap();
    let fs = MockFileSystem::new().with_file("views/home.html", "<h1>{{ title }}</h1>");
    let mut config = config(&temp_dir);
    config.use_cached = true;
    let engine = Engine::with_file_system(config, Arc::new(fs)).unwrap();

    let first = engine.compile(&TemplateSource::view("home")).unwrap();
    let artifact = engine.cache().load(&first).unwrap();
    let second = engine.compile(&TemplateSource::view("home")).unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.cache().load(&second).unwrap(), artifact);
    assert_eq!(engine.cache().write_count(), 1);
}

#[test]
fn test_without_reuse_every_compile_writes() {
    let fs = MockFileSystem::new().with_file("views/home.html", "<h1>home</h1>");
    let (_temp_dir, engine) = engine(fs);

    engine.compile(&TemplateSource::view("home")).unwrap();
    engine.compile(&TemplateSource::view(" home.html")).unwrap();
    assert_eq!(engine.cache().write_count(), 2);
}

#[test]
fn test_clear_cache_removes_artifacts() {
    let (_temp_dir, engine) = engine(MockFileSystem::new());
    let key = engine.compile(&TemplateSource::named("greeting", "hi")).unwrap();

    assert!(engine.clear_cache());
    assert!(matches!(
        engine.render(&key, &Data::new()),
        Err(ViewError::ArtifactNotFound { .. })
    ));
}

#[test]
fn test_source_identity() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(&temp_dir);

    assert_eq!(TemplateSource::view("home").identity(&config), "views/home.html");
    assert_eq!(TemplateSource::named("mail", "x").identity(&config), "mail");
    let inline = TemplateSource::inline("x").identity(&config);
    assert!(inline.starts_with("inline-"));
    assert_eq!(inline, TemplateSource::inline("x").identity(&config));
    assert_ne!(inline, TemplateSource::inline("y").identity(&config));
}

#[test]
fn test_circular_include() {
    let fs = MockFileSystem::new()
        .with_file("views/a.html", "<!-- include b -->")
        .with_file("views/b.html", "<!-- include a -->");
    let (_temp_dir, engine) = engine(fs);

    assert!(matches!(
        engine.make("a", &Data::new()),
        Err(ViewError::CircularInclude { .. })
    ));
}

#[test]
fn test_component_prefix() {
    let (_temp_dir, mut engine) = engine(MockFileSystem::new());
    engine
        .register_component("card", ComponentDefinition::Inline("<div>card</div>".to_string()))
        .unwrap();
    engine.set_component_prefix("ui").unwrap();

    assert_eq!(engine.render_inline("<ui-card></ui-card>", &Data::new()).unwrap(), "<div>card</div>");
    assert!(matches!(
        engine.set_component_prefix(""),
        Err(ViewError::InvalidArgument(_))
    ));
    assert_eq!(engine.config().component_prefix, "ui");
}

#[test]
fn test_render_component_directly() {
    let fs = MockFileSystem::new().with_file("views/components/badge.html", "<span>{{ label }}</span>");
    let (_temp_dir, engine) = engine(fs);

    let html = engine.component("app-badge", &data(json!({ "label": "new" }))).unwrap();
    assert_eq!(html, "<span>new</span>");
    assert!(matches!(
        engine.component("nope", &Data::new()),
        Err(ViewError::ComponentNotFound { .. })
    ));
}

#[test]
fn test_loop_limit_surfaces_as_render_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = config(&temp_dir);
    config.max_loop_iterations = 5;
    let engine = Engine::with_file_system(config, Arc::new(MockFileSystem::new())).unwrap();

    let err = engine.render_inline("@while(true) x @endwhile", &Data::new()).unwrap_err();
    assert!(matches!(err, ViewError::Render(EvalError::LoopLimit { limit: 5 })));
}
