use crate::*;
use serde_json::json;

fn render(source: &str, value: serde_json::Value) -> EvalResult<String> {
    let serde_json::Value::Object(data) = value else {
        panic!("Expected object");
    };
    Renderer::new().render(source, &data)
}

#[test]
fn test_if_elseif_else() {
    let source = "<% if n > 10 %>big<% elseif n > 5 %>medium<% else %>small<% endif %>";
    assert_eq!(render(source, json!({ "n": 20 })).unwrap(), "big");
    assert_eq!(render(source, json!({ "n": 7 })).unwrap(), "medium");
    assert_eq!(render(source, json!({ "n": 1 })).unwrap(), "small");
}

#[test]
fn test_foreach_over_arrays_and_objects() {
    let ctx = json!({ "users": ["ada", "bob"], "roles": { "ada": "admin" } });
    assert_eq!(
        render("<% foreach users as user %><li><%= user %></li><% endforeach %>", ctx.clone())
            .unwrap(),
        "<li>ada</li><li>bob</li>"
    );
    assert_eq!(
        render("<% foreach users as i => user %><%= i %>:<%= user %> <% endforeach %>", ctx.clone())
            .unwrap(),
        "0:ada 1:bob "
    );
    assert_eq!(
        render("<% foreach roles as name => role %><%= name %>=<%= role %><% endforeach %>", ctx)
            .unwrap(),
        "ada=admin"
    );
}

#[test]
fn test_foreach_over_null_renders_nothing() {
    assert_eq!(
        render("<% foreach items as item %>x<% endforeach %>", json!({ "items": null })).unwrap(),
        ""
    );
    assert!(matches!(
        render("<% foreach items as item %>x<% endforeach %>", json!({ "items": 3 })).unwrap_err(),
        EvalError::TypeError { .. }
    ));
}

#[test]
fn test_ranges() {
    assert_eq!(
        render("<% for i in 0..3 %><%= i %><% endfor %>", json!({})).unwrap(),
        "012"
    );
    assert_eq!(
        render("<% for i in 1..=n %><%= i %><% endfor %>", json!({ "n": 3 })).unwrap(),
        "123"
    );
}

#[test]
fn test_while_and_set() {
    let source = "<% set i = 0 %><% while i < 3 %><%= i %><% set i = i + 1 %><% endwhile %>";
    assert_eq!(render(source, json!({})).unwrap(), "012");
}

#[test]
fn test_do_while_runs_at_least_once() {
    let source = "<% do %>x<% dowhile false %>";
    assert_eq!(render(source, json!({})).unwrap(), "x");
}

#[test]
fn test_loop_limit() {
    let source = "<% while true %>.<% endwhile %>";
    let mut data = Data::new();
    data.insert("unused".to_string(), json!(null));
    let err = Renderer::new()
        .with_max_loop_iterations(50)
        .render(source, &data)
        .unwrap_err();
    assert_eq!(err, EvalError::LoopLimit { limit: 50 });
}

#[test]
fn test_break_exits_innermost_loop() {
    let source = "<% foreach items as item %><% if item == 3 %><% break %><% endif %><%= item %><% endforeach %>";
    assert_eq!(render(source, json!({ "items": [1, 2, 3, 4] })).unwrap(), "12");
}

#[test]
fn test_switch_falls_through_until_break() {
    let source = "<% switch role %>\n<% case 'admin' %>A<% case 'editor' %>E<% break %><% default %>G<% endswitch %>";
    assert_eq!(render(source, json!({ "role": "admin" })).unwrap(), "AE");
    assert_eq!(render(source, json!({ "role": "editor" })).unwrap(), "E");
    assert_eq!(render(source, json!({ "role": "guest" })).unwrap(), "G");
}

#[test]
fn test_break_inside_switch_does_not_end_loop() {
    let source = "<% foreach items as item %><% switch item %><% case 1 %>one<% break %><% default %>n<% endswitch %>;<% endforeach %>";
    assert_eq!(render(source, json!({ "items": [1, 2] })).unwrap(), "one;n;");
}

#[test]
fn test_text_without_tags_is_identity() {
    let source = "<p>Plain 100% text, with <b>markup</b> & symbols</p>";
    assert_eq!(render(source, json!({})).unwrap(), source);
}
