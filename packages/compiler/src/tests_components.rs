use crate::components::{ComponentExpander, ComponentRenderer, RenderedComponent};
use crate::error::{ViewError, ViewResult};
use std::collections::HashMap;

/// Serves fixed markup per tag and records every call
#[derive(Default)]
struct Fixtures {
    templates: HashMap<&'static str, &'static str>,
    hidden: Vec<String>,
    calls: Vec<(String, Vec<(String, String)>)>,
}

impl Fixtures {
    fn with(mut self, tag: &'static str, html: &'static str) -> Self {
        self.templates.insert(tag, html);
        self
    }
}

impl ComponentRenderer for Fixtures {
    fn render_component(
        &mut self,
        tag: &str,
        attributes: &[(String, String)],
    ) -> ViewResult<RenderedComponent> {
        self.calls.push((tag.to_string(), attributes.to_vec()));
        match self.templates.get(tag) {
            Some(html) => Ok(RenderedComponent {
                html: html.to_string(),
                hidden: self.hidden.clone(),
            }),
            None => Err(ViewError::ComponentNotFound {
                tag: tag.to_string(),
                suggestions: Vec::new(),
            }),
        }
    }
}

fn expand(source: &str, fixtures: &mut Fixtures) -> ViewResult<String> {
    ComponentExpander::new("app", 8)?.expand(source, fixtures)
}

const CARD: &str = r#"<div><slot name="header"></slot><slot></slot></div>"#;

#[test]
fn test_text_without_custom_tags_is_untouched() {
    let mut fixtures = Fixtures::default();
    let source = "<div class=x>{{ name }} @if(a<b) yes @endif</div>";
    assert_eq!(expand(source, &mut fixtures).unwrap(), source);
    assert!(fixtures.calls.is_empty());
}

#[test]
fn test_commented_custom_tags_are_neutralized() {
    let mut fixtures = Fixtures::default();
    let out = expand(r#"<!-- <app-card title="x"> --><p>hi</p>"#, &mut fixtures).unwrap();
    assert_eq!(out, "<!-- commented component --><p>hi</p>");
    assert!(fixtures.calls.is_empty());
}

#[test]
fn test_named_and_default_slots() {
    let mut fixtures = Fixtures::default().with("card", CARD);
    let out = expand(
        r#"<app-card><span slot="header">Title</span>Body</app-card>"#,
        &mut fixtures,
    )
    .unwrap();
    assert_eq!(out, "<div><span>Title</span>Body</div>");
}

#[test]
fn test_unfilled_slot_becomes_comment() {
    let mut fixtures = Fixtures::default().with("card", CARD);
    let out = expand("<app-card>Body</app-card>", &mut fixtures).unwrap();
    assert_eq!(out, r#"<div><!--<slot name="header"></slot>-->Body</div>"#);
}

#[test]
fn test_unfilled_slot_with_comment_stays_hidden() {
    let mut fixtures = Fixtures::default().with(
        "card",
        r#"<div><slot name="hint"><!-- hint --></slot><slot></slot></div>"#,
    );
    let out = expand("<app-card>Body</app-card>", &mut fixtures).unwrap();
    assert_eq!(
        out,
        r#"<div><!--<slot name="hint"><!-&#45; hint -&#45;></slot>-->Body</div>"#
    );
    assert_eq!(out.matches("-->").count(), 1);
}

#[test]
fn test_unterminated_comment_next_to_component_is_text() {
    let mut fixtures = Fixtures::default().with("badge", "<b>new</b>");
    let out = expand("<app-badge></app-badge> <!-- todo", &mut fixtures).unwrap();
    assert_eq!(out, "<b>new</b> <!-- todo");
}

#[test]
fn test_unterminated_attribute_next_to_component_is_text() {
    let mut fixtures = Fixtures::default().with("badge", "<b>new</b>");
    let out = expand(r#"<p><a href="/x>link</p><app-badge></app-badge>"#, &mut fixtures).unwrap();
    assert_eq!(out, r#"<p><a href="/x>link</p><b>new</b>"#);
}

#[test]
fn test_content_for_unknown_slot_is_dropped() {
    let mut fixtures = Fixtures::default().with("card", CARD);
    let out = expand(
        r#"<app-card><b slot="footer">gone</b><i>kept</i></app-card>"#,
        &mut fixtures,
    )
    .unwrap();
    assert_eq!(out, r#"<div><!--<slot name="header"></slot>--><i>kept</i></div>"#);
}

#[test]
fn test_template_child_fills_one_slot() {
    let mut fixtures = Fixtures::default().with("card", r#"<div><slot name="footer"></slot></div>"#);
    let out = expand(
        r#"<app-card><template slot="footer"><b>1</b> <i>2</i></template></app-card>"#,
        &mut fixtures,
    )
    .unwrap();
    assert_eq!(out, "<div><b>1</b><i>2</i></div>");
}

#[test]
fn test_children_are_appended_without_slots() {
    let mut fixtures = Fixtures::default().with("list", "<ul></ul>");
    let out = expand("<app-list>\n  <li>a</li>\n</app-list>", &mut fixtures).unwrap();
    assert_eq!(out, "<ul><li>a</li></ul>");
}

#[test]
fn test_attributes_land_on_single_root() {
    let mut fixtures = Fixtures::default().with("button", r#"<button class="btn">Go</button>"#);
    let out = expand(
        r#"<p><app-button class="primary" id="save"></app-button></p>"#,
        &mut fixtures,
    )
    .unwrap();
    assert_eq!(out, r#"<p><button class="primary" id="save">Go</button></p>"#);
    assert_eq!(
        fixtures.calls,
        vec![(
            "button".to_string(),
            vec![
                ("class".to_string(), "primary".to_string()),
                ("id".to_string(), "save".to_string()),
            ]
        )]
    );
}

#[test]
fn test_hidden_attributes_are_not_copied() {
    let mut fixtures = Fixtures::default().with("button", "<button>Go</button>");
    fixtures.hidden = vec!["label".to_string()];
    let out = expand(
        r#"<app-button label="Go" type="submit"></app-button>"#,
        &mut fixtures,
    )
    .unwrap();
    assert_eq!(out, r#"<button type="submit">Go</button>"#);
}

#[test]
fn test_multi_root_components_ignore_attributes() {
    let mut fixtures = Fixtures::default().with("pair", "<h1>A</h1><p>B</p>");
    let out = expand(r#"<app-pair class="x"></app-pair>"#, &mut fixtures).unwrap();
    assert_eq!(out, "<h1>A</h1><p>B</p>");
}

#[test]
fn test_template_root_is_unwrapped() {
    let mut fixtures = Fixtures::default().with("panel", "<template><section>S</section></template>");
    let out = expand(r#"<app-panel id="p"></app-panel>"#, &mut fixtures).unwrap();
    assert_eq!(out, r#"<section id="p">S</section>"#);
}

#[test]
fn test_custom_tags_in_slot_content_expand_next() {
    let mut fixtures = Fixtures::default()
        .with("card", r#"<div class="card"><slot></slot></div>"#)
        .with("badge", r#"<span class="badge">new</span>"#);
    let out = expand("<APP-Card><app-badge></app-badge></APP-Card>", &mut fixtures).unwrap();

    assert_eq!(out, r#"<div class="card"><span class="badge">new</span></div>"#);
    let order: Vec<&str> = fixtures.calls.iter().map(|(tag, _)| tag.as_str()).collect();
    assert_eq!(order, ["card", "badge"]);
}

#[test]
fn test_url_attributes_of_expanded_markup_are_decoded() {
    let mut fixtures = Fixtures::default().with("link", r#"<a href="/search?q=a%20b&amp;x=1">go</a>"#);
    let out = expand(r#"<a href="/x%20y"></a><app-link></app-link>"#, &mut fixtures).unwrap();
    assert_eq!(out, r#"<a href="/x%20y"></a><a href="/search?q=a b&x=1">go</a>"#);
}

#[test]
fn test_render_errors_propagate() {
    let mut fixtures = Fixtures::default();
    let err = expand("<app-missing></app-missing>", &mut fixtures).unwrap_err();
    assert!(matches!(err, ViewError::ComponentNotFound { ref tag, .. } if tag == "missing"));
}

#[test]
fn test_endless_expansion_hits_limit() {
    let mut fixtures = Fixtures::default().with("echo", "<b><app-echo></app-echo></b>");
    let err = ComponentExpander::new("app", 3)
        .unwrap()
        .expand("<app-echo></app-echo>", &mut fixtures)
        .unwrap_err();
    assert!(matches!(err, ViewError::RecursionLimit { limit: 3, .. }));
}

#[test]
fn test_empty_prefix_is_rejected() {
    assert!(matches!(
        ComponentExpander::new("  ", 8),
        Err(ViewError::InvalidArgument(_))
    ));
}
