use crate::error::ViewResult;
use regex::{Captures, Regex};

/// Rewrites `{{ expr }}` to an escaped echo and `{!! expr !!}` to a raw one
pub struct Interpolator {
    escaped: Regex,
    raw: Regex,
}

impl Interpolator {
    pub fn new() -> ViewResult<Self> {
        Ok(Self {
            escaped: Regex::new(r"(?s)\{\{\s*(.*?)\s*\}\}")?,
            raw: Regex::new(r"(?s)\{!!\s*(.*?)\s*!!\}")?,
        })
    }

    pub fn compile(&self, source: &str) -> String {
        let text = self.raw.replace_all(source, |caps: &Captures| echo(caps, "<%-"));
        self.escaped
            .replace_all(&text, |caps: &Captures| echo(caps, "<%="))
            .into_owned()
    }
}

/// Markers with nothing inside stay as written
fn echo(caps: &Captures, tag: &str) -> String {
    match &caps[1] {
        "" => caps[0].to_string(),
        expression => format!("{} {} %>", tag, expression),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_and_raw() {
        let interpolator = Interpolator::new().unwrap();
        assert_eq!(
            interpolator.compile("Hello {{ name }} and {!!  html !!}"),
            "Hello <%= name %> and <%- html %>"
        );
    }

    #[test]
    fn test_multiline_expression() {
        let interpolator = Interpolator::new().unwrap();
        assert_eq!(
            interpolator.compile("{{\n  user.name ?? 'guest'\n}}"),
            "<%= user.name ?? 'guest' %>"
        );
    }

    #[test]
    fn test_dollar_signs_are_not_expanded() {
        let interpolator = Interpolator::new().unwrap();
        assert_eq!(interpolator.compile("{{ $price }}"), "<%= $price %>");
    }

    #[test]
    fn test_empty_markers_are_left_as_text() {
        let interpolator = Interpolator::new().unwrap();
        let source = "{{ }} {{}} {!! !!} {!!!!}";
        assert_eq!(interpolator.compile(source), source);
        assert_eq!(interpolator.compile("{{ }} {{ a }}"), "{{ }} <%= a %>");
    }

    #[test]
    fn test_text_without_delimiters_is_unchanged() {
        let interpolator = Interpolator::new().unwrap();
        let source = "<p>{ not } an {{ expression</p>";
        assert_eq!(interpolator.compile(source), source);
    }
}
