//! Directives every engine starts with. Each one lowers to runtime statements.

use super::{DirectiveError, DirectiveKind, DirectiveRegistry};
use crate::error::ViewResult;

fn required<'a>(expression: Option<&'a str>, name: &str) -> Result<&'a str, DirectiveError> {
    match expression.map(str::trim) {
        Some(expression) if !expression.is_empty() => Ok(expression),
        _ => Err(DirectiveError::new(format!("`@{}` needs an expression", name))),
    }
}

fn block(
    registry: &mut DirectiveRegistry,
    name: &'static str,
    open: &'static str,
    close: &'static str,
) -> ViewResult<()> {
    registry.register(name, DirectiveKind::Block, move |expression, body| {
        let expression = required(expression, name)?;
        Ok(format!(
            "<% {} {} %>{}<% {} %>",
            open,
            expression,
            body.unwrap_or_default(),
            close
        ))
    })
}

fn statement(registry: &mut DirectiveRegistry, name: &'static str) -> ViewResult<()> {
    registry.register(name, DirectiveKind::SingleLine, move |expression, _| {
        Ok(format!("<% {} {} %>", name, required(expression, name)?))
    })
}

fn keyword(registry: &mut DirectiveRegistry, name: &'static str) -> ViewResult<()> {
    registry.register(name, DirectiveKind::Terminating, move |_, _| {
        Ok(format!("<% {} %>", name))
    })
}

pub fn register_builtins(registry: &mut DirectiveRegistry) -> ViewResult<()> {
    block(registry, "if", "if", "endif")?;
    block(registry, "switch", "switch", "endswitch")?;
    block(registry, "foreach", "foreach", "endforeach")?;
    block(registry, "for", "for", "endfor")?;
    block(registry, "while", "while", "endwhile")?;

    registry.register("unless", DirectiveKind::Block, |expression, body| {
        let expression = required(expression, "unless")?;
        Ok(format!(
            "<% if !({}) %>{}<% endif %>",
            expression,
            body.unwrap_or_default()
        ))
    })?;
    registry.register("do-while", DirectiveKind::Block, |expression, body| {
        let expression = required(expression, "do-while")?;
        Ok(format!(
            "<% do %>{}<% dowhile {} %>",
            body.unwrap_or_default(),
            expression
        ))
    })?;

    statement(registry, "elseif")?;
    statement(registry, "case")?;
    statement(registry, "set")?;

    keyword(registry, "else")?;
    keyword(registry, "default")?;
    keyword(registry, "break")?;

    registry.register("script", DirectiveKind::SingleLine, |expression, _| {
        let source = expression
            .map(|src| src.trim().trim_matches(|c| c == '\'' || c == '"'))
            .filter(|src| !src.is_empty())
            .ok_or_else(|| DirectiveError::new("Missing script source"))?;
        Ok(format!("<script src='{}'></script>", source))
    })?;

    Ok(())
}
