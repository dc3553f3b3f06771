//! Layout inheritance: `include`/`extend` splicing, then `block`/`yield`
//! substitution.

use crate::config::EngineConfig;
use crate::error::{ViewError, ViewResult};
use regex::{Captures, NoExpand, Regex};
use stencil_common::{CommonError, FileSystem};
use std::collections::HashMap;
use tracing::{debug, instrument};

pub struct InheritanceResolver {
    include: Regex,
    block: Regex,
    parent: Regex,
    yield_marker: Regex,
}

impl InheritanceResolver {
    pub fn new() -> ViewResult<Self> {
        Ok(Self {
            include: Regex::new(r"(?i)<!--\s*(extend|include)\s+([A-Za-z0-9_/.-]+)\s*-->")?,
            block: Regex::new(r"(?is)<!--\s*block\s+(.*?)\s*-->(.*?)<!--\s*endblock\s*-->")?,
            parent: Regex::new(r"(?i)<!--\s*parent\s*-->")?,
            yield_marker: Regex::new(r"(?i)<!--\s*yield\s+(.*?)\s*-->")?,
        })
    }

    /// Resolve includes recursively, then fill every yield from the blocks.
    /// `origin` identifies the text being resolved for cycle detection.
    #[instrument(skip(self, fs, config, source))]
    pub fn resolve(
        &self,
        fs: &dyn FileSystem,
        config: &EngineConfig,
        source: &str,
        origin: &str,
    ) -> ViewResult<String> {
        let mut chain = vec![origin.to_string()];
        let text = self.expand_includes(fs, config, source, &mut chain)?;
        let (text, blocks) = self.extract_blocks(&text);
        Ok(self.fill_yields(&text, &blocks))
    }

    fn expand_includes(
        &self,
        fs: &dyn FileSystem,
        config: &EngineConfig,
        source: &str,
        chain: &mut Vec<String>,
    ) -> ViewResult<String> {
        if chain.len() > config.max_depth {
            return Err(ViewError::recursion_limit("Include nesting", config.max_depth));
        }
        if !self.include.is_match(source) {
            return Ok(source.to_string());
        }

        let mut out = String::with_capacity(source.len());
        let mut last = 0;

        for caps in self.include.captures_iter(source) {
            let (Some(marker), Some(target)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            out.push_str(&source[last..marker.start()]);
            last = marker.end();

            let path = config.view_path(target.as_str());
            let identity = path.display().to_string();
            if chain.contains(&identity) {
                let mut cycle = chain.clone();
                cycle.push(identity);
                return Err(ViewError::CircularInclude { chain: cycle });
            }

            let included = match fs.read_to_string(&path) {
                Ok(text) => text,
                Err(CommonError::NotFound { .. }) => {
                    return Err(ViewError::ExtendedViewLayoutNotFound { path })
                }
                Err(err) => return Err(err.into()),
            };
            debug!(target = %identity, depth = chain.len(), "Including view");

            chain.push(identity);
            let expanded = self.expand_includes(fs, config, &included, chain)?;
            chain.pop();
            out.push_str(&expanded);
        }

        out.push_str(&source[last..]);
        Ok(out)
    }

    /// Strip block regions, keeping the last body per name. A `parent` marker
    /// inside a body stands for the body stored before it.
    fn extract_blocks(&self, text: &str) -> (String, HashMap<String, String>) {
        let mut blocks: HashMap<String, String> = HashMap::new();

        let stripped = self.block.replace_all(text, |caps: &Captures| {
            let name = caps[1].trim().to_string();
            let previous = blocks.get(&name).map(String::as_str).unwrap_or_default();
            let content = self.parent.replace_all(&caps[2], NoExpand(previous)).into_owned();
            blocks.insert(name, content);
            ""
        });

        (stripped.into_owned(), blocks)
    }

    fn fill_yields(&self, text: &str, blocks: &HashMap<String, String>) -> String {
        self.yield_marker
            .replace_all(text, |caps: &Captures| {
                let name = caps[1].trim();
                blocks.get(name).cloned().unwrap_or_else(|| {
                    debug!(block = name, "Yield has no block");
                    String::new()
                })
            })
            .into_owned()
    }
}
