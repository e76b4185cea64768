//! AST transform layer.
//!
//! Plugins are pure `Script -> Script` functions that also contribute
//! metadata; the pipeline composes them in registration order and merges
//! metadata shallowly. The serializer turns any AST back into script text
//! such that re-parsing yields a structurally equal AST.

mod serialize;

pub use serialize::{quote_word, serialize, serialize_word};

use serde_json::{Map, Value};

use crate::parser::Script;

/// Result of one plugin application.
pub struct TransformOutcome {
    pub script: Script,
    /// Metadata contributed by this plugin; merged over the accumulated map.
    pub metadata: Map<String, Value>,
}

/// A pure AST-to-AST pass.
pub trait TransformPlugin: Send + Sync {
    /// Plugin name, surfaced in metadata and diagnostics.
    fn name(&self) -> &str;

    /// Transform the script. `metadata` accumulates contributions from
    /// earlier plugins in the pipeline.
    fn transform(&self, script: Script, metadata: &Map<String, Value>) -> TransformOutcome;
}

/// Ordered plugin composition with shallow metadata merging.
#[derive(Default)]
pub struct TransformPipeline {
    plugins: Vec<Box<dyn TransformPlugin>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, plugin: Box<dyn TransformPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run every plugin over the script, left to right.
    pub fn apply(&self, script: Script) -> (Script, Map<String, Value>) {
        let mut script = script;
        let mut metadata = Map::new();
        for plugin in &self.plugins {
            let outcome = plugin.transform(script, &metadata);
            script = outcome.script;
            for (key, value) in outcome.metadata {
                metadata.insert(key, value);
            }
        }
        (script, metadata)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use serde_json::json;

    struct Tagger(&'static str, i64);

    impl TransformPlugin for Tagger {
        fn name(&self) -> &str {
            self.0
        }

        fn transform(&self, script: Script, metadata: &Map<String, Value>) -> TransformOutcome {
            let mut out = Map::new();
            out.insert(self.0.to_string(), json!(self.1));
            out.insert(
                "seen".to_string(),
                json!(metadata.keys().len() as i64),
            );
            TransformOutcome {
                script,
                metadata: out,
            }
        }
    }

    #[test]
    fn plugins_compose_and_merge_metadata() {
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Tagger("first", 1)));
        pipeline.push(Box::new(Tagger("second", 2)));

        let script = Parser::new("echo hi").parse().unwrap();
        let (_, metadata) = pipeline.apply(script);
        assert_eq!(metadata.get("first"), Some(&json!(1)));
        assert_eq!(metadata.get("second"), Some(&json!(2)));
        // The second plugin saw the first plugin's keys.
        assert_eq!(metadata.get("seen"), Some(&json!(2)));
    }

    #[test]
    fn later_keys_overwrite_earlier_shallowly() {
        struct Fixed(&'static str, Value);
        impl TransformPlugin for Fixed {
            fn name(&self) -> &str {
                self.0
            }
            fn transform(
                &self,
                script: Script,
                _metadata: &Map<String, Value>,
            ) -> TransformOutcome {
                let mut out = Map::new();
                out.insert("key".to_string(), self.1.clone());
                TransformOutcome {
                    script,
                    metadata: out,
                }
            }
        }

        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Fixed("a", json!({"x": 1}))));
        pipeline.push(Box::new(Fixed("b", json!({"y": 2}))));
        let script = Parser::new("true").parse().unwrap();
        let (_, metadata) = pipeline.apply(script);
        assert_eq!(metadata.get("key"), Some(&json!({"y": 2})));
    }
}
