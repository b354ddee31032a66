//! Hand-off to source renderers.
//!
//! Templating lives outside this crate; a [`Renderer`] receives the finished
//! [`Generated`] plan. [`JsonRenderer`] dumps the plan itself.
use crate::ir::Generated;

pub trait Renderer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn render(&self, generated: &Generated) -> Result<String, Self::Error>;
}

#[derive(Debug, Clone, Copy)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl Default for JsonRenderer {
    fn default() -> Self {
        JsonRenderer { pretty: true }
    }
}

impl Renderer for JsonRenderer {
    type Error = serde_json::Error;

    fn render(&self, generated: &Generated) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(generated)
        } else {
            serde_json::to_string(generated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, FieldKind, NamedType, TargetType};
    use pretty_assertions::assert_eq;

    #[test]
    fn json_plan_tags_target_types() {
        let generated = Generated {
            types: vec![NamedType {
                name: "ViewerQuery".into(),
                fields: vec![Field {
                    name: "login".into(),
                    ident: "login".into(),
                    ty: TargetType::Optional(Box::new(TargetType::Leaf("String".into()))),
                    kind: FieldKind::Scalar,
                    children: vec![],
                }],
            }],
            fragments: vec![],
            operations: vec![],
        };
        let rendered = JsonRenderer { pretty: false }.render(&generated).unwrap();
        assert_eq!(
            rendered,
            r#"{"types":[{"name":"ViewerQuery","fields":[{"name":"login","ident":"login","ty":{"kind":"optional","of":{"kind":"leaf","of":"String"}},"kind":"scalar"}]}],"fragments":[],"operations":[]}"#
        );
    }
}
