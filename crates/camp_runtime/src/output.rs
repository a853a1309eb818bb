//! Stack outputs published for other deployable units.

use camp_core::naming::{content_hash, shorten, unique_export_name};
use camp_core::{ConstructId, ConstructTree};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RuntimeResult;
use crate::token::Token;

/// Maximum length of the readable part of a logical id.
const MAX_LOGICAL_ID_PREFIX: usize = 240;

/// Addressing information for a published stack output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRef {
    /// Artifact id of the stack that publishes the output.
    pub stack_artifact_id: String,
    /// Logical id of the output inside its stack.
    pub logical_id: String,
    /// Name under which the output is exported.
    pub export_name: String,
}

impl OutputRef {
    /// Token importing the output into another unit's template.
    pub fn import_token(&self) -> Token {
        Token::import(self.export_name.clone())
    }

    /// Pipeline variable that carries the output into a build action.
    pub fn pipeline_variable(&self) -> String {
        format!("#{{{}.{}}}", self.stack_artifact_id, self.logical_id)
    }
}

/// An output declared in a stack.
#[derive(Debug, Clone)]
pub struct StackOutput {
    construct: ConstructId,
    reference: OutputRef,
    value: String,
}

impl StackOutput {
    /// Declare an output under `scope`, which must be inside a stack.
    pub fn declare(
        tree: &mut ConstructTree,
        scope: ConstructId,
        id: &str,
        value: impl Into<String>,
    ) -> RuntimeResult<Self> {
        let stack = tree.enclosing_stack(scope)?;
        let stack_artifact_id = tree.artifact_id(stack)?;
        let construct = tree.add_construct(scope, id)?;

        let below = tree.path_below(stack, construct)?;
        let readable: String = below
            .iter()
            .flat_map(|part| part.chars())
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let hash = content_hash(&below.join("/"))[..8].to_uppercase();
        let logical_id = format!("{}{}", shorten(&readable, MAX_LOGICAL_ID_PREFIX), hash);

        let export_name = unique_export_name(&stack_artifact_id, &logical_id);
        debug!("Declared output {} exported as {}", logical_id, export_name);

        Ok(Self {
            construct,
            reference: OutputRef {
                stack_artifact_id,
                logical_id,
                export_name,
            },
            value: value.into(),
        })
    }

    pub fn construct(&self) -> ConstructId {
        self.construct
    }

    pub fn reference(&self) -> &OutputRef {
        &self.reference
    }

    /// The value as seen from inside the publishing stack.
    pub fn value(&self) -> &str {
        &self.value
    }
}
