//! Bridge MCP tools into the host tool system.

use std::sync::Arc;

use crate::error::AgentError;
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{HostTool, ToolSource};
use crate::tools::types::{ToolDefinition, ToolParameters};

use super::schema::RemoteToolDescriptor;
use super::transport::MCPSession;

/// Turn a remote descriptor into a [`HostTool`] that calls back through
/// `session`.
///
/// Rejects a blank name and a schema that is present but not an object.
/// Registration is left to the caller.
pub fn adapt(
    descriptor: RemoteToolDescriptor,
    source: ToolSource,
    session: Arc<dyn MCPSession>,
) -> Result<HostTool, AgentError> {
    if descriptor.name.trim().is_empty() {
        return Err(AgentError::InvalidArgument(
            "MCP tool name must not be empty".into(),
        ));
    }

    let parameters = match descriptor.input_schema {
        None | Some(serde_json::Value::Null) => ToolParameters::empty(),
        Some(schema @ serde_json::Value::Object(_)) => ToolParameters::from_schema(schema),
        Some(other) => {
            return Err(AgentError::InvalidArgument(format!(
                "MCP tool '{}' has a non-object input schema: {other}",
                descriptor.name
            )))
        }
    };

    let name = descriptor.name;
    let definition = ToolDefinition::function(
        name.clone(),
        descriptor.description.unwrap_or_default(),
        parameters,
    );

    Ok(HostTool::new(definition, source, move |args: ToolArguments| {
        let session = Arc::clone(&session);
        let name = name.clone();
        async move {
            let result = session.call_tool(&name, args.into_raw()).await?;
            Ok(result.into_value_or_text())
        }
    }))
}
