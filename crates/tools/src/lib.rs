//! Pharmacy capabilities for pillbox.
//!
//! Every capability is a pure read over an injected [`Catalog`]:
//! medication info, stock, prescription status, ingredients, dosage, and
//! customer records. [`default_registry`] wires all eight into a dispatch
//! table and checks it against [`CAPABILITY_NAMES`].

pub mod catalog;
pub mod medication;
pub mod users;

use pillbox_core::error::ToolError;
use pillbox_core::tool::ToolRegistry;
use std::sync::Arc;

pub use catalog::{Catalog, CatalogError, Medication, User};

/// Every capability the agent declares to the backend.
pub const CAPABILITY_NAMES: [&str; 8] = [
    "get_medication_by_name",
    "check_stock",
    "check_prescription_requirement",
    "get_active_ingredients",
    "get_dosage_info",
    "get_user_by_name",
    "list_users",
    "get_user_medications",
];

/// Returned when the backend asks for a capability that does not exist.
pub const UNRESOLVED_CAPABILITY_MESSAGE: &str =
    "Hmm, I'm not sure about that. Can I help you with a medication or something in our pharmacy?";

/// Create the pharmacy tool registry over the given catalog.
///
/// Fails if a declared capability is missing or a schema is malformed.
pub fn default_registry(catalog: Arc<Catalog>) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new().with_fallback_message(UNRESOLVED_CAPABILITY_MESSAGE);
    registry.register(Box::new(medication::GetMedicationByNameTool::new(catalog.clone())));
    registry.register(Box::new(medication::CheckStockTool::new(catalog.clone())));
    registry.register(Box::new(medication::CheckPrescriptionRequirementTool::new(
        catalog.clone(),
    )));
    registry.register(Box::new(medication::GetActiveIngredientsTool::new(catalog.clone())));
    registry.register(Box::new(medication::GetDosageInfoTool::new(catalog.clone())));
    registry.register(Box::new(users::GetUserByNameTool::new(catalog.clone())));
    registry.register(Box::new(users::ListUsersTool::new(catalog.clone())));
    registry.register(Box::new(users::GetUserMedicationsTool::new(catalog)));

    registry.validate(&CAPABILITY_NAMES)?;
    tracing::debug!(tools = registry.names().len(), "Capability table ready");
    Ok(registry)
}

/// Object schema with a single required string argument `name`.
pub(crate) fn name_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": description
            }
        },
        "required": ["name"]
    })
}

/// Extract the required `name` string argument.
pub(crate) fn name_argument(arguments: &serde_json::Value) -> Result<&str, ToolError> {
    arguments["name"]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'name' argument".into()))
}
