//! Medication lookups: product info, stock, prescription status, active
//! ingredients, and dosage.
//!
//! "Not found" is an answer, not a failure: these tools return a marker
//! payload (`{error: ..}` or `{message: ..}`) for unknown medications and
//! only fail on a missing `name` argument.

use async_trait::async_trait;
use pillbox_core::error::ToolError;
use pillbox_core::tool::Tool;
use serde_json::json;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::{name_argument, name_schema};

pub struct GetMedicationByNameTool {
    catalog: Arc<Catalog>,
}

impl GetMedicationByNameTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for GetMedicationByNameTool {
    fn name(&self) -> &str {
        "get_medication_by_name"
    }

    fn description(&self) -> &str {
        "Retrieve factual medication info"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_schema("Name of the medication")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let name = name_argument(&arguments)?;
        Ok(match self.catalog.find_medication(name) {
            Some(med) => json!({
                "name": med.name,
                "active_ingredient": med.active_ingredient,
                "prescription_required": med.prescription_required,
                "dosage_text": med.dosage_text,
            }),
            None => json!({ "error": "We don't sell this medication in our pharmacy" }),
        })
    }
}

pub struct CheckStockTool {
    catalog: Arc<Catalog>,
}

impl CheckStockTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for CheckStockTool {
    fn name(&self) -> &str {
        "check_stock"
    }

    fn description(&self) -> &str {
        "Check stock availability of medication"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_schema("Name of the medication")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let name = name_argument(&arguments)?;
        // Echo the name as asked; unknown items read as zero on hand.
        Ok(match self.catalog.stock_of(name) {
            Some(quantity) => json!({ "name": name, "quantity": quantity, "available": true }),
            None => json!({ "name": name, "quantity": 0, "available": false }),
        })
    }
}

pub struct CheckPrescriptionRequirementTool {
    catalog: Arc<Catalog>,
}

impl CheckPrescriptionRequirementTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for CheckPrescriptionRequirementTool {
    fn name(&self) -> &str {
        "check_prescription_requirement"
    }

    fn description(&self) -> &str {
        "Check if a prescription is required for a medication"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_schema("Name of the medication")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let name = name_argument(&arguments)?;
        Ok(match self.catalog.find_medication(name) {
            Some(med) => json!({ "name": name, "required": med.prescription_required }),
            None => json!({
                "name": name,
                "message": "We don't have this medication in our store.",
            }),
        })
    }
}

pub struct GetActiveIngredientsTool {
    catalog: Arc<Catalog>,
}

impl GetActiveIngredientsTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for GetActiveIngredientsTool {
    fn name(&self) -> &str {
        "get_active_ingredients"
    }

    fn description(&self) -> &str {
        "Get active ingredients of a medication"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_schema("Name of the medication")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let name = name_argument(&arguments)?;
        Ok(match self.catalog.find_medication(name) {
            Some(med) => json!({ "name": med.name, "active_ingredient": med.active_ingredient }),
            None => json!({ "error": "Medication not found" }),
        })
    }
}

pub struct GetDosageInfoTool {
    catalog: Arc<Catalog>,
}

impl GetDosageInfoTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for GetDosageInfoTool {
    fn name(&self) -> &str {
        "get_dosage_info"
    }

    fn description(&self) -> &str {
        "Return dosage and usage instructions for a medication"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_schema("Name of the medication")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let name = name_argument(&arguments)?;
        Ok(match self.catalog.find_medication(name) {
            Some(med) => json!({ "name": med.name, "dosage_text": med.dosage_text }),
            None => json!({ "error": "Medication not found" }),
        })
    }
}
