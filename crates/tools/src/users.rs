//! Customer lookups.

use async_trait::async_trait;
use pillbox_core::error::ToolError;
use pillbox_core::tool::Tool;
use serde_json::json;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::{name_argument, name_schema};

pub struct GetUserByNameTool {
    catalog: Arc<Catalog>,
}

impl GetUserByNameTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for GetUserByNameTool {
    fn name(&self) -> &str {
        "get_user_by_name"
    }

    fn description(&self) -> &str {
        "Retrieve basic information about a user"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_schema("Full name of the user")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let name = name_argument(&arguments)?;
        Ok(match self.catalog.find_user(name) {
            Some(user) => json!({
                "name": user.name,
                "email": user.email,
                "age": user.age,
                "medication": user.medications,
            }),
            None => json!({ "error": "User not found" }),
        })
    }
}

pub struct ListUsersTool {
    catalog: Arc<Catalog>,
}

impl ListUsersTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for ListUsersTool {
    fn name(&self) -> &str {
        "list_users"
    }

    fn description(&self) -> &str {
        "Return a list of all synthetic users (for testing or conversation)"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let users: Vec<serde_json::Value> = self
            .catalog
            .users
            .iter()
            .map(|u| json!({ "name": u.name, "email": u.email }))
            .collect();
        Ok(serde_json::Value::Array(users))
    }
}

pub struct GetUserMedicationsTool {
    catalog: Arc<Catalog>,
}

impl GetUserMedicationsTool {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for GetUserMedicationsTool {
    fn name(&self) -> &str {
        "get_user_medications"
    }

    fn description(&self) -> &str {
        "Return the medications assigned to a specific user"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        name_schema("Full name of the user")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let name = name_argument(&arguments)?;
        Ok(match self.catalog.find_user(name) {
            Some(user) => json!({ "name": user.name, "medications": user.medications }),
            None => json!({ "error": "User not found" }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::builtin())
    }

    #[tokio::test]
    async fn user_by_name() {
        let tool = GetUserByNameTool::new(catalog());
        let result = tool.execute(json!({"name": "bob johnson"})).await.unwrap();
        assert_eq!(
            result,
            json!({
                "name": "Bob Johnson",
                "email": "bob@example.com",
                "age": 35,
                "medication": ["amoxicillin"],
            })
        );

        let result = tool.execute(json!({"name": "Nobody"})).await.unwrap();
        assert_eq!(result, json!({"error": "User not found"}));
    }

    #[tokio::test]
    async fn list_users_returns_names_and_emails() {
        let tool = ListUsersTool::new(catalog());
        let result = tool.execute(json!({})).await.unwrap();
        let users = result.as_array().unwrap();
        assert_eq!(users.len(), 10);
        assert_eq!(users[0], json!({"name": "Alice Smith", "email": "alice@example.com"}));
        assert!(users.iter().all(|u| u.get("age").is_none()));
    }

    #[tokio::test]
    async fn user_medications() {
        let tool = GetUserMedicationsTool::new(catalog());
        let result = tool.execute(json!({"name": "David Schwartzman"})).await.unwrap();
        assert_eq!(result["medications"], json!(["metformin", "aspirin"]));

        let result = tool.execute(json!({"name": 42})).await;
        assert!(result.is_err());
    }
}
