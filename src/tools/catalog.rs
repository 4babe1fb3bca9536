//! Administrative operations over stored tools.

use crate::error::ToolError;
use crate::state::{NameTaken, ToolStore};
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Tool fields as submitted by an administrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub endpoint_url: String,
    pub http_method: String,
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub auth_config: Option<String>,
    #[serde(default)]
    pub request_template: Option<String>,
    #[serde(default)]
    pub response_mapping: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub tool_type: Option<String>,
}

/// Tool as returned to administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub endpoint_url: String,
    pub http_method: Option<HttpMethod>,
    pub auth_type: AuthType,
    pub auth_config: Option<String>,
    pub request_template: Option<String>,
    pub response_mapping: Option<String>,
    pub is_active: bool,
    pub tool_type: String,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ToolDefinition> for ToolView {
    fn from(tool: ToolDefinition) -> Self {
        Self {
            id: tool.id,
            name: tool.name,
            description: tool.description,
            endpoint_url: tool.endpoint_url,
            http_method: tool.http_method,
            auth_type: tool.auth_type,
            auth_config: tool.auth_config,
            request_template: tool.request_template,
            response_mapping: tool.response_mapping,
            is_active: tool.is_active,
            tool_type: tool.tool_type,
            usage_count: tool.usage_count,
            last_used_at: tool.last_used_at,
            created_at: tool.created_at,
            updated_at: tool.updated_at,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ToolDraft {
    /// Copy the draft's fields onto `tool`, validating enums and required fields.
    fn apply_to(self, tool: &mut ToolDefinition) -> Result<(), ToolError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ToolError::Configuration("tool name must not be empty".into()));
        }
        if self.endpoint_url.trim().is_empty() {
            return Err(ToolError::Configuration(
                "tool endpoint URL must not be empty".into(),
            ));
        }

        let http_method = self
            .http_method
            .parse::<HttpMethod>()
            .map_err(ToolError::Configuration)?;
        let auth_type = match non_blank(self.auth_type) {
            Some(raw) => raw.parse::<AuthType>().map_err(ToolError::Configuration)?,
            None => AuthType::None,
        };

        tool.name = name.to_string();
        tool.description = self.description.unwrap_or_default();
        tool.endpoint_url = self.endpoint_url.trim().to_string();
        tool.http_method = Some(http_method);
        tool.auth_type = auth_type;
        tool.auth_config = non_blank(self.auth_config);
        tool.request_template = non_blank(self.request_template);
        tool.response_mapping = non_blank(self.response_mapping);
        tool.is_active = self.is_active.unwrap_or(true);
        tool.tool_type = non_blank(self.tool_type).unwrap_or_else(|| DEFAULT_TOOL_TYPE.into());
        tool.updated_at = Utc::now();
        Ok(())
    }
}

/// Create/update/delete/list operations for tool definitions.
#[derive(Clone)]
pub struct ToolCatalog {
    store: Arc<dyn ToolStore>,
}

impl ToolCatalog {
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }

    /// Register a new tool.
    pub async fn save(&self, draft: ToolDraft) -> Result<ToolView, ToolError> {
        let mut tool = ToolDefinition::new(&draft.name, &draft.endpoint_url);
        draft.apply_to(&mut tool)?;
        self.ensure_name_free(&tool.name, None).await?;

        let saved = self.persist(tool).await?;
        info!("Saved external tool: {}", saved.name);
        Ok(saved.into())
    }

    /// Replace every editable field of an existing tool.
    ///
    /// Identity, creation time and usage statistics are kept.
    pub async fn update(&self, id: &str, draft: ToolDraft) -> Result<ToolView, ToolError> {
        let mut tool = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ToolError::NotFound(id.to_string()))?;
        draft.apply_to(&mut tool)?;
        self.ensure_name_free(&tool.name, Some(id)).await?;

        let saved = self.persist(tool).await?;
        info!("Updated external tool: {}", saved.name);
        Ok(saved.into())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ToolError> {
        if !self.store.delete(id).await? {
            return Err(ToolError::NotFound(id.to_string()));
        }
        info!("Deleted external tool with id: {}", id);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<ToolView, ToolError> {
        self.store
            .find_by_id(id)
            .await?
            .map(ToolView::from)
            .ok_or_else(|| ToolError::NotFound(id.to_string()))
    }

    /// Active tools ordered by name.
    pub async fn list_active(&self) -> Result<Vec<ToolView>, ToolError> {
        let tools = self.store.list_active().await?;
        info!("Retrieved {} active tools", tools.len());
        Ok(tools.into_iter().map(ToolView::from).collect())
    }

    /// Tools in one category, most used first.
    pub async fn list_by_type(&self, tool_type: &str) -> Result<Vec<ToolView>, ToolError> {
        let tools = self.store.list_by_type(tool_type).await?;
        Ok(tools.into_iter().map(ToolView::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<ToolView>, ToolError> {
        let tools = self.store.list_all().await?;
        Ok(tools.into_iter().map(ToolView::from).collect())
    }

    /// Register a REST server as a directive-callable POST tool whose
    /// `result` field is handed back to the chat.
    pub async fn create_rest_wrapper(&self, url: &str, name: &str) -> Result<ToolView, ToolError> {
        let draft = ToolDraft {
            name: name.to_string(),
            description: Some(format!("Wrapper for REST server: {url}")),
            endpoint_url: url.to_string(),
            http_method: HttpMethod::Post.to_string(),
            auth_type: Some(AuthType::None.to_string()),
            request_template: Some(r#"{"query": "{{input}}", "mcp_enabled": true}"#.into()),
            response_mapping: Some(r#"{"extract": "/result"}"#.into()),
            is_active: Some(true),
            tool_type: Some(REST_WRAPPER_TOOL_TYPE.into()),
            ..ToolDraft::default()
        };
        self.save(draft).await
    }

    /// Save through the store. A name claimed by a concurrent write since
    /// the pre-check still surfaces as [`ToolError::DuplicateName`].
    async fn persist(&self, tool: ToolDefinition) -> Result<ToolDefinition, ToolError> {
        self.store.save(tool).await.map_err(|e| match e.downcast::<NameTaken>() {
            Ok(NameTaken(name)) => ToolError::DuplicateName(name),
            Err(e) => ToolError::Storage(e),
        })
    }

    async fn ensure_name_free(&self, name: &str, own_id: Option<&str>) -> Result<(), ToolError> {
        match self.store.find_by_name(name).await? {
            Some(existing) if Some(existing.id.as_str()) != own_id => {
                Err(ToolError::DuplicateName(existing.name))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SqliteToolStore;
    use async_trait::async_trait;

    /// Store whose name lookup never sees existing tools, as when another
    /// writer commits between the catalog's check and its save.
    struct LateNameStore(SqliteToolStore);

    #[async_trait]
    impl ToolStore for LateNameStore {
        async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<ToolDefinition>> {
            self.0.find_by_id(id).await
        }
        async fn find_by_name(&self, _name: &str) -> anyhow::Result<Option<ToolDefinition>> {
            Ok(None)
        }
        async fn record_usage(&self, id: &str) -> anyhow::Result<()> {
            self.0.record_usage(id).await
        }
        async fn save(&self, tool: ToolDefinition) -> anyhow::Result<ToolDefinition> {
            self.0.save(tool).await
        }
        async fn delete(&self, id: &str) -> anyhow::Result<bool> {
            self.0.delete(id).await
        }
        async fn list_active(&self) -> anyhow::Result<Vec<ToolDefinition>> {
            self.0.list_active().await
        }
        async fn list_by_type(&self, tool_type: &str) -> anyhow::Result<Vec<ToolDefinition>> {
            self.0.list_by_type(tool_type).await
        }
        async fn list_all(&self) -> anyhow::Result<Vec<ToolDefinition>> {
            self.0.list_all().await
        }
    }

    fn catalog() -> ToolCatalog {
        ToolCatalog::new(Arc::new(SqliteToolStore::in_memory().unwrap()))
    }

    fn draft(name: &str) -> ToolDraft {
        ToolDraft {
            name: name.into(),
            endpoint_url: "https://example.com/api".into(),
            http_method: "post".into(),
            ..ToolDraft::default()
        }
    }

    #[tokio::test]
    async fn save_applies_defaults() {
        let view = catalog().save(draft("Search")).await.unwrap();
        assert_eq!(view.http_method, Some(HttpMethod::Post));
        assert_eq!(view.auth_type, AuthType::None);
        assert!(view.is_active);
        assert_eq!(view.tool_type, "API");
        assert_eq!(view.usage_count, 0);
    }

    #[tokio::test]
    async fn save_rejects_unknown_enums() {
        let cat = catalog();
        let mut bad_method = draft("A");
        bad_method.http_method = "TRACE".into();
        assert!(matches!(
            cat.save(bad_method).await,
            Err(ToolError::Configuration(_))
        ));

        let mut bad_auth = draft("B");
        bad_auth.auth_type = Some("KERBEROS".into());
        assert!(matches!(
            cat.save(bad_auth).await,
            Err(ToolError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_ignoring_case() {
        let cat = catalog();
        cat.save(draft("Weather")).await.unwrap();
        assert!(matches!(
            cat.save(draft("WEATHER")).await,
            Err(ToolError::DuplicateName(name)) if name == "Weather"
        ));
    }

    #[tokio::test]
    async fn update_replaces_fields_but_keeps_identity_and_usage() {
        let store = Arc::new(SqliteToolStore::in_memory().unwrap());
        let cat = ToolCatalog::new(store.clone());
        let created = cat.save(draft("Search")).await.unwrap();
        store.record_usage(&created.id).await.unwrap();

        let mut changed = draft("search");
        changed.http_method = "GET".into();
        changed.is_active = Some(false);
        changed.description = Some("renamed".into());
        let updated = cat.update(&created.id, changed).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "search");
        assert_eq!(updated.http_method, Some(HttpMethod::Get));
        assert!(!updated.is_active);
        assert_eq!(updated.usage_count, 1);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn name_claimed_after_the_check_is_still_a_duplicate() {
        let store = LateNameStore(SqliteToolStore::in_memory().unwrap());
        let cat = ToolCatalog::new(Arc::new(store));
        cat.save(draft("Weather")).await.unwrap();

        assert!(matches!(
            cat.save(draft("weather")).await,
            Err(ToolError::DuplicateName(name)) if name == "weather"
        ));
        let other = cat.save(draft("Other")).await.unwrap();
        assert!(matches!(
            cat.update(&other.id, draft("WEATHER")).await,
            Err(ToolError::DuplicateName(_))
        ));
        assert_eq!(cat.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_cannot_steal_another_name() {
        let cat = catalog();
        cat.save(draft("One")).await.unwrap();
        let two = cat.save(draft("Two")).await.unwrap();
        assert!(matches!(
            cat.update(&two.id, draft("one")).await,
            Err(ToolError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn update_and_delete_missing_tool_are_not_found() {
        let cat = catalog();
        assert!(matches!(
            cat.update("nope", draft("X")).await,
            Err(ToolError::NotFound(_))
        ));
        assert!(matches!(cat.delete("nope").await, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_tool() {
        let cat = catalog();
        let tool = cat.save(draft("Temp")).await.unwrap();
        cat.delete(&tool.id).await.unwrap();
        assert!(matches!(cat.get(&tool.id).await, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn listing_by_active_and_type() {
        let cat = catalog();
        cat.save(draft("b-tool")).await.unwrap();
        let mut inactive = draft("a-tool");
        inactive.is_active = Some(false);
        cat.save(inactive).await.unwrap();
        cat.create_rest_wrapper("https://rest.example.com/ask", "Ask")
            .await
            .unwrap();

        let active: Vec<_> = cat
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(active, vec!["Ask", "b-tool"]);

        let wrappers = cat.list_by_type(REST_WRAPPER_TOOL_TYPE).await.unwrap();
        assert_eq!(wrappers.len(), 1);
        assert_eq!(cat.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rest_wrapper_is_preconfigured() {
        let view = catalog()
            .create_rest_wrapper("https://rest.example.com/ask", "Ask")
            .await
            .unwrap();
        assert_eq!(view.http_method, Some(HttpMethod::Post));
        assert_eq!(view.tool_type, REST_WRAPPER_TOOL_TYPE);
        assert_eq!(
            view.request_template.as_deref(),
            Some(r#"{"query": "{{input}}", "mcp_enabled": true}"#)
        );
        assert_eq!(
            view.response_mapping.as_deref(),
            Some(r#"{"extract": "/result"}"#)
        );
    }

    #[test]
    fn draft_accepts_camel_case_json() {
        let draft: ToolDraft = serde_json::from_str(
            r#"{"name":"W","endpointUrl":"https://w","httpMethod":"GET","authType":"API_KEY",
                "authConfig":"{\"apiKey\":\"k\"}","isActive":false,"toolType":"MCP"}"#,
        )
        .unwrap();
        assert_eq!(draft.endpoint_url, "https://w");
        assert_eq!(draft.auth_type.as_deref(), Some("API_KEY"));
        assert_eq!(draft.is_active, Some(false));
    }
}
