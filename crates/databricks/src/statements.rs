//! [`RecordStore`] backed by a Databricks SQL warehouse table.
//!
//! Values are always bound as named parameters; only the table name is
//! interpolated, and it is validated at construction.

use async_trait::async_trait;
use recipe_core::backends::RecordStore;
use recipe_core::error::CoreError;
use recipe_core::protocol::BackendError;

use crate::api::{DatabricksApi, StatementParameter, StatementRequest, StatementResponse};

/// Default Unity Catalog table holding uploaded images.
pub const DEFAULT_IMAGE_TABLE: &str = "workspace.default.uploaded_images_table";

const STATE_SUCCEEDED: &str = "SUCCEEDED";
const WAIT_TIMEOUT: &str = "30s";

/// Image records stored through the SQL Statement Execution API.
pub struct StatementRecordStore {
    api: DatabricksApi,
    warehouse_id: String,
    table: String,
}

impl StatementRecordStore {
    pub fn new(api: DatabricksApi, warehouse_id: String, table: &str) -> Result<Self, CoreError> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid {
            return Err(CoreError::Validation(format!(
                "Invalid table name '{table}'"
            )));
        }

        Ok(Self {
            api,
            warehouse_id,
            table: table.to_string(),
        })
    }

    fn request(&self, statement: String, parameters: Vec<StatementParameter>) -> StatementRequest {
        StatementRequest {
            statement,
            warehouse_id: self.warehouse_id.clone(),
            catalog: None,
            schema: None,
            parameters,
            wait_timeout: WAIT_TIMEOUT.to_string(),
        }
    }

    async fn run(&self, request: StatementRequest) -> Result<StatementResponse, BackendError> {
        let response = self.api.execute_statement(&request).await?;
        if response.status.state != STATE_SUCCEEDED {
            let detail = response
                .status
                .error
                .as_ref()
                .and_then(|e| e.message.clone())
                .unwrap_or_default();
            return Err(format!(
                "Statement {} finished in state {}: {detail}",
                response.statement_id, response.status.state
            )
            .into());
        }
        Ok(response)
    }
}

#[async_trait]
impl RecordStore for StatementRecordStore {
    async fn insert(&self, name: &str, base64_blob: &str) -> Result<(), BackendError> {
        tracing::info!(image_name = name, table = %self.table, "Inserting image record");

        let request = self.request(
            format!(
                "INSERT INTO {} (image_name, image_data) VALUES (:image_name, :image_data)",
                self.table
            ),
            vec![
                StatementParameter::string("image_name", name),
                StatementParameter::string("image_data", base64_blob),
            ],
        );
        self.run(request).await?;
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Option<String>, BackendError> {
        let request = self.request(
            format!(
                "SELECT image_data FROM {} WHERE image_name = :image_name LIMIT 1",
                self.table
            ),
            vec![StatementParameter::string("image_name", name)],
        );
        let response = self.run(request).await?;

        Ok(response
            .result
            .and_then(|r| r.data_array.into_iter().next())
            .and_then(|row| row.into_iter().next())
            .flatten())
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.run(self.request("SELECT 1".to_string(), Vec::new()))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    async fn store(server: &mockito::ServerGuard) -> StatementRecordStore {
        let api = DatabricksApi::new(server.url(), "t".into());
        StatementRecordStore::new(api, "wh-1".into(), DEFAULT_IMAGE_TABLE).unwrap()
    }

    #[test]
    fn table_names_with_sql_are_rejected() {
        let api = DatabricksApi::new("http://x".into(), "t".into());
        assert!(StatementRecordStore::new(api, "wh".into(), "t; DROP TABLE x").is_err());
    }

    #[tokio::test]
    async fn insert_binds_values_as_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/2.0/sql/statements")
            .match_body(Matcher::PartialJson(json!({
                "warehouse_id": "wh-1",
                "parameters": [
                    {"name": "image_name", "value": "o'brien.jpg", "type": "STRING"},
                    {"name": "image_data", "value": "AAAA", "type": "STRING"}
                ]
            })))
            .with_status(200)
            .with_body(r#"{"statement_id": "s1", "status": {"state": "SUCCEEDED"}}"#)
            .create_async()
            .await;

        store(&server).await.insert("o'brien.jpg", "AAAA").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_statement_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/2.0/sql/statements")
            .with_status(200)
            .with_body(
                r#"{"statement_id": "s2", "status": {"state": "FAILED", "error": {"message": "table not found"}}}"#,
            )
            .create_async()
            .await;

        let err = store(&server).await.insert("a.jpg", "AAAA").await.unwrap_err();
        assert!(err.to_string().contains("table not found"));
    }

    #[tokio::test]
    async fn fetch_reads_first_cell() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/2.0/sql/statements")
            .with_status(200)
            .with_body(
                r#"{"statement_id": "s3", "status": {"state": "SUCCEEDED"}, "result": {"data_array": [["QUJD"]]}}"#,
            )
            .create_async()
            .await;

        let blob = store(&server).await.fetch("cat.jpg").await.unwrap();
        assert_eq!(blob.as_deref(), Some("QUJD"));
    }

    #[tokio::test]
    async fn fetch_without_rows_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/2.0/sql/statements")
            .with_status(200)
            .with_body(r#"{"statement_id": "s4", "status": {"state": "SUCCEEDED"}, "result": {}}"#)
            .create_async()
            .await;

        assert!(store(&server).await.fetch("nope.jpg").await.unwrap().is_none());
    }
}
