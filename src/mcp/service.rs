//! MCP service implementation using rmcp.
//!
//! This module defines the DbAgentService struct with the four database
//! tools exposed via the MCP protocol using the rmcp framework's macros.

use crate::db::{DatabasePool, QueryExecutor};
use crate::error::DbError;
use crate::tools::query::{QueryDatabaseInput, QueryDatabaseOutput, QueryToolHandler};
use crate::tools::schema::{
    ListColumnsInput, ListColumnsOutput, ListDatabasesOutput, ListTablesInput, ListTablesOutput,
    SchemaToolHandler,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use std::time::Duration;

/// Per-server knobs the tools need beyond the pool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSettings {
    pub query_timeout: Duration,
    /// Include raw error messages in `query_database` failures
    pub expose_error_detail: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(crate::config::DEFAULT_QUERY_TIMEOUT_SECS),
            expose_error_detail: false,
        }
    }
}

#[derive(Clone)]
pub struct DbAgentService {
    /// Shared pool, created at startup and closed on shutdown
    pool: Arc<DatabasePool>,
    settings: ToolSettings,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbAgentService {
    pub fn new(pool: Arc<DatabasePool>, settings: ToolSettings) -> Self {
        Self {
            pool,
            settings,
            tool_router: Self::tool_router(),
        }
    }

    pub fn pool(&self) -> &Arc<DatabasePool> {
        &self.pool
    }

    fn schema_handler(&self) -> SchemaToolHandler {
        SchemaToolHandler::new(self.pool.clone(), self.settings.query_timeout)
    }

    fn query_handler(&self) -> QueryToolHandler {
        QueryToolHandler::new(
            self.pool.clone(),
            QueryExecutor::new(self.settings.query_timeout),
            self.settings.expose_error_detail,
        )
    }
}

#[tool_router]
impl DbAgentService {
    #[tool(
        description = "List the databases on the server that accept connections (templates excluded)."
    )]
    async fn list_databases(&self) -> Result<Json<ListDatabasesOutput>, McpError> {
        self.schema_handler()
            .list_databases()
            .await
            .map(Json)
            .map_err(|e: DbError| e.into())
    }

    #[tool(
        description = "List the base tables in a schema, sorted by name.\n`schema` defaults to \"public\"."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        self.schema_handler()
            .list_tables(input)
            .await
            .map(Json)
            .map_err(|e: DbError| e.into())
    }

    #[tool(
        description = "List the columns of a table in declaration order.\nReturns column_name, data_type and is_nullable (\"YES\"/\"NO\").\n`tableName` is required; `schema` defaults to \"public\"."
    )]
    async fn list_columns(
        &self,
        Parameters(input): Parameters<ListColumnsInput>,
    ) -> Result<Json<ListColumnsOutput>, McpError> {
        self.schema_handler()
            .list_columns(input)
            .await
            .map(Json)
            .map_err(|e: DbError| e.into())
    }

    #[tool(
        description = "Run a single read-only SELECT statement and return at most 1000 rows.\nThe query must start with SELECT. One trailing semicolon is allowed; any other semicolon is rejected.\nReturns {ok: true, fields, results, meta: {row_count, truncated}} or {ok: false, error}."
    )]
    async fn query_database(
        &self,
        Parameters(input): Parameters<QueryDatabaseInput>,
    ) -> Result<Json<QueryDatabaseOutput>, McpError> {
        QueryToolHandler::check_input(&input).map_err(McpError::from)?;
        Ok(Json(self.query_handler().query_database(input).await))
    }
}

#[tool_handler]
impl ServerHandler for DbAgentService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "db-agent-mcp".to_owned(),
                title: Some("DB Agent MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Inspect the PostgreSQL database schema and run safe read-only queries.\n\
                \n\
                ## Workflow\n\
                1. Call `list_tables` (schema defaults to \"public\") to see what exists\n\
                2. Call `list_columns` with `tableName` before writing a query\n\
                3. Call `query_database` with a single SELECT statement\n\
                \n\
                ## Query Rules\n\
                - Only statements beginning with SELECT are accepted (CTEs starting with WITH are not)\n\
                - No semicolons, except one at the very end\n\
                - At most 1000 rows are returned; `meta.truncated` tells you if more existed\n\
                - Failures come back as `ok: false` with a generic `error` message"
                    .to_string(),
            ),
        }
    }
}
