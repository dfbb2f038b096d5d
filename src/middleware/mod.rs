pub mod auth;
pub mod response;
pub mod tenant_filter;

pub use auth::{api_token_middleware, AuthToken};
pub use response::{ApiResponse, ApiResult};
pub use tenant_filter::{apply_tenant_filter, tenant_filter_middleware, RequestQuery, TenantFilter, TenantFilterOutcome};
