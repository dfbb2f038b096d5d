use serde::Serialize;
use serde_json::Value;

use super::error::MaintenanceResult;
use crate::database::{ContentStore, StoreError};
use crate::models::{ApiToken, Collection};

/// A freshly stored token; `secret` is never persisted
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub id: i64,
    pub name: String,
    pub secret: String,
}

pub async fn create_token(store: &dyn ContentStore, name: &str, description: &str) -> MaintenanceResult<IssuedToken> {
    let (token, secret) = ApiToken::issue(name, description);
    let data = match serde_json::to_value(&token).map_err(StoreError::from)? {
        Value::Object(map) => map,
        _ => return Err(StoreError::InvalidDocument("token did not serialize to an object".into()).into()),
    };
    let document = store.create(Collection::ApiTokens, data).await?;
    Ok(IssuedToken {
        id: document.id,
        name: token.name,
        secret,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{auth::authenticate, AuthToken};
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn issued_secret_authenticates() {
        let store = MemoryStore::new();
        let issued = create_token(&store, "deploy", "CI pipeline").await.unwrap();

        let doc = store.find_by_id(Collection::ApiTokens, issued.id).await.unwrap().unwrap();
        assert_ne!(doc.draft["accessKey"], Value::String(issued.secret.clone()));

        let auth = authenticate(&store, &[], &issued.secret).await.unwrap();
        assert!(matches!(auth, Some(AuthToken::Stored(name)) if name == "deploy"));
    }
}
