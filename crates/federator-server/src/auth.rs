//! Bearer-token authentication for every inbound call. Every RPC handler calls
//! [`authenticate`] before touching Kafka or the filesystem; authorisation is always
//! evaluated before any data byte is emitted, per the error-mapping table in
//! `federator_common::error`.

use federator_token_service::{Claims, TokenService};
use tonic::{Request, Status};

pub struct AuthenticatedCaller {
    pub client_id: String,
}

pub async fn authenticate<T>(
    token_service: &dyn TokenService,
    request: &Request<T>,
) -> Result<AuthenticatedCaller, Status> {
    let header = request
        .metadata()
        .get("authorization")
        .ok_or_else(|| Status::unauthenticated("missing authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| Status::unauthenticated("malformed authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Status::unauthenticated("expected a Bearer token"))?;

    let claims: Claims = token_service
        .verify_token(token)
        .await
        .map_err(|e| Status::from(&e))?;

    let client_id = claims
        .client_id()
        .ok_or_else(|| Status::unauthenticated("token is missing a client id claim"))?
        .to_string();

    Ok(AuthenticatedCaller { client_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use federator_common::FederatorError;
    use serde_json::json;

    struct FakeTokenService {
        client_id: Option<String>,
    }

    #[async_trait]
    impl TokenService for FakeTokenService {
        async fn fetch_token(&self) -> Result<String, FederatorError> {
            unimplemented!("not exercised by these tests")
        }

        async fn verify_token(&self, _token: &str) -> Result<Claims, FederatorError> {
            match &self.client_id {
                Some(client_id) => Ok(Claims {
                    sub: Some("subject".to_string()),
                    iss: Some("https://idp.example".to_string()),
                    exp: Some(0),
                    azp: Some(client_id.clone()),
                    client_id: None,
                    aud: Some(json!("federator-server")),
                }),
                None => Err(FederatorError::Unauthenticated("invalid token".to_string())),
            }
        }
    }

    fn request_with_header(value: Option<&str>) -> Request<()> {
        let mut request = Request::new(());
        if let Some(value) = value {
            request
                .metadata_mut()
                .insert("authorization", value.parse().unwrap());
        }
        request
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let service = FakeTokenService { client_id: Some("consumer-a".to_string()) };
        let request = request_with_header(None);
        let err = authenticate(&service, &request).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let service = FakeTokenService { client_id: Some("consumer-a".to_string()) };
        let request = request_with_header(Some("Basic dXNlcjpwYXNz"));
        let err = authenticate(&service, &request).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }

    #[tokio::test]
    async fn valid_token_yields_client_id() {
        let service = FakeTokenService { client_id: Some("consumer-a".to_string()) };
        let request = request_with_header(Some("Bearer a.b.c"));
        let caller = authenticate(&service, &request).await.unwrap();
        assert_eq!(caller.client_id, "consumer-a");
    }

    #[tokio::test]
    async fn rejected_token_propagates_verification_error() {
        let service = FakeTokenService { client_id: None };
        let request = request_with_header(Some("Bearer a.b.c"));
        let err = authenticate(&service, &request).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }
}
