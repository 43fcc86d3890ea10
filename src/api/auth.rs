//! Login, registration, verification, and token-refresh calls against the
//! Memo auth endpoints. These functions centralize payload construction and
//! error mapping so session code never touches raw responses, and they must
//! never log credentials or token material.

use crate::api::{client, endpoint_url, error_from_response, map_request_error};
use crate::session::{SessionError, TokenPair};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, info_span, Instrument};

fn token_pair_from(json: &Value) -> Result<TokenPair, SessionError> {
    let access = json
        .get("accessToken")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SessionError::Parse("Error parsing JSON response: no accessToken found".to_string())
        })?;

    let refresh = json
        .get("refreshToken")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SessionError::Parse("Error parsing JSON response: no refreshToken found".to_string())
        })?;

    Ok(TokenPair::new(access, refresh))
}

/// Exchange credentials for a token pair.
///
/// # Errors
/// Returns an error if the request fails, the server rejects the
/// credentials, or the `{data:{accessToken,refreshToken}}` envelope is
/// missing expected fields.
pub async fn login(
    base_url: &str,
    email: &str,
    password: &SecretString,
) -> Result<TokenPair, SessionError> {
    let client = client()?;
    let login_url = endpoint_url(base_url, "/auth/login")?;

    let payload = json!({
        "email": email,
        "password": password.expose_secret(),
    });

    let span = info_span!(
        "memo.login",
        http.method = "POST",
        url = %login_url
    );
    let response = client
        .post(&login_url)
        .json(&payload)
        .send()
        .instrument(span)
        .await
        .map_err(|err| map_request_error(&login_url, &err))?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Login failed").await);
    }

    let json_response: Value = response
        .json()
        .await
        .map_err(|err| SessionError::Parse(format!("Failed to decode response: {err}")))?;

    let data = json_response
        .get("data")
        .ok_or_else(|| SessionError::Parse("Error parsing JSON response: no data found".to_string()))?;

    token_pair_from(data)
}

/// Create an account. The server issues no session data on success; the
/// caller is expected to chain a verification mail.
///
/// # Errors
/// Returns an error if the request fails or the server rejects the
/// registration.
pub async fn register(
    base_url: &str,
    email: &str,
    password: &SecretString,
    first_name: &str,
    last_name: &str,
) -> Result<(), SessionError> {
    let client = client()?;
    let register_url = endpoint_url(base_url, "/auth/register")?;

    // The endpoint expects the confirmation field even though equality was
    // already checked locally.
    let payload = json!({
        "email": email,
        "password": password.expose_secret(),
        "confirmPassword": password.expose_secret(),
        "firstName": first_name,
        "lastName": last_name,
    });

    let span = info_span!(
        "memo.register",
        http.method = "POST",
        url = %register_url
    );
    let response = client
        .post(&register_url)
        .json(&payload)
        .send()
        .instrument(span)
        .await
        .map_err(|err| map_request_error(&register_url, &err))?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Registration failed").await);
    }

    Ok(())
}

/// Ask the server to (re)send a verification mail.
///
/// # Errors
/// Returns an error if the request fails or the server rejects it.
pub async fn send_verification_mail(base_url: &str, email: &str) -> Result<(), SessionError> {
    let client = client()?;
    let mail_url = endpoint_url(base_url, "/auth/send-verification-mail")?;

    let payload = json!({ "email": email });

    let span = info_span!(
        "memo.send_verification_mail",
        http.method = "POST",
        url = %mail_url
    );
    let response = client
        .post(&mail_url)
        .json(&payload)
        .send()
        .instrument(span)
        .await
        .map_err(|err| map_request_error(&mail_url, &err))?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Verification mail failed").await);
    }

    Ok(())
}

/// Exchange a verification token for confirmation. The response payload is
/// returned verbatim; an empty body reads as `null`.
///
/// # Errors
/// Returns an error if the request fails, the server rejects the token, or
/// a non-empty response body is not JSON.
pub async fn verify_email(base_url: &str, token: &str) -> Result<Value, SessionError> {
    let client = client()?;
    let verify_url = endpoint_url(base_url, "/auth/verify-email")?;

    let payload = json!({ "token": token });

    let span = info_span!(
        "memo.verify_email",
        http.method = "POST",
        url = %verify_url
    );
    let response = client
        .post(&verify_url)
        .json(&payload)
        .send()
        .instrument(span)
        .await
        .map_err(|err| map_request_error(&verify_url, &err))?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Verification failed").await);
    }

    let body = response
        .text()
        .await
        .map_err(|err| SessionError::Parse(format!("Failed to decode response: {err}")))?;

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body)
        .map_err(|err| SessionError::Parse(format!("Failed to decode response: {err}")))
}

/// Trade a refresh token for a rotated pair. Unlike login, the response is
/// the flat `{accessToken,refreshToken}` shape.
///
/// # Errors
/// Returns an error if the request fails, the server rejects the refresh
/// token, or the response is missing expected fields.
pub async fn refresh_token(
    base_url: &str,
    refresh_token: &SecretString,
) -> Result<TokenPair, SessionError> {
    let client = client()?;
    let refresh_url = endpoint_url(base_url, "/auth/refresh-token")?;

    let payload = json!({
        "refreshToken": refresh_token.expose_secret(),
    });

    let span = info_span!(
        "memo.refresh_token",
        http.method = "POST",
        url = %refresh_url
    );
    let response = client
        .post(&refresh_url)
        .json(&payload)
        .send()
        .instrument(span)
        .await
        .map_err(|err| map_request_error(&refresh_url, &err))?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Failed to refresh token").await);
    }

    let json_response: Value = response
        .json()
        .await
        .map_err(|err| SessionError::Parse(format!("Failed to decode response: {err}")))?;

    debug!("refresh token rotated");

    token_pair_from(&json_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use secrecy::ExposeSecret;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[tokio::test]
    async fn login_returns_token_pair() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let password = SecretString::from("pw1".to_string());

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({
                "email": "a@x.com",
                "password": "pw1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"accessToken": "AT1", "refreshToken": "RT1"}
            })))
            .mount(&server)
            .await;

        let tokens = login(&server.uri(), "a@x.com", &password).await?;
        assert_eq!(tokens.access_token().expose_secret(), "AT1");
        assert_eq!(tokens.refresh_token().expose_secret(), "RT1");
        Ok(())
    }

    #[tokio::test]
    async fn login_surfaces_server_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let password = SecretString::from("pw1".to_string());

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Invalid credentials"
            })))
            .mount(&server)
            .await;

        let result = login(&server.uri(), "a@x.com", &password).await;
        let err = result.err().ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.to_string().contains("Invalid credentials"));
        Ok(())
    }

    #[tokio::test]
    async fn login_falls_back_to_generic_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let password = SecretString::from("pw1".to_string());

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = login(&server.uri(), "a@x.com", &password).await;
        let err = result.err().ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.to_string().contains("Login failed"));
        Ok(())
    }

    #[tokio::test]
    async fn login_errors_on_missing_tokens() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let password = SecretString::from("pw1".to_string());

        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"accessToken": "AT1"}
            })))
            .mount(&server)
            .await;

        let result = login(&server.uri(), "a@x.com", &password).await;
        let err = result.err().ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.to_string().contains("no refreshToken found"));
        Ok(())
    }

    #[tokio::test]
    async fn register_posts_full_payload() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let password = SecretString::from("pw1".to_string());

        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .and(body_json(json!({
                "email": "a@x.com",
                "password": "pw1",
                "confirmPassword": "pw1",
                "firstName": "Jane",
                "lastName": "Doe"
            })))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        register(&server.uri(), "a@x.com", &password, "Jane", "Doe").await?;
        Ok(())
    }

    #[tokio::test]
    async fn register_surfaces_server_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let password = SecretString::from("pw1".to_string());

        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "message": "Email already registered"
            })))
            .mount(&server)
            .await;

        let result = register(&server.uri(), "a@x.com", &password, "Jane", "Doe").await;
        let err = result.err().ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.to_string().contains("Email already registered"));
        Ok(())
    }

    #[tokio::test]
    async fn send_verification_mail_posts_email() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/send-verification-mail"))
            .and(body_json(json!({ "email": "a@x.com" })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        send_verification_mail(&server.uri(), "a@x.com").await?;
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_returns_payload() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/verify-email"))
            .and(body_json(json!({ "token": "verify-123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Email verified"
            })))
            .mount(&server)
            .await;

        let payload = verify_email(&server.uri(), "verify-123").await?;
        assert_eq!(
            payload.get("message").and_then(Value::as_str),
            Some("Email verified")
        );
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_tolerates_empty_body() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/verify-email"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let payload = verify_email(&server.uri(), "verify-123").await?;
        assert!(payload.is_null());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_token_parses_flat_shape() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let refresh = SecretString::from("RT1".to_string());

        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .and(body_json(json!({ "refreshToken": "RT1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": "AT2",
                "refreshToken": "RT2"
            })))
            .mount(&server)
            .await;

        let tokens = refresh_token(&server.uri(), &refresh).await?;
        assert_eq!(tokens.access_token().expose_secret(), "AT2");
        assert_eq!(tokens.refresh_token().expose_secret(), "RT2");
        Ok(())
    }

    #[tokio::test]
    async fn refresh_token_errors_on_rejection() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let refresh = SecretString::from("RT1".to_string());

        Mock::given(method("POST"))
            .and(path("/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = refresh_token(&server.uri(), &refresh).await;
        let err = result.err().ok_or_else(|| anyhow!("expected error"))?;
        assert!(err.is_unauthorized());
        Ok(())
    }
}
