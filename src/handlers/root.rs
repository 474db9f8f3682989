use axum::response::IntoResponse;

pub async fn root_handler() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"Clubpass authentication service
Version: {version}

Available endpoints:
  - POST   /passkey/register/start      - Begin passkey registration
  - POST   /passkey/register/finish     - Complete passkey registration
  - POST   /passkey/auth/start          - Begin passkey authentication
  - POST   /passkey/auth/finish         - Complete passkey authentication
  - GET    /passkey/credentials         - List your registered passkeys
  - DELETE /passkey/credentials/{{id}}    - Remove one of your passkeys
  - POST   /password/register           - Create an account with a password
  - POST   /password/login              - Sign in with email and password
  - POST   /password/attach             - Add a password to your account
  - POST   /password/reset/request      - Request a password reset link
  - POST   /password/reset/confirm      - Redeem a reset token
  - POST   /session/start               - Mint an anonymous session
  - GET    /session/me                  - Inspect your session
  - POST   /session/logout              - Invalidate your session
  - GET    /health                      - Light health check
  - GET    /health?mode=full            - Full health check (includes Redis)
  - GET    /metrics                     - Prometheus metrics
"#
    )
}
