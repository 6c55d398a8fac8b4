//! HTTP status and transport error mapping shared by the API backends.

use knowdebug_core::GeneratorError;

/// Seconds to wait when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub(crate) fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .expect("failed to build HTTP client")
}

pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> GeneratorError {
    if e.is_timeout() {
        GeneratorError::Timeout(timeout_secs)
    } else {
        GeneratorError::NetworkError(e.to_string())
    }
}

/// Pass successful responses through; turn error statuses into a
/// [`GeneratorError`] the driver can classify.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, GeneratorError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }
    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
            * 1000;
        return Err(GeneratorError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        401 | 403 => GeneratorError::AuthenticationFailed(body),
        404 => GeneratorError::ModelNotFound(model.to_string()),
        _ => GeneratorError::ApiError {
            status,
            message: body,
        },
    })
}
