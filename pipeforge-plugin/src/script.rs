use tracing::info;

use pipeforge_common::{
    error::Error,
    pipeline::{Requirement, Step},
};

/// Fetches a reusable script body by URL.
/// ---
/// This is the one declared input-resolution fetch a template may
/// perform inside `apply`; any failure surfaces as the apply error,
/// the template must not return a partial graph around it.
pub async fn fetch_remote_script(url: &str) -> Result<String, Error> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::Internal(format!("failed to fetch script from {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::UpstreamHttp {
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::Internal(format!("failed to read script body from {}: {}", url, e)))?;

    info!(url, bytes = body.len(), "fetched remote script");
    Ok(body)
}

pub async fn step_from_remote_script(
    name: &str,
    url: &str,
    requirements: Vec<Requirement>,
) -> Result<Step, Error> {
    let script = fetch_remote_script(url).await?;
    Ok(Step::named(name, script, requirements))
}
