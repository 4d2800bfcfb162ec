//! Simulated deployments: slugs, build logs and URLs.

use uuid::Uuid;
use waypoint_db::models::DeploymentProvider;

use crate::agent::DeploymentOutcome;

const SLUG_MAX_LEN: usize = 30;

/// Project slug derived from a step title.
///
/// Lower-cases the title, replaces every character outside `[a-z0-9]` with
/// `-` and keeps the first 30 characters. Runs of separators are kept as is.
///
/// ```
/// use waypoint_core::templates::deployment_slug;
/// assert_eq!(
///     deployment_slug("Market Research & Validation!!"),
///     "market-research---validation--"
/// );
/// ```
pub fn deployment_slug(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .take(SLUG_MAX_LEN)
        .collect()
}

/// Multi-line build log for a deployment of `project` to `provider`.
pub fn build_log(provider: DeploymentProvider, project: &str) -> String {
    let name = provider.display_name();
    format!(
        "[1/5] Connecting to {name}...\n\
         [2/5] Uploading project files for {project}...\n\
         [3/5] Installing dependencies...\n\
         [4/5] Building production bundle...\n\
         [5/5] Deploying to {name} edge network...\n\
         Deployment complete."
    )
}

fn claim_host(provider: DeploymentProvider) -> &'static str {
    match provider {
        DeploymentProvider::Vercel => "vercel.com",
        DeploymentProvider::Netlify => "app.netlify.com",
        DeploymentProvider::GithubPages => "github.com",
    }
}

/// Simulated successful deployment of `project_name`.
///
/// `claim_id` goes into the claim URL; callers pass a fresh v4 id.
pub fn simulate_deployment(
    provider: DeploymentProvider,
    project_name: &str,
    claim_id: Uuid,
) -> DeploymentOutcome {
    let host = match project_name.trim_matches('-') {
        "" => "project",
        trimmed => trimmed,
    };
    DeploymentOutcome {
        deployment_url: Some(format!("https://{host}.{}", provider.host_suffix())),
        claim_url: Some(format!(
            "https://{}/claim/{claim_id}",
            claim_host(provider)
        )),
        success: true,
        logs: build_log(provider, project_name),
    }
}
