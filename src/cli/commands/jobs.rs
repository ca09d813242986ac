//! Job producer and inspection commands.

use super::backends;
use crate::config::Settings;
use crate::models::{Job, JobType};
use crate::repository::PipelineRepository;
use crate::worker::{cancel_job, submit_job};

pub async fn cmd_enqueue(
    settings: &Settings,
    job_type: &str,
    reference_id: &str,
    user_id: &str,
    options: Option<&str>,
) -> anyhow::Result<()> {
    let job_type = JobType::from_str(job_type);
    if let JobType::Unknown(name) = &job_type {
        anyhow::bail!("Unknown job type: {}", name);
    }
    let config = match options {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("Invalid --options JSON: {}", e))?,
        None => serde_json::json!({}),
    };
    if settings.redis_url.is_none() {
        eprintln!("Warning: no Redis URL configured; only a worker in this process could see the job");
    }

    let backends = backends::connect(settings).await?;
    let repo = backends::open_repository(settings).await?;

    let mut job = Job::new(user_id, job_type, reference_id, config);
    job.max_retries = settings.max_retries;
    submit_job(&repo, backends.queue.as_ref(), &job).await?;

    println!("{}", job.id);
    Ok(())
}

pub async fn cmd_cancel(settings: &Settings, job_id: &str) -> anyhow::Result<()> {
    let repo = backends::open_repository(settings).await?;
    let job = cancel_job(&repo, job_id).await?;
    println!("{} {}", job.id, job.status.as_str());
    Ok(())
}

pub async fn cmd_show(settings: &Settings, job_id: &str) -> anyhow::Result<()> {
    let repo = backends::open_repository(settings).await?;
    let job = repo
        .get_job(job_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Job not found: {}", job_id))?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}
