//! Media generation endpoints

use async_trait::async_trait;
use http::Method;
use serde::Serialize;

use super::Resource;
use crate::{
    client::Client,
    error::{Error, Result},
    observability::log_validation_error,
    tracker::TaskBackend,
    types::{GenerateAudioParams, GenerateImageParams, LaunchReceipt, ProgressReport},
};

const GENERATE_IMAGES_PATH: &str = "media/generate_images";
const GENERATE_AUDIO_PATH: &str = "media/generate-audio";
const PROGRESS_PATH: &str = "media/progress";
const CANCEL_PATH: &str = "media/cancel";

/// Media resource: launch image and audio batches, poll and cancel them.
#[derive(Debug, Clone)]
pub struct Media {
    client: Client,
}

impl Media {
    /// Create a new Media resource.
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Launch an image generation batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] without contacting the backend when
    /// the project or chapter is empty, there are no prompts, or a prompt is
    /// blank.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use mediagen::{Client, GenerateImageParams, ImageSettings, GenerationPrompt};
    /// # async fn example(client: Client) -> Result<(), Box<dyn std::error::Error>> {
    /// let params = GenerateImageParams::builder()
    ///     .project_name("novel")
    ///     .chapter_name("chapter_1")
    ///     .image_settings(ImageSettings::new(1024, 768, "ink"))
    ///     .generation_prompts(&[GenerationPrompt::new("span_1", "a harbour at night")])
    ///     .build()?;
    ///
    /// let receipt = client.media().generate_images(&params).await?;
    /// println!("task {} with {} items", receipt.task_id, receipt.total);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn generate_images(&self, params: &GenerateImageParams) -> Result<LaunchReceipt> {
        validate_target(&params.project_name, &params.chapter_name)?;
        validate_prompts(params.prompts.iter().map(|p| (p.id.as_deref(), p.prompt.as_str())), false)?;

        self.post(GENERATE_IMAGES_PATH, params).await
    }

    /// Launch an audio generation batch.
    ///
    /// # Errors
    ///
    /// As [`generate_images`](Self::generate_images), and additionally when a
    /// prompt id is empty.
    pub async fn generate_audio(&self, params: &GenerateAudioParams) -> Result<LaunchReceipt> {
        validate_target(&params.project_name, &params.chapter_name)?;
        validate_prompts(
            params.prompts.iter().map(|p| (Some(p.id.as_str()), p.prompt.as_str())),
            true,
        )?;

        self.post(GENERATE_AUDIO_PATH, params).await
    }

    /// Query the progress of a task.
    ///
    /// Transient failures are retried up to the client's `max_retries`. The
    /// generation tracker polls through [`progress_once`](Self::progress_once)
    /// instead.
    pub async fn progress(&self, task_id: &str) -> Result<ProgressReport> {
        self.query_progress(task_id, None).await
    }

    /// Query the progress of a task with a single attempt.
    ///
    /// Any transport or status failure is returned as is, never retried.
    pub async fn progress_once(&self, task_id: &str) -> Result<ProgressReport> {
        self.query_progress(task_id, Some(0)).await
    }

    async fn query_progress(&self, task_id: &str, retries: Option<u32>) -> Result<ProgressReport> {
        require_task_id(task_id)?;

        let mut request = self
            .client
            .request(Method::GET, PROGRESS_PATH)?
            .query("task_id", task_id);
        if let Some(retries) = retries {
            request = request.max_retries(retries);
        }

        request.send().await?.parse_result()
    }

    /// Ask the backend to cancel a task.
    pub async fn cancel(&self, task_id: &str) -> Result<()> {
        #[derive(Serialize)]
        struct CancelRequest<'a> {
            task_id: &'a str,
        }

        require_task_id(task_id)?;

        let _: serde_json::Value = self.post(CANCEL_PATH, &CancelRequest { task_id }).await?;
        Ok(())
    }

    async fn post<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        self.client
            .request(Method::POST, path)?
            .json(body)?
            .send()
            .await?
            .parse_result()
    }
}

impl Resource for Media {
    fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl TaskBackend for Client {
    async fn progress(&self, task_id: &str) -> Result<ProgressReport> {
        self.media().progress_once(task_id).await
    }

    async fn cancel(&self, task_id: &str) -> Result<()> {
        self.media().cancel(task_id).await
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    log_validation_error(field, reason);
    Error::InvalidRequest(format!("{field} {reason}"))
}

fn validate_target(project_name: &str, chapter_name: &str) -> Result<()> {
    if project_name.trim().is_empty() {
        return Err(invalid("project_name", "must not be empty"));
    }
    if chapter_name.trim().is_empty() {
        return Err(invalid("chapter_name", "must not be empty"));
    }
    Ok(())
}

fn validate_prompts<'a>(
    prompts: impl ExactSizeIterator<Item = (Option<&'a str>, &'a str)>,
    require_ids: bool,
) -> Result<()> {
    if prompts.len() == 0 {
        return Err(invalid("prompts", "must not be empty"));
    }
    for (index, (id, prompt)) in prompts.enumerate() {
        if prompt.trim().is_empty() {
            return Err(invalid(&format!("prompts[{index}].prompt"), "must not be empty"));
        }
        if require_ids && id.is_none_or(str::is_empty) {
            return Err(invalid(&format!("prompts[{index}].id"), "must not be empty"));
        }
    }
    Ok(())
}

fn require_task_id(task_id: &str) -> Result<()> {
    if task_id.is_empty() {
        return Err(invalid("task_id", "must not be empty"));
    }
    Ok(())
}
