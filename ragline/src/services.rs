//! Builds the clients the binaries need from [`Settings`].
//!
//! Every model is wrapped in [`WithRetry`] with the configured policy and every http client is
//! built from the configured transport.
use std::sync::Arc;

use anyhow::Result;
use ragline_core::{DescribeImage, EmbeddingModel, SimplePrompt, VectorStore, WithRetry};
use ragline_integrations::{
    openai::{self, OpenAI},
    pinecone::Pinecone,
};
use ragline_media::{
    AudioProcessor, Ffmpeg, ImageProcessor, MediaDescriber, MediaTranscriber, VideoProcessor,
};

use crate::config::Settings;

fn openai(settings: &Settings) -> Result<WithRetry<OpenAI>> {
    let client = openai::client(
        &settings.openai.api_base,
        settings.openai_api_key()?,
        &settings.transport(),
    )?;

    let openai = OpenAI::builder()
        .client(client)
        .default_embed_model(&settings.openai.embed_model)
        .default_prompt_model(&settings.openai.prompt_model)
        .default_vision_model(&settings.openai.vision_model)
        .temperature(settings.openai.temperature)
        .build()?;

    Ok(WithRetry::new(openai, settings.retry_policy()))
}

/// # Errors
///
/// Errors if no `OpenAI` key is configured or the http client cannot be built.
pub fn embed_model(settings: &Settings) -> Result<Arc<dyn EmbeddingModel>> {
    Ok(Arc::new(openai(settings)?))
}

/// # Errors
///
/// Errors if no `OpenAI` key is configured or the http client cannot be built.
pub fn prompt_model(settings: &Settings) -> Result<Arc<dyn SimplePrompt>> {
    Ok(Arc::new(openai(settings)?))
}

/// # Errors
///
/// Errors if no `OpenAI` key is configured or the http client cannot be built.
pub fn vision_model(settings: &Settings) -> Result<Arc<dyn DescribeImage>> {
    Ok(Arc::new(openai(settings)?))
}

/// # Errors
///
/// Errors if no Pinecone key is configured or the http client cannot be built.
pub fn vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let pinecone = &settings.pinecone;

    let mut builder = Pinecone::builder()
        .api_key(settings.pinecone_api_key()?.clone())
        .http_client(settings.transport().http_client()?)
        .api_base(&pinecone.api_base)
        .cloud(&pinecone.cloud)
        .region(&pinecone.region);

    if let Some(namespace) = &pinecone.namespace {
        builder = builder.namespace(namespace);
    }

    Ok(Arc::new(builder.build()?))
}

/// # Errors
///
/// Errors if no `OpenAI` key is configured or the http client cannot be built.
pub fn transcriber(settings: &Settings) -> Result<MediaTranscriber> {
    MediaTranscriber::builder()
        .http_client(settings.transport().http_client()?)
        .endpoint(settings.openai.transcription_endpoint())
        .api_key(settings.openai_api_key()?.clone())
        .model(&settings.openai.transcription_model)
        .retry_policy(settings.retry_policy())
        .timeout(std::time::Duration::from_secs(
            settings.media.transcription_timeout_secs,
        ))
        .build()
}

/// # Errors
///
/// Errors if no `OpenAI` key is configured or the http clients cannot be built.
pub fn media_describer(settings: &Settings) -> Result<MediaDescriber> {
    let vision = vision_model(settings)?;
    let transcriber = transcriber(settings)?;

    let video = VideoProcessor::new(vision.clone(), transcriber.clone())
        .with_tools(Ffmpeg::new(&settings.media.ffprobe, &settings.media.ffmpeg));

    Ok(MediaDescriber::new(
        ImageProcessor::new(vision),
        AudioProcessor::new(transcriber),
        video,
    ))
}
