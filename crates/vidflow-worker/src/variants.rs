//! Variant orchestration.
//!
//! Runs the transcoder once per requested quality and uploads the artifacts
//! of the successful ones. A single quality failing — unknown label, tool
//! exit, upload error — is recorded in that variant's result and never
//! aborts the siblings or the job.

use std::path::Path;

use tracing::{info, warn};

use vidflow_media::{probe, TranscodeOutput, VariantSpec};
use vidflow_models::{JobEnvelope, OutputFormat, VariantResult};

use crate::error::VariantError;
use crate::pipeline::{JobStage, ProcessingContext, WorkDir};

/// Object key prefix a variant's artifacts are uploaded under.
pub fn variant_prefix(video_id: &str, quality: &str) -> String {
    format!("processed/{}/{}", video_id, quality)
}

/// Produce one `VariantResult` per requested quality, in request order.
pub async fn process_variants(
    ctx: &ProcessingContext,
    envelope: &JobEnvelope,
    work_dir: &WorkDir,
) -> Vec<VariantResult> {
    let opts = &envelope.processing_options;
    let source = work_dir.source_path();

    // Best-effort source duration for the registry report.
    let duration = match probe::get_duration(&source).await {
        Ok(d) => d,
        Err(e) => {
            warn!(video_id = %envelope.video_id, "Failed to probe source duration: {}", e);
            0.0
        }
    };

    // TranscodingVariants: sequential within the job; jobs themselves run in
    // parallel under the concurrency limiter.
    let mut attempts: Vec<(String, Result<TranscodeOutput, VariantError>)> =
        Vec::with_capacity(opts.qualities.len());

    for quality in &opts.qualities {
        info!(
            video_id = %envelope.video_id,
            stage = JobStage::TranscodingVariants.as_str(),
            quality = %quality,
            "Transcoding variant"
        );

        let attempt = transcode_one(ctx, envelope, work_dir, quality).await;
        if let Err(e) = &attempt {
            warn!(
                video_id = %envelope.video_id,
                stage = JobStage::TranscodingVariants.as_str(),
                quality = %quality,
                "Variant failed: {}",
                e
            );
        }
        attempts.push((quality.clone(), attempt));
    }

    // UploadingVariants: only successful transcodes reach storage.
    let mut results = Vec::with_capacity(attempts.len());
    for (quality, attempt) in attempts {
        let result = match attempt {
            Err(e) => VariantResult::failed(quality.as_str(), opts.output_format, e.to_string()),
            Ok(output) => {
                info!(
                    video_id = %envelope.video_id,
                    stage = JobStage::UploadingVariants.as_str(),
                    quality = %quality,
                    artifacts = output.files.len(),
                    "Uploading variant artifacts"
                );
                upload_variant(ctx, envelope, work_dir, &quality, &output, duration).await
            }
        };
        results.push(result);
    }

    results
}

/// Resolve a quality label and run the transcoder for it.
async fn transcode_one(
    ctx: &ProcessingContext,
    envelope: &JobEnvelope,
    work_dir: &WorkDir,
    quality: &str,
) -> Result<TranscodeOutput, VariantError> {
    let resolution = ctx
        .resolutions
        .get(quality)
        .ok_or_else(|| VariantError::UnsupportedQuality(quality.to_string()))?
        .clone();

    let spec = VariantSpec {
        quality: quality.to_string(),
        resolution,
        output_format: envelope.processing_options.output_format,
        segment_duration: envelope.processing_options.segment_duration,
    };

    ctx.transcoder
        .transcode(
            &work_dir.source_path(),
            &work_dir.variant_dir(quality),
            &spec,
        )
        .await
        .map_err(VariantError::Transcode)
}

/// Upload every artifact of a transcoded variant and presign its entry
/// point for the registry report. Any failure demotes the variant.
async fn upload_variant(
    ctx: &ProcessingContext,
    envelope: &JobEnvelope,
    work_dir: &WorkDir,
    quality: &str,
    output: &TranscodeOutput,
    duration: f64,
) -> VariantResult {
    let format = envelope.processing_options.output_format;
    let prefix = variant_prefix(envelope.video_id.as_str(), quality);
    let variant_dir = work_dir.variant_dir(quality);

    let mut total_bytes: u64 = 0;
    let mut entry_key: Option<String> = None;

    for file in &output.files {
        let key = artifact_key(&prefix, &variant_dir, file);

        if let Err(e) = ctx
            .storage
            .upload(file, &key, ctx.config.process_timeout)
            .await
        {
            warn!(
                video_id = %envelope.video_id,
                stage = JobStage::UploadingVariants.as_str(),
                quality = %quality,
                key = %key,
                "Artifact upload failed: {}",
                e
            );
            return VariantResult::failed(quality, format, VariantError::Upload(e).to_string());
        }

        total_bytes += tokio::fs::metadata(file).await.map(|m| m.len()).unwrap_or(0);

        let is_entry = match format {
            OutputFormat::Hls => output.manifest.as_deref() == Some(file.as_path()),
            OutputFormat::Mp4 => file.extension().and_then(|e| e.to_str()) == Some("mp4"),
        };
        if is_entry {
            entry_key = Some(key);
        }
    }

    let entry_key = match entry_key {
        Some(key) => key,
        None => {
            return VariantResult::failed(
                quality,
                format,
                "transcode produced no playable entry point",
            )
        }
    };

    let mut result = VariantResult::success(quality, prefix, format, total_bytes, duration);
    if format == OutputFormat::Hls {
        result = result.with_manifest(entry_key.clone());
    }

    match ctx
        .storage
        .presigned_get(&entry_key, ctx.config.signed_url_expiry)
        .await
    {
        Ok(presigned) => result.with_signed_url(presigned.url, presigned.expires_at),
        Err(e) => {
            warn!(
                video_id = %envelope.video_id,
                quality = %quality,
                key = %entry_key,
                "Presign failed: {}",
                e
            );
            VariantResult::failed(quality, format, VariantError::Presign(e).to_string())
        }
    }
}

/// Object key for one artifact: the variant prefix plus the artifact's path
/// relative to the variant output directory.
fn artifact_key(prefix: &str, variant_dir: &Path, file: &Path) -> String {
    let relative = file
        .strip_prefix(variant_dir)
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| {
            file.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| file.to_string_lossy().into_owned());

    format!("{}/{}", prefix, relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_variant_prefix_layout() {
        assert_eq!(variant_prefix("v1", "144p"), "processed/v1/144p");
    }

    #[test]
    fn test_artifact_key_relative_to_variant_dir() {
        let dir = PathBuf::from("/work/job-x/variants/720p");
        let file = dir.join("segment-003.ts");
        assert_eq!(
            artifact_key("processed/v1/720p", &dir, &file),
            "processed/v1/720p/segment-003.ts"
        );
    }

    #[test]
    fn test_artifact_key_falls_back_to_file_name() {
        let dir = PathBuf::from("/work/job-x/variants/720p");
        let file = PathBuf::from("/elsewhere/index.m3u8");
        assert_eq!(
            artifact_key("processed/v1/720p", &dir, &file),
            "processed/v1/720p/index.m3u8"
        );
    }
}
